use std::sync::Arc;

use siloscript_runner::{LocalRunner, SiloWrappingRunner};
use siloscript_store::{EncryptingStore, SqliteStore};

use crate::Machine;

/// The Store this binary wires up: SQLite on disk, RSA-encrypted at rest.
pub type AppStore = EncryptingStore<SqliteStore>;

/// Shared state handed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<Machine<AppStore>>,
    pub runner: Arc<SiloWrappingRunner<LocalRunner>>,
}
