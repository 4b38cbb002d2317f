//! Subprocess execution for siloscript.
//!
//! A [`Runner`] executes a named script under a fixed root with a given
//! environment and args, optionally streaming its stdout/stderr through an
//! [`Observer`] as it runs. [`SiloWrappingRunner`] composes over any
//! `Runner` to inject the per-run `DATASTORE_URL`.

mod error;
mod local;
mod observer;
mod silo_wrapping;

pub use error::RunnerError;
pub use local::LocalRunner;
pub use observer::{Channel, Observer};
pub use silo_wrapping::{SiloWrappingRunner, DATASTORE_URL_ENV_NAME};

use std::collections::HashMap;
use std::sync::Arc;

/// Aggregated result of a completed run. The subprocess's own exit code is a
/// datum, not an error: a failing script still returns `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn run(
        &self,
        script: &str,
        args: &[String],
        env: HashMap<String, String>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<RunOutput, RunnerError>;
}
