use std::sync::Arc;

use siloscript_runner::{LocalRunner, SiloWrappingRunner};
use siloscript_store::{EncryptingStore, SqliteStore};

use crate::config::Settings;
use crate::http;
use crate::shutdown;
use crate::state::AppState;
use crate::Machine;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let database_url = format!("sqlite://{}?mode=rwc", settings.store.database_path);
    let sqlite = SqliteStore::connect(&database_url).await?;
    let store = Arc::new(EncryptingStore::new(
        Arc::new(sqlite),
        settings.store.keyring_dir.clone(),
        settings.store.keyring_passphrase.clone(),
    ));

    let machine = Machine::new(store, settings.application.token_salt.clone());
    let runner = LocalRunner::new(settings.runner.script_root.clone());
    let runner = Arc::new(SiloWrappingRunner::new(
        runner,
        settings.application.data_url_root.clone(),
    ));

    let state = AppState { machine, runner };
    let router_config = http::RouterConfig {
        cors_allowed_origins: &settings.application.cors_allowed_origins,
        static_dir: &settings.application.static_dir,
    };
    let app = http::router(state, &router_config);

    let listener = tokio::net::TcpListener::bind(settings.application.address()).await?;
    tracing::info!(address = %settings.application.address(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    Ok(())
}
