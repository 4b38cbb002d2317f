use std::sync::Arc;

use siloscript::http::{self, RouterConfig};
use siloscript::state::AppState;
use siloscript::Machine;

use siloscript_runner::{LocalRunner, SiloWrappingRunner};
use siloscript_store::{EncryptingStore, SqliteStore};

/// Spawns a full `siloscript` server (real SQLite file, real keyring, real
/// bound TCP listener) and returns its base URL plus the script root
/// directory, so tests can drop scripts in before running them.
pub struct TestServer {
    pub base_url: String,
    pub script_root: std::path::PathBuf,
}

pub async fn spawn_app() -> TestServer {
    let workdir = std::env::temp_dir().join(format!("siloscript-it-{}", unique_suffix()));
    let script_root = workdir.join("scripts");
    let static_dir = workdir.join("static");
    std::fs::create_dir_all(&script_root).unwrap();
    std::fs::create_dir_all(&static_dir).unwrap();

    let db_path = workdir.join("db.sqlite");
    let sqlite = SqliteStore::connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .unwrap();
    let store = Arc::new(EncryptingStore::new(
        Arc::new(sqlite),
        workdir.join("keyring"),
        None,
    ));

    let machine = Machine::new(store, "test-salt");
    let runner = LocalRunner::new(script_root.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let data_url_root = format!("http://{addr}/data");
    let runner = Arc::new(SiloWrappingRunner::new(runner, data_url_root));

    let state = AppState { machine, runner };
    let cors_allowed_origins = vec!["*".to_string()];
    let static_dir_str = static_dir.to_string_lossy().to_string();
    let config = RouterConfig {
        cors_allowed_origins: &cors_allowed_origins,
        static_dir: &static_dir_str,
    };
    let app = http::router(state, &config);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        script_root,
    }
}

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    nanos ^ (std::process::id() as u128)
}
