use once_cell::sync::OnceCell;
use serde::Deserialize;

mod app_env;

pub use app_env::app_env;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
    pub runner: RunnerSettings,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Base URL scripts see as their `DATASTORE_URL` root, e.g.
    /// `http://localhost:8080/data`.
    pub data_url_root: String,
    /// Allowed CORS origins for the Public façade; `["*"]` is permissive.
    pub cors_allowed_origins: Vec<String>,
    /// Fixed per-deployment salt mixed into token hashing.
    pub token_salt: String,
    /// Directory served under `/static` by the Control façade.
    pub static_dir: String,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Directory the encrypting store keeps its RSA keyring in.
    pub keyring_dir: String,
    pub keyring_passphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunnerSettings {
    /// Root directory scripts are resolved under.
    pub script_root: String,
}

pub fn settings() -> &'static Settings {
    static SETTINGS: OnceCell<Settings> = OnceCell::new();

    SETTINGS.get_or_init(|| load_settings().expect("Failed to load settings"))
}

fn load_settings() -> Result<Settings, config::ConfigError> {
    let current_dir = std::env::current_dir().expect("The current directory to be available");
    let config_dir = current_dir.join("config");

    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base")).required(true))
        .add_source(config::File::from(config_dir.join(app_env().as_str())).required(true))
        .add_source(config::Environment::with_prefix("SILOSCRIPT").separator("__"))
        .build()?;

    settings.try_deserialize()
}
