use crate::config;
use crate::startup;

pub async fn run() -> anyhow::Result<()> {
    startup::run(config::settings()).await
}
