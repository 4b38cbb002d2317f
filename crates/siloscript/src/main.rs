use clap::Parser;

use siloscript::cli::logging::init_logging;
use siloscript::cmd::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Command::Serve => siloscript::cmd::serve::run().await,
    }
}
