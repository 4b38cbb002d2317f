pub mod serve;

use clap::{Parser, Subcommand};

use crate::cli::logging::LogArgs;

#[derive(Parser, Debug)]
#[command(name = "siloscript", about = "Runs scripts against per-invocation, human-backed data")]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serves the Public, Control, and Data façades behind one listener.
    Serve,
}
