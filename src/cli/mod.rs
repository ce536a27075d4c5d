//! Command-line interface wiring for keyword-contrast.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod run;
pub mod serve;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Keyword contrast analysis over corpus search backends", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Run(args) => run::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a stored job and write its report.
    Run(run::Args),
    /// Serve the query form and the result pages.
    Serve(serve::Args),
}
