//! CLI entry-point for executing one stored job.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, job};

/// Run the job whose descriptor is stored under `hash`.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Hash naming the job descriptor in the jobs folder.
    #[arg(long)]
    pub hash: String,
    /// Stylesheet URL written into the report.
    #[arg(long, default_value = "")]
    pub path: String,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let report = job::run(&settings, &args.hash, &args.path).await?;
    info!(report = %report.display(), "job finished");
    Ok(())
}
