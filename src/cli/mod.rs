//! Command-line interface wiring for faers-surveillance.

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::{
    config::Settings,
    data::{faers, RecordStore},
};

pub mod quality;
pub mod report;
pub mod serve;
pub mod signal;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "FAERS data-quality and safety signal surveillance", long_about = None)]
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
            Commands::Quality(args) => quality::run(args, settings).await,
            Commands::Signal(args) => signal::run(args, settings).await,
            Commands::Report(args) => report::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Completeness, case scores, anomalies and data-entry checks.
    Quality(quality::Args),
    /// Disproportionality signals and serious outcomes.
    Signal(signal::Args),
    /// Run every analysis and write a JSON report.
    Report(report::Args),
    /// Serve the JSON API over a loaded snapshot.
    Serve(serve::Args),
}

/// Snapshot selection shared by every sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct LoadArgs {
    /// FAERS quarter to load (e.g. 25Q3); defaults to the latest available.
    #[arg(long)]
    pub quarter: Option<String>,
    /// Override the number of demographics rows sampled.
    #[arg(long)]
    pub sample_size: Option<usize>,
}

impl LoadArgs {
    /// Load the snapshot on a blocking thread.
    pub async fn load(&self, settings: &Settings) -> Result<RecordStore> {
        let mut settings = settings.clone();
        if let Some(sample_size) = self.sample_size {
            settings.sample_size = sample_size;
        }
        let quarter = self.quarter.clone();
        tokio::task::spawn_blocking(move || faers::load_store(&settings, quarter.as_deref()))
            .await?
    }
}
