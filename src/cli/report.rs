//! CLI entry-point producing the combined JSON report.

use std::{fs::File, io::BufWriter};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    analytics::{EngineConfig, Report},
    cli::LoadArgs,
    config::{AnomalyConfig, Settings, SignalOverrides},
};

/// Args for the `report` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub thresholds: SignalOverrides,
    /// Output file name inside the outputs directory.
    #[arg(long, default_value = "report.json")]
    pub output: String,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let store = args.load.load(&settings).await?;
    let config = EngineConfig {
        signals: args.thresholds.resolve(settings.signal_mode),
        anomaly: AnomalyConfig::default(),
    };
    let as_of = Utc::now().date_naive();

    let report =
        tokio::task::spawn_blocking(move || Report::build(&store, &config, as_of)).await?;

    let path = settings.join_output(&args.output);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
    info!(
        path = %path.display(),
        cases = report.total_cases,
        signals = report.signals.len(),
        anomalies = report.anomalies.anomalies,
        "wrote report"
    );
    Ok(())
}
