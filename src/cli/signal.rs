//! CLI entry-point for disproportionality signal detection.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    cli::LoadArgs,
    config::{Settings, SignalOverrides},
    signals::{self, outcomes, Signal},
};

/// Args for the `signal` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub thresholds: SignalOverrides,
    /// Number of signals printed to stdout.
    #[arg(long, default_value_t = 10)]
    pub show: usize,
}

const SIGNAL_COLUMNS: [&str; 9] = [
    "drug",
    "reaction",
    "prr",
    "chi2",
    "cases",
    "strength",
    "ror",
    "ror_ci_low",
    "ror_ci_high",
];

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let store = args.load.load(&settings).await?;
    let config = args.thresholds.resolve(settings.signal_mode);
    info!(?config, "detecting signals");

    let (signals, outcome_report) = tokio::task::spawn_blocking(move || {
        (
            signals::detect_signals(&store, &config),
            outcomes::classify(&store),
        )
    })
    .await?;

    let out_path = settings.join_output("signals.csv");
    write_signals(&signals, &out_path)
        .with_context(|| format!("write {}", out_path.display()))?;
    info!(path = %out_path.display(), rows = signals.len(), "wrote signals");

    println!(
        "Detected {} signals (PRR >= {}, chi2 >= {}, cases >= {}; top {} drugs x top {} reactions)",
        signals.len(),
        config.prr_threshold,
        config.chi2_threshold,
        config.min_cases,
        config.top_drug_count,
        config.top_reaction_count,
    );
    for signal in signals.iter().take(args.show) {
        println!(
            "  {:8} | {:30.30} -> {:30.30} | PRR {:6.2} | chi2 {:8.2} | cases {:4}",
            signal.strength.to_string(),
            signal.drug,
            signal.reaction,
            signal.prr,
            signal.chi2,
            signal.cases
        );
    }

    println!("Serious outcomes across {} cases:", outcome_report.total_cases);
    for (category, tally) in &outcome_report.categories {
        println!(
            "  {category:25}: {:6} ({:5.2}%)",
            tally.count,
            tally.rate * 100.0
        );
    }
    Ok(())
}

fn write_signals(signals: &[Signal], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record(SIGNAL_COLUMNS)?;
    for signal in signals {
        writer.serialize(signal)?;
    }
    writer.flush()?;
    Ok(())
}
