//! CLI entry-point for the data-quality checks.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args as ClapArgs;
use polars::prelude::{CsvWriter, DataFrame, NamedFrom, ParquetWriter, SerWriter, Series};
use tracing::{info, instrument};

use crate::{
    cli::LoadArgs,
    config::{AnomalyConfig, Settings},
    quality::{self, anomaly, CaseScore},
};

/// Args for the `quality` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub load: LoadArgs,
    /// Absolute z-score above which a day is anomalous.
    #[arg(long, default_value_t = 3.0)]
    pub z_threshold: f64,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let store = args.load.load(&settings).await?;
    let cases = &store.cases;

    let completeness = quality::completeness(cases);
    println!("Field completeness:");
    for (field, pct) in &completeness.fields {
        let status = if *pct > 90.0 {
            "ok"
        } else if *pct > 70.0 {
            "warn"
        } else {
            "poor"
        };
        println!("  [{status:4}] {field:20}: {pct:6.2}%");
    }
    match completeness.overall {
        Some(overall) => println!("Overall completeness: {overall:.2}%"),
        None => println!("Overall completeness: n/a (no cases)"),
    }

    let scores = quality::case_scores(cases);
    if let Some(summary) = quality::summarize_scores(&scores) {
        println!(
            "Case quality: mean {:.2}, median {:.2}, low (<50) {} ({:.2}%), high (>80) {} ({:.2}%)",
            summary.mean,
            summary.median,
            summary.low_quality,
            summary.low_quality_pct,
            summary.high_quality,
            summary.high_quality_pct
        );
    }

    let config = AnomalyConfig {
        z_threshold: args.z_threshold,
    };
    let anomalies = anomaly::detect(cases, &config);
    if let (Some(first), Some(last)) = (anomalies.days.first(), anomalies.days.last()) {
        println!("Receipt dates: {} to {}", first.date, last.date);
    }
    println!(
        "Anomalous days: {} (mean {:.0}, sd {:.0})",
        anomalies.anomalies,
        anomalies.mean.unwrap_or(0.0),
        anomalies.std_dev.unwrap_or(0.0)
    );
    for day in anomalies.top_anomalous(3) {
        println!("  {}: {} reports (z={:.2})", day.date, day.count, day.z_score);
    }

    let missing = quality::missing_profile(&store);
    println!("Fields with missing data:");
    for field in missing.iter().take(10) {
        println!(
            "  {:20}: {:6.2}% ({} records)",
            field.column, field.missing_pct, field.missing
        );
    }

    let duplicates = quality::detect_duplicates(cases);
    println!(
        "Duplicates: {} exact, {} potential, rate {:.2}%",
        duplicates.exact.len(),
        duplicates.potential.len(),
        duplicates.duplicate_rate.unwrap_or(0.0)
    );

    let issues = quality::data_entry_issues(cases, Utc::now().date_naive());
    println!("Data-entry issues: {}", issues.len());
    for issue in &issues {
        println!("  - {issue}");
    }

    let scores_path = settings.join_output("case_scores.parquet");
    write_scores(&scores, &scores_path)
        .with_context(|| format!("write {}", scores_path.display()))?;
    let daily_path = settings.join_output("daily_counts.csv");
    write_daily(&anomalies, &daily_path)
        .with_context(|| format!("write {}", daily_path.display()))?;
    info!(
        scores = %scores_path.display(),
        daily = %daily_path.display(),
        "wrote quality outputs"
    );
    Ok(())
}

fn write_scores(scores: &[CaseScore], path: &Path) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new(
            "case_index".into(),
            scores.iter().map(|s| s.index as u64).collect::<Vec<_>>(),
        ),
        Series::new(
            "completeness".into(),
            scores.iter().map(|s| s.completeness).collect::<Vec<_>>(),
        ),
        Series::new(
            "age_validity".into(),
            scores.iter().map(|s| s.age_validity).collect::<Vec<_>>(),
        ),
        Series::new(
            "date_validity".into(),
            scores.iter().map(|s| s.date_validity).collect::<Vec<_>>(),
        ),
        Series::new(
            "reporter_info".into(),
            scores.iter().map(|s| s.reporter_info).collect::<Vec<_>>(),
        ),
        Series::new(
            "total_score".into(),
            scores.iter().map(|s| s.total).collect::<Vec<_>>(),
        ),
    ])?;
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}

fn write_daily(report: &anomaly::AnomalyReport, path: &Path) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new(
            "date".into(),
            report
                .days
                .iter()
                .map(|d| d.date.to_string())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "count".into(),
            report.days.iter().map(|d| d.count as u64).collect::<Vec<_>>(),
        ),
        Series::new(
            "z_score".into(),
            report.days.iter().map(|d| d.z_score).collect::<Vec<_>>(),
        ),
        Series::new(
            "is_anomaly".into(),
            report.days.iter().map(|d| d.is_anomaly).collect::<Vec<_>>(),
        ),
    ])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
