//! Daily report-volume anomaly detection based on z-scores.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{config::AnomalyConfig, data::Case};

/// Report volume of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
    pub z_score: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    /// Days in calendar order.
    pub days: Vec<DailyCount>,
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` with fewer than two days.
    pub std_dev: Option<f64>,
    pub anomalies: usize,
}

impl AnomalyReport {
    /// Anomalous days ranked by volume, highest first.
    pub fn top_anomalous(&self, k: usize) -> Vec<DailyCount> {
        let mut flagged: Vec<DailyCount> =
            self.days.iter().copied().filter(|d| d.is_anomaly).collect();
        flagged.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.date.cmp(&b.date)));
        flagged.truncate(k);
        flagged
    }
}

/// Count cases per receipt day; unparseable dates are skipped.
pub fn daily_counts(cases: &[Case]) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for day in cases.iter().filter_map(Case::receipt_day) {
        *counts.entry(day).or_insert(0) += 1;
    }
    counts
}

/// Mean and sample standard deviation of a series.
pub fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (Some(mean), None);
    }
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    (Some(mean), Some(variance.sqrt()))
}

/// Strict comparison: `|z|` equal to the threshold is not anomalous.
pub fn is_anomalous(z_score: f64, threshold: f64) -> bool {
    z_score.abs() > threshold
}

pub fn detect(cases: &[Case], config: &AnomalyConfig) -> AnomalyReport {
    let counts = daily_counts(cases);
    let values: Vec<f64> = counts.values().map(|c| *c as f64).collect();
    let (mean, std_dev) = mean_and_std(&values);

    let usable = match (mean, std_dev) {
        (Some(mean), Some(std)) if std > 0.0 && std.is_finite() => Some((mean, std)),
        _ => None,
    };
    if usable.is_none() && !counts.is_empty() {
        warn!(
            days = counts.len(),
            "daily volume has no spread; z-scores set to zero"
        );
    }

    let days: Vec<DailyCount> = counts
        .into_iter()
        .map(|(date, count)| {
            let z_score = usable
                .map(|(mean, std)| (count as f64 - mean) / std)
                .unwrap_or(0.0);
            DailyCount {
                date,
                count,
                z_score,
                is_anomaly: usable.is_some() && is_anomalous(z_score, config.z_threshold),
            }
        })
        .collect();
    let anomalies = days.iter().filter(|d| d.is_anomaly).count();
    debug!(days = days.len(), anomalies, "daily anomaly scan complete");

    AnomalyReport {
        days,
        mean,
        std_dev,
        anomalies,
    }
}
