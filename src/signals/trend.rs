//! Monthly report-volume trend with growth-rate flags.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::data::Case;

/// Month-over-month change (percent) beyond which a month is flagged.
pub const UNUSUAL_GROWTH_PCT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`.
    pub month: String,
    pub count: usize,
    /// Percent change from the previous observed month.
    pub growth_pct: Option<f64>,
    pub unusual: bool,
}

/// Compute monthly counts of receipt dates in calendar order.
pub fn monthly_trend(cases: &[Case]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for day in cases.iter().filter_map(Case::receipt_day) {
        *months.entry((day.year(), day.month())).or_insert(0) += 1;
    }

    let mut out = Vec::with_capacity(months.len());
    let mut previous: Option<usize> = None;
    for ((year, month), count) in months {
        let growth_pct = previous.map(|prev| (count as f64 - prev as f64) / prev as f64 * 100.0);
        out.push(MonthlyCount {
            month: format!("{year:04}-{month:02}"),
            count,
            growth_pct,
            unusual: growth_pct.is_some_and(|g| g.abs() > UNUSUAL_GROWTH_PCT),
        });
        previous = Some(count);
    }
    out
}
