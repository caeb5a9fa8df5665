//! Serious outcome classification.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::data::{store::ReportKey, RecordStore};

/// Serious outcome codes and their category names.
pub const SERIOUS_OUTCOMES: &[(&str, &str)] = &[
    ("DE", "Death"),
    ("LT", "Life-Threatening"),
    ("HO", "Hospitalization"),
    ("DS", "Disability"),
    ("CA", "Congenital Anomaly"),
    ("RI", "Required Intervention"),
];

pub fn category_for(code: &str) -> Option<&'static str> {
    SERIOUS_OUTCOMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeTally {
    pub count: usize,
    /// `count / total cases`; 0 when there are no cases.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeReport {
    /// Every serious category, in code-table order.
    pub categories: IndexMap<String, OutcomeTally>,
    pub total_cases: usize,
    /// Joined rows carrying any serious code.
    pub serious_rows: usize,
    pub serious_rate: Option<f64>,
    /// Distinct cases with at least one serious outcome.
    pub cases_with_serious: usize,
}

/// Serious categories of each report version, keyed like the case table.
fn serious_by_report(store: &RecordStore) -> HashMap<ReportKey<'_>, Vec<&'static str>> {
    let mut by_report: HashMap<ReportKey<'_>, Vec<&'static str>> = HashMap::new();
    for record in &store.outcomes {
        let category = record.outcome_code.as_deref().and_then(category_for);
        if let (Some(key), Some(category)) = (record.report_key(), category) {
            by_report.entry(key).or_default().push(category);
        }
    }
    by_report
}

/// Left-join cases with their outcome rows on `(primaryid, caseid)` and tally
/// serious categories.
///
/// Categories are not exclusive: a case reporting both death and hospitalization
/// counts toward both. The denominator is always the number of cases.
pub fn classify(store: &RecordStore) -> OutcomeReport {
    let codes_by_report = serious_by_report(store);

    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    let mut serious_rows = 0usize;
    let mut serious_cases = HashSet::new();
    for (idx, case) in store.cases.iter().enumerate() {
        let Some(categories) = case.report_key().and_then(|key| codes_by_report.get(&key)) else {
            continue;
        };
        for &category in categories {
            *counts.entry(category).or_insert(0) += 1;
            serious_rows += 1;
        }
        serious_cases.insert(idx);
    }

    let total_cases = store.cases.len();
    let rate = |count: usize| {
        if total_cases == 0 {
            0.0
        } else {
            count as f64 / total_cases as f64
        }
    };
    let categories = SERIOUS_OUTCOMES
        .iter()
        .map(|(_, name)| {
            let count = counts.get(name).copied().unwrap_or(0);
            (
                (*name).to_string(),
                OutcomeTally {
                    count,
                    rate: rate(count),
                },
            )
        })
        .collect();
    debug!(serious_rows, cases = total_cases, "outcome classification complete");

    OutcomeReport {
        categories,
        total_cases,
        serious_rows,
        serious_rate: (total_cases > 0).then(|| rate(serious_rows)),
        cases_with_serious: serious_cases.len(),
    }
}
