//! Disproportionality signal detection over primary-suspect drug/reaction reports.

pub mod outcomes;
pub mod prr;
pub mod risk;
pub mod trend;

use std::{cmp::Ordering, collections::HashMap, fmt};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::SignalConfig,
    data::{store::ReportKey, RecordStore},
};

use self::prr::ContingencyTable;

/// PRR at or above which a signal is labelled strong.
pub const STRONG_PRR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalStrength {
    Strong,
    Moderate,
}

impl SignalStrength {
    pub fn from_prr(prr: f64) -> Self {
        if prr >= STRONG_PRR {
            Self::Strong
        } else {
            Self::Moderate
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => f.write_str("Strong"),
            Self::Moderate => f.write_str("Moderate"),
        }
    }
}

/// A disproportionately reported drug/reaction pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub drug: String,
    pub reaction: String,
    pub prr: f64,
    pub chi2: f64,
    /// Co-occurrence rows for the pair (cell `a`).
    pub cases: u64,
    pub strength: SignalStrength,
    pub ror: f64,
    pub ror_ci_low: f64,
    pub ror_ci_high: f64,
}

/// Aggregates over the primary-suspect drug x reaction join.
///
/// One report version contributes a row for every (drug, reaction) combination it
/// carries, so counts are report-level rather than case-level. Drugs and reactions
/// join on `(primaryid, caseid)`; rows lacking a case id, drug name or reaction
/// term are not part of the join.
#[derive(Debug, Clone, Default)]
pub struct CoOccurrence<'a> {
    pair_counts: HashMap<(&'a str, &'a str), u64>,
    drug_totals: HashMap<&'a str, u64>,
    reaction_totals: HashMap<&'a str, u64>,
    total_rows: u64,
}

impl<'a> CoOccurrence<'a> {
    pub fn from_store(store: &'a RecordStore) -> Self {
        let mut drugs_by_report: HashMap<ReportKey<'a>, Vec<&'a str>> = HashMap::new();
        for record in store.drugs.iter().filter(|d| d.is_primary_suspect()) {
            if let (Some(key), Some(name)) = (record.report_key(), record.drug_name.as_deref()) {
                drugs_by_report.entry(key).or_default().push(name);
            }
        }
        let mut reactions_by_report: HashMap<ReportKey<'a>, Vec<&'a str>> = HashMap::new();
        for record in &store.reactions {
            if let (Some(key), Some(term)) = (record.report_key(), record.reaction.as_deref()) {
                reactions_by_report.entry(key).or_default().push(term);
            }
        }

        let mut co = Self::default();
        for (key, drugs) in &drugs_by_report {
            let Some(reactions) = reactions_by_report.get(key) else {
                continue;
            };
            for &drug in drugs {
                for &reaction in reactions {
                    co.record(drug, reaction);
                }
            }
        }
        debug!(
            rows = co.total_rows,
            drugs = co.drug_totals.len(),
            reactions = co.reaction_totals.len(),
            "co-occurrence aggregates built"
        );
        co
    }

    /// Build aggregates from explicit (drug, reaction) rows.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut co = Self::default();
        for (drug, reaction) in rows {
            co.record(drug, reaction);
        }
        co
    }

    fn record(&mut self, drug: &'a str, reaction: &'a str) {
        *self.pair_counts.entry((drug, reaction)).or_insert(0) += 1;
        *self.drug_totals.entry(drug).or_insert(0) += 1;
        *self.reaction_totals.entry(reaction).or_insert(0) += 1;
        self.total_rows += 1;
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    pub fn pair_count(&self, drug: &str, reaction: &str) -> u64 {
        self.pair_counts.get(&(drug, reaction)).copied().unwrap_or(0)
    }

    pub fn drug_total(&self, drug: &str) -> u64 {
        self.drug_totals.get(drug).copied().unwrap_or(0)
    }

    pub fn reaction_total(&self, reaction: &str) -> u64 {
        self.reaction_totals.get(reaction).copied().unwrap_or(0)
    }

    /// The `n` drugs with the most rows; ties resolve alphabetically.
    pub fn top_drugs(&self, n: usize) -> Vec<&'a str> {
        top_n(&self.drug_totals, n)
    }

    /// The `m` reactions with the most rows; ties resolve alphabetically.
    pub fn top_reactions(&self, m: usize) -> Vec<&'a str> {
        top_n(&self.reaction_totals, m)
    }

    /// Contingency table for a pair, or `None` if it is degenerate.
    pub fn contingency(&self, drug: &str, reaction: &str) -> Option<ContingencyTable> {
        ContingencyTable::from_margins(
            self.pair_count(drug, reaction),
            self.drug_total(drug),
            self.reaction_total(reaction),
            self.total_rows,
        )
    }
}

fn top_n<'a>(totals: &HashMap<&'a str, u64>, n: usize) -> Vec<&'a str> {
    let mut ranked: Vec<(&'a str, u64)> = totals.iter().map(|(k, v)| (*k, *v)).collect();
    ranked.sort_by(|x, y| y.1.cmp(&x.1).then_with(|| x.0.cmp(y.0)));
    ranked.into_iter().take(n).map(|(name, _)| name).collect()
}

/// Run the scoped PRR / chi-square scan for a snapshot.
pub fn detect_signals(store: &RecordStore, config: &SignalConfig) -> Vec<Signal> {
    let co = CoOccurrence::from_store(store);
    evaluate(&co, store.cases.len() as u64, config)
}

/// Evaluate the top-drug x top-reaction grid against the thresholds.
///
/// `total_cases` scales the chi-square statistic; the contingency cells
/// themselves are row counts from `co`.
pub fn evaluate(co: &CoOccurrence<'_>, total_cases: u64, config: &SignalConfig) -> Vec<Signal> {
    if co.is_empty() {
        info!("no primary-suspect drug/reaction overlap; no signals");
        return Vec::new();
    }

    let drugs = co.top_drugs(config.top_drug_count);
    let reactions = co.top_reactions(config.top_reaction_count);
    let n_total = total_cases as f64;

    let mut signals = Vec::new();
    for drug in &drugs {
        let drug_total = co.drug_total(drug);
        for reaction in &reactions {
            let a = co.pair_count(drug, reaction);
            if a < config.min_cases {
                continue;
            }
            let Some(table) = ContingencyTable::from_margins(
                a,
                drug_total,
                co.reaction_total(reaction),
                co.total_rows(),
            ) else {
                continue;
            };

            let prr = table.prr();
            let chi2 = table.chi_square(n_total);
            if prr >= config.prr_threshold && chi2 >= config.chi2_threshold {
                let (ror, ror_ci_low, ror_ci_high) = table.ror_with_ci();
                signals.push(Signal {
                    drug: (*drug).to_string(),
                    reaction: (*reaction).to_string(),
                    prr,
                    chi2,
                    cases: a,
                    strength: SignalStrength::from_prr(prr),
                    ror,
                    ror_ci_low,
                    ror_ci_high,
                });
            }
        }
    }

    sort_signals(&mut signals);
    info!(
        drugs = drugs.len(),
        reactions = reactions.len(),
        signals = signals.len(),
        "disproportionality scan complete"
    );
    signals
}

/// PRR descending, then case count descending, then names.
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(|x, y| {
        y.prr
            .partial_cmp(&x.prr)
            .unwrap_or(Ordering::Equal)
            .then_with(|| y.cases.cmp(&x.cases))
            .then_with(|| x.drug.cmp(&y.drug))
            .then_with(|| x.reaction.cmp(&y.reaction))
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugCount {
    pub drug: String,
    pub reports: usize,
}

/// Most frequently reported primary-suspect drugs by drug-record count.
pub fn top_reported_drugs(store: &RecordStore, n: usize) -> Vec<DrugCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in store
        .drugs
        .iter()
        .filter(|d| d.is_primary_suspect())
        .filter_map(|d| d.drug_name.as_deref())
    {
        *counts.entry(name).or_insert(0) += 1;
    }
    let mut ranked: Vec<DrugCount> = counts
        .into_iter()
        .map(|(drug, reports)| DrugCount {
            drug: drug.to_string(),
            reports,
        })
        .collect();
    ranked.sort_by(|x, y| y.reports.cmp(&x.reports).then_with(|| x.drug.cmp(&y.drug)));
    ranked.truncate(n);
    ranked
}
