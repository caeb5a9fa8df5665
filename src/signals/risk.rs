//! Serious-outcome risk model over case demographics.
//!
//! Each case is left-joined with its outcome rows on `(primaryid, caseid)`; every
//! joined row becomes one sample labelled serious when its outcome code is in the
//! serious set. A logistic regression is fitted on a deterministic stratified
//! split and scored on the held-out rows.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use linfa::{dataset::DatasetBase, prelude::Fit};
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::{info, warn};

use crate::data::{store::ReportKey, Case, RecordStore};

use super::outcomes::category_for;

/// Feature columns, in matrix order.
pub const FEATURES: [&str; 9] = [
    "age",
    "age_unknown",
    "age_elderly",
    "age_pediatric",
    "sex_male",
    "sex_female",
    "reporter_md",
    "reporter_pharm",
    "expedited",
];

/// Joined rows must exceed this count before a model is fitted.
pub const MIN_ROWS: usize = 100;
/// Each class must have more rows than this.
pub const MIN_CLASS_ROWS: usize = 10;

const MAX_ITERATIONS: u64 = 150;
const ELDERLY_AGE: f64 = 65.0;
const PEDIATRIC_AGE: f64 = 18.0;

/// Weight of one feature in the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub coefficient: f64,
    /// Share of the total absolute coefficient mass.
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskModel {
    pub rows: usize,
    pub serious_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the test split holds a single class.
    pub auc: Option<f64>,
    pub accuracy: f64,
    /// Most important first.
    pub features: Vec<FeatureWeight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RiskAssessment {
    InsufficientData { rows: usize, serious_rows: usize },
    Failed { reason: String },
    Trained(RiskModel),
}

/// One joined sample before imputation.
#[derive(Debug, Clone, Copy)]
struct Sample<'a> {
    case: &'a Case,
    serious: bool,
}

/// Fit and evaluate the serious-outcome model for a snapshot.
pub fn assess(store: &RecordStore) -> RiskAssessment {
    let samples = joined_samples(store);
    let serious_rows = samples.iter().filter(|s| s.serious).count();
    let other_rows = samples.len() - serious_rows;
    if samples.len() <= MIN_ROWS || serious_rows <= MIN_CLASS_ROWS || other_rows <= MIN_CLASS_ROWS
    {
        info!(
            rows = samples.len(),
            serious_rows, "too little outcome data for a risk model"
        );
        return RiskAssessment::InsufficientData {
            rows: samples.len(),
            serious_rows,
        };
    }

    match fit(&samples) {
        Ok(model) => {
            info!(
                rows = model.rows,
                auc = ?model.auc,
                accuracy = model.accuracy,
                "risk model evaluated"
            );
            RiskAssessment::Trained(model)
        }
        Err(err) => {
            warn!(%err, "risk model fit failed");
            RiskAssessment::Failed {
                reason: err.to_string(),
            }
        }
    }
}

fn joined_samples(store: &RecordStore) -> Vec<Sample<'_>> {
    let mut outcomes: HashMap<ReportKey<'_>, Vec<bool>> = HashMap::new();
    for record in &store.outcomes {
        if let Some(key) = record.report_key() {
            let serious = record.outcome_code.as_deref().and_then(category_for).is_some();
            outcomes.entry(key).or_default().push(serious);
        }
    }

    let mut samples = Vec::with_capacity(store.cases.len());
    for case in &store.cases {
        match case.report_key().and_then(|key| outcomes.get(&key)) {
            Some(flags) => {
                samples.extend(flags.iter().map(|&serious| Sample { case, serious }));
            }
            None => samples.push(Sample {
                case,
                serious: false,
            }),
        }
    }
    samples
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    Some(if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    })
}

fn feature_row(case: &Case, fill_age: f64) -> [f64; 9] {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let age = case.age.unwrap_or(fill_age);
    let sex = case.sex.as_deref();
    let occupation = case.occupation.as_deref();
    [
        age,
        flag(case.age.is_none()),
        flag(age >= ELDERLY_AGE),
        flag(age < PEDIATRIC_AGE),
        flag(sex == Some("M")),
        flag(sex == Some("F")),
        flag(occupation == Some("MD")),
        flag(occupation == Some("PH")),
        flag(case.report_code.as_deref() == Some("EXP")),
    ]
}

/// Within each class, positions 7..=9 of every ten go to the test split.
fn is_test_row(position_in_class: usize) -> bool {
    position_in_class % 10 >= 7
}

fn fit(samples: &[Sample<'_>]) -> Result<RiskModel> {
    let mut ages: Vec<f64> = samples.iter().filter_map(|s| s.case.age).collect();
    let fill_age = median(&mut ages).unwrap_or(0.0);

    let (mut train, mut test) = (Vec::new(), Vec::new());
    let mut seen = [0usize; 2];
    for sample in samples {
        let class = usize::from(sample.serious);
        let row = (feature_row(sample.case, fill_age), i32::from(sample.serious));
        if is_test_row(seen[class]) {
            test.push(row);
        } else {
            train.push(row);
        }
        seen[class] += 1;
    }

    // Age is the only unbounded column; scale it with training statistics.
    let n_train = train.len() as f64;
    let age_mean = train.iter().map(|(x, _)| x[0]).sum::<f64>() / n_train;
    let age_var = train
        .iter()
        .map(|(x, _)| (x[0] - age_mean).powi(2))
        .sum::<f64>()
        / n_train;
    let age_scale = if age_var > 0.0 { age_var.sqrt() } else { 1.0 };
    let to_matrix = |rows: &[([f64; 9], i32)]| -> Result<(Array2<f64>, Array1<i32>)> {
        let values: Vec<f64> = rows
            .iter()
            .flat_map(|(x, _)| {
                let mut x = *x;
                x[0] = (x[0] - age_mean) / age_scale;
                x
            })
            .collect();
        let x = Array2::from_shape_vec((rows.len(), FEATURES.len()), values)?;
        let y = Array1::from(rows.iter().map(|(_, y)| *y).collect::<Vec<_>>());
        Ok((x, y))
    };

    let (x_train, y_train) = to_matrix(&train)?;
    let (x_test, y_test) = to_matrix(&test)?;
    let dataset = DatasetBase::new(x_train, y_train);
    let fitted = LogisticRegression::default()
        .max_iterations(MAX_ITERATIONS)
        .fit(&dataset)
        .map_err(|err| anyhow!("logistic regression: {err}"))?;

    // Probabilities are for the larger label, i.e. serious = 1.
    let probabilities = fitted.predict_probabilities(&x_test);
    let labels: Vec<bool> = y_test.iter().map(|y| *y == 1).collect();
    let correct = probabilities
        .iter()
        .zip(&labels)
        .filter(|(p, serious)| (**p >= 0.5) == **serious)
        .count();
    let accuracy = correct as f64 / labels.len() as f64;
    let auc = roc_auc(&probabilities.to_vec(), &labels);

    let coefficients = fitted.params();
    let mass: f64 = coefficients.iter().map(|w| w.abs()).sum();
    let mut features: Vec<FeatureWeight> = FEATURES
        .iter()
        .zip(coefficients.iter())
        .map(|(name, w)| FeatureWeight {
            feature: (*name).to_string(),
            coefficient: *w,
            importance: if mass > 0.0 { w.abs() / mass } else { 0.0 },
        })
        .collect();
    features.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });

    Ok(RiskModel {
        rows: samples.len(),
        serious_rows: samples.iter().filter(|s| s.serious).count(),
        train_rows: train.len(),
        test_rows: test.len(),
        auc,
        accuracy,
        features,
    })
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share ranks.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    if scores.len() != labels.len() {
        return None;
    }
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        let shared = (start + end) as f64 / 2.0 + 1.0;
        for idx in &order[start..=end] {
            ranks[*idx] = shared;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|(_, l)| **l)
        .map(|(r, _)| *r)
        .sum();
    let (p, n) = (positives as f64, negatives as f64);
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
