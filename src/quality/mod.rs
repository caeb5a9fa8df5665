//! Structural quality checks over the demographics table.

pub mod anomaly;

use std::collections::HashMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::data::{Case, RecordStore};

/// Critical fields whose completeness is reported, in display order.
pub const CRITICAL_FIELDS: &[CriticalField] = &[
    CriticalField::CaseId,
    CriticalField::ReceiptDate,
    CriticalField::EventDate,
    CriticalField::Age,
    CriticalField::Sex,
    CriticalField::ReporterCountry,
    CriticalField::ReportCode,
];

const MAX_VALID_AGE: f64 = 120.0;
const LOW_QUALITY: f64 = 50.0;
const HIGH_QUALITY: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticalField {
    CaseId,
    ReceiptDate,
    EventDate,
    Age,
    Sex,
    ReporterCountry,
    ReportCode,
}

impl CriticalField {
    pub fn label(self) -> &'static str {
        match self {
            Self::CaseId => "Case ID",
            Self::ReceiptDate => "FDA Receipt Date",
            Self::EventDate => "Event Date",
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ReporterCountry => "Reporter Country",
            Self::ReportCode => "Report Code",
        }
    }

    pub fn is_present(self, case: &Case) -> bool {
        match self {
            Self::CaseId => case.case_id.is_some(),
            Self::ReceiptDate => case.receipt_date.is_some(),
            Self::EventDate => case.event_date.is_some(),
            Self::Age => case.age.is_some(),
            Self::Sex => case.sex.is_some(),
            Self::ReporterCountry => case.reporter_country.is_some(),
            Self::ReportCode => case.report_code.is_some(),
        }
    }
}

/// Per-field completeness and their unweighted mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessReport {
    /// Field label to percentage of non-missing values (0-100).
    pub fields: IndexMap<String, f64>,
    /// `None` when there are no cases to measure.
    pub overall: Option<f64>,
}

/// Percentage of cases carrying each critical field.
///
/// An empty table yields no field entries and no overall score.
pub fn completeness(cases: &[Case]) -> CompletenessReport {
    if cases.is_empty() {
        warn!("completeness requested for an empty case table");
        return CompletenessReport {
            fields: IndexMap::new(),
            overall: None,
        };
    }

    let total = cases.len() as f64;
    let fields: IndexMap<String, f64> = CRITICAL_FIELDS
        .iter()
        .map(|field| {
            let present = cases.iter().filter(|c| field.is_present(c)).count();
            (field.label().to_string(), present as f64 / total * 100.0)
        })
        .collect();
    let overall = fields.values().sum::<f64>() / fields.len() as f64;
    CompletenessReport {
        fields,
        overall: Some(overall),
    }
}

/// Composite 0-100 quality score of a single case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaseScore {
    /// Row index of the case in the demographics table.
    pub index: usize,
    pub completeness: f64,
    pub age_validity: f64,
    pub date_validity: f64,
    pub reporter_info: f64,
    pub total: f64,
}

pub fn score_case(index: usize, case: &Case) -> CaseScore {
    let scored = [
        case.case_id.is_some(),
        case.receipt_date.is_some(),
        case.age.is_some(),
        case.sex.is_some(),
        case.reporter_country.is_some(),
    ];
    let present = scored.iter().filter(|p| **p).count() as f64;
    let completeness = present / scored.len() as f64 * 40.0;

    let age_validity = match case.age {
        Some(age) if (0.0..=MAX_VALID_AGE).contains(&age) => 20.0,
        _ => 0.0,
    };

    // Flat award; receipt/event date consistency is not checked yet.
    let date_validity = 20.0;

    let mut reporter_info = 0.0;
    if case.reporter_country.is_some() {
        reporter_info += 10.0;
    }
    if case.occupation.is_some() {
        reporter_info += 10.0;
    }

    CaseScore {
        index,
        completeness,
        age_validity,
        date_validity,
        reporter_info,
        total: completeness + age_validity + date_validity + reporter_info,
    }
}

/// Score every case independently, preserving table order.
pub fn case_scores(cases: &[Case]) -> Vec<CaseScore> {
    cases
        .iter()
        .enumerate()
        .map(|(idx, case)| score_case(idx, case))
        .collect()
}

/// Distribution summary of case scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub cases: usize,
    pub mean: f64,
    pub median: f64,
    /// Cases scoring below 50.
    pub low_quality: usize,
    /// Cases scoring above 80.
    pub high_quality: usize,
    pub low_quality_pct: f64,
    pub high_quality_pct: f64,
}

pub fn summarize_scores(scores: &[CaseScore]) -> Option<ScoreSummary> {
    if scores.is_empty() {
        return None;
    }
    let n = scores.len();
    let mut totals: Vec<f64> = scores.iter().map(|s| s.total).collect();
    totals.sort_by(f64::total_cmp);
    let mean = totals.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (totals[n / 2 - 1] + totals[n / 2]) / 2.0
    } else {
        totals[n / 2]
    };
    let low_quality = totals.iter().filter(|t| **t < LOW_QUALITY).count();
    let high_quality = totals.iter().filter(|t| **t > HIGH_QUALITY).count();
    Some(ScoreSummary {
        cases: n,
        mean,
        median,
        low_quality,
        high_quality,
        low_quality_pct: low_quality as f64 / n as f64 * 100.0,
        high_quality_pct: high_quality as f64 / n as f64 * 100.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingField {
    pub column: String,
    pub missing: usize,
    pub missing_pct: f64,
}

/// Demographics columns with any missing values, most incomplete first.
pub fn missing_profile(store: &RecordStore) -> Vec<MissingField> {
    let total = store.cases.len();
    if total == 0 {
        return Vec::new();
    }
    let mut rows: Vec<MissingField> = store
        .demographics_profile()
        .iter()
        .filter(|p| p.missing > 0)
        .map(|p| MissingField {
            column: p.column.clone(),
            missing: p.missing,
            missing_pct: p.missing as f64 / total as f64 * 100.0,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.missing_pct
            .total_cmp(&a.missing_pct)
            .then_with(|| a.column.cmp(&b.column))
    });
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Row indices whose case id occurs more than once.
    pub exact: Vec<usize>,
    /// Row indices sharing age, sex, event date and reporter country with another aged case.
    pub potential: Vec<usize>,
    /// Exact duplicate records as a percentage of all cases.
    pub duplicate_rate: Option<f64>,
}

type DemographicKey<'a> = (u64, Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// Flag repeated case ids and look-alike demographic records.
///
/// Every occurrence of a repeated key is reported, not only the later ones.
pub fn detect_duplicates(cases: &[Case]) -> DuplicateReport {
    let mut id_counts: HashMap<&str, usize> = HashMap::new();
    for id in cases.iter().filter_map(|c| c.case_id.as_deref()) {
        *id_counts.entry(id).or_insert(0) += 1;
    }
    let exact: Vec<usize> = cases
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.case_id
                .as_deref()
                .is_some_and(|id| id_counts.get(id).copied().unwrap_or(0) > 1)
        })
        .map(|(idx, _)| idx)
        .collect();

    let mut key_counts: HashMap<DemographicKey<'_>, usize> = HashMap::new();
    for k in cases.iter().filter_map(demographic_key) {
        *key_counts.entry(k).or_insert(0) += 1;
    }
    let potential: Vec<usize> = cases
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            demographic_key(c).is_some_and(|k| key_counts.get(&k).copied().unwrap_or(0) > 1)
        })
        .map(|(idx, _)| idx)
        .collect();

    let duplicate_rate = if cases.is_empty() {
        None
    } else {
        Some(exact.len() as f64 / cases.len() as f64 * 100.0)
    };
    debug!(
        exact = exact.len(),
        potential = potential.len(),
        "duplicate scan complete"
    );
    DuplicateReport {
        exact,
        potential,
        duplicate_rate,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cases", rename_all = "snake_case")]
pub enum DataEntryIssue {
    InvalidAge(usize),
    FutureReceiptDate(usize),
    MissingCaseId(usize),
}

impl std::fmt::Display for DataEntryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAge(n) => write!(f, "Invalid ages: {n} cases"),
            Self::FutureReceiptDate(n) => write!(f, "Future FDA receipt dates: {n} cases"),
            Self::MissingCaseId(n) => write!(f, "Missing case IDs: {n} cases"),
        }
    }
}

fn demographic_key(case: &Case) -> Option<DemographicKey<'_>> {
    case.age.map(|age| {
        (
            age.to_bits(),
            case.sex.as_deref(),
            case.event_date.as_deref(),
            case.reporter_country.as_deref(),
        )
    })
}

/// Scan for implausible values; `as_of` is the reference day for future dates.
pub fn data_entry_issues(cases: &[Case], as_of: NaiveDate) -> Vec<DataEntryIssue> {
    let invalid_ages = cases
        .iter()
        .filter(|c| c.age.is_some_and(|a| !(0.0..=MAX_VALID_AGE).contains(&a)))
        .count();
    let future_dates = cases
        .iter()
        .filter(|c| c.receipt_day().is_some_and(|d| d > as_of))
        .count();
    let missing_ids = cases.iter().filter(|c| c.case_id.is_none()).count();

    [
        DataEntryIssue::InvalidAge(invalid_ages),
        DataEntryIssue::FutureReceiptDate(future_dates),
        DataEntryIssue::MissingCaseId(missing_ids),
    ]
    .into_iter()
    .filter(|issue| match issue {
        DataEntryIssue::InvalidAge(n)
        | DataEntryIssue::FutureReceiptDate(n)
        | DataEntryIssue::MissingCaseId(n) => *n > 0,
    })
    .collect()
}
