//! Shared DTOs for JSON responses and query strings.

use serde::{Deserialize, Serialize};

use crate::{
    config::{AnalysisMode, SignalOverrides},
    quality::{CompletenessReport, MissingField, ScoreSummary},
};

#[derive(Debug, Clone, Serialize)]
pub struct QualityDto {
    pub completeness: CompletenessReport,
    pub scores: Option<ScoreSummary>,
    pub missing: Vec<MissingField>,
    pub exact_duplicates: usize,
    pub potential_duplicates: usize,
    pub duplicate_rate: Option<f64>,
    pub issues: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignalQuery {
    pub mode: Option<AnalysisMode>,
    pub top_drugs: Option<usize>,
    pub top_reactions: Option<usize>,
    pub min_cases: Option<u64>,
    pub prr: Option<f64>,
    pub chi2: Option<f64>,
    /// Case-insensitive drug name filter applied after detection.
    pub drug: Option<String>,
    pub limit: Option<usize>,
}

impl SignalQuery {
    pub fn overrides(&self) -> SignalOverrides {
        SignalOverrides {
            mode: self.mode,
            top_drugs: self.top_drugs,
            top_reactions: self.top_reactions,
            min_cases: self.min_cases,
            prr: self.prr,
            chi2: self.chi2,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub n: Option<usize>,
}
