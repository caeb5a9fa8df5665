//! Dispatch over the independent analyses of a record-store snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    config::{AnomalyConfig, SignalConfig},
    data::RecordStore,
    quality::{self, anomaly, CaseScore, CompletenessReport},
    signals::{self, outcomes, risk, trend, DrugCount, Signal},
};

/// Number of drugs listed in the most-reported table.
pub const TOP_REPORTED_DRUGS: usize = 20;

/// Parameters shared by a full analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineConfig {
    pub signals: SignalConfig,
    pub anomaly: AnomalyConfig,
}

/// The four core analyses; each is a pure function of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    Completeness,
    Anomalies,
    Outcomes,
    Signals,
}

impl Analysis {
    pub const ALL: [Analysis; 4] = [
        Analysis::Completeness,
        Analysis::Anomalies,
        Analysis::Outcomes,
        Analysis::Signals,
    ];

    pub fn run(self, store: &RecordStore, config: &EngineConfig) -> AnalysisOutput {
        match self {
            Self::Completeness => AnalysisOutput::Completeness {
                completeness: quality::completeness(&store.cases),
                scores: quality::case_scores(&store.cases),
            },
            Self::Anomalies => {
                AnalysisOutput::Anomalies(anomaly::detect(&store.cases, &config.anomaly))
            }
            Self::Outcomes => AnalysisOutput::Outcomes(outcomes::classify(store)),
            Self::Signals => AnalysisOutput::Signals {
                signals: signals::detect_signals(store, &config.signals),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Completeness {
        completeness: CompletenessReport,
        scores: Vec<CaseScore>,
    },
    Anomalies(anomaly::AnomalyReport),
    Outcomes(outcomes::OutcomeReport),
    Signals { signals: Vec<Signal> },
}

/// Every analysis bundled for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub config: EngineConfig,
    pub total_cases: usize,
    pub completeness: CompletenessReport,
    pub score_summary: Option<quality::ScoreSummary>,
    pub missing: Vec<quality::MissingField>,
    pub duplicates: quality::DuplicateReport,
    pub issues: Vec<quality::DataEntryIssue>,
    pub anomalies: anomaly::AnomalyReport,
    pub monthly: Vec<trend::MonthlyCount>,
    pub outcomes: outcomes::OutcomeReport,
    pub top_drugs: Vec<DrugCount>,
    pub signals: Vec<Signal>,
    pub risk: risk::RiskAssessment,
}

impl Report {
    /// Run everything sequentially; `as_of` anchors the future-date check.
    #[instrument(skip(store))]
    pub fn build(store: &RecordStore, config: &EngineConfig, as_of: NaiveDate) -> Self {
        let scores = quality::case_scores(&store.cases);
        Self {
            config: *config,
            total_cases: store.cases.len(),
            completeness: quality::completeness(&store.cases),
            score_summary: quality::summarize_scores(&scores),
            missing: quality::missing_profile(store),
            duplicates: quality::detect_duplicates(&store.cases),
            issues: quality::data_entry_issues(&store.cases, as_of),
            anomalies: anomaly::detect(&store.cases, &config.anomaly),
            monthly: trend::monthly_trend(&store.cases),
            outcomes: outcomes::classify(store),
            top_drugs: signals::top_reported_drugs(store, TOP_REPORTED_DRUGS),
            signals: signals::detect_signals(store, &config.signals),
            risk: risk::assess(store),
        }
    }
}
