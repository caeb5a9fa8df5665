//! HTTP route handlers for Axum.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    analytics::{Analysis, AnalysisOutput, EngineConfig, TOP_REPORTED_DRUGS},
    api::types::{QualityDto, SignalQuery, TopQuery},
    config::AnomalyConfig,
    quality::{
        self,
        anomaly::{self, AnomalyReport},
    },
    signals::{
        self,
        outcomes::{self, OutcomeReport},
        risk::{self, RiskAssessment},
        DrugCount, Signal,
    },
};

use super::AppState;

pub async fn quality(State(state): State<AppState>) -> Json<QualityDto> {
    let cases = &state.store.cases;
    let scores = quality::case_scores(cases);
    let duplicates = quality::detect_duplicates(cases);
    let issues = quality::data_entry_issues(cases, Utc::now().date_naive());
    Json(QualityDto {
        completeness: quality::completeness(cases),
        scores: quality::summarize_scores(&scores),
        missing: quality::missing_profile(&state.store),
        exact_duplicates: duplicates.exact.len(),
        potential_duplicates: duplicates.potential.len(),
        duplicate_rate: duplicates.duplicate_rate,
        issues: issues.iter().map(ToString::to_string).collect(),
    })
}

pub async fn anomalies(State(state): State<AppState>) -> Json<AnomalyReport> {
    Json(anomaly::detect(&state.store.cases, &AnomalyConfig::default()))
}

pub async fn outcomes(State(state): State<AppState>) -> Json<OutcomeReport> {
    Json(outcomes::classify(&state.store))
}

pub async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<SignalQuery>,
) -> Json<Vec<Signal>> {
    let config = query.overrides().resolve(state.settings.signal_mode);
    let mut found = signals::detect_signals(&state.store, &config);
    if let Some(drug) = &query.drug {
        found.retain(|s| s.drug.eq_ignore_ascii_case(drug));
    }
    if let Some(limit) = query.limit {
        found.truncate(limit);
    }
    Json(found)
}

pub async fn top_drugs(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Json<Vec<DrugCount>> {
    let n = query.n.unwrap_or(TOP_REPORTED_DRUGS);
    Json(signals::top_reported_drugs(&state.store, n))
}

pub async fn risk(State(state): State<AppState>) -> Json<RiskAssessment> {
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || risk::assess(&store)).await {
        Ok(assessment) => Json(assessment),
        Err(err) => Json(RiskAssessment::Failed {
            reason: err.to_string(),
        }),
    }
}

pub async fn run_analysis(
    Path(analysis): Path<Analysis>,
    State(state): State<AppState>,
) -> Json<AnalysisOutput> {
    let config = EngineConfig {
        signals: state.settings.signal_mode.signal_config(),
        ..EngineConfig::default()
    };
    Json(analysis.run(&state.store, &config))
}
