mod common;

use std::{path::PathBuf, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{case, drug, outcome, reaction};
use faers_surveillance::{
    api::{router, AppState},
    config::{AnalysisMode, Settings},
    data::RecordStore,
};
use serde_json::Value;
use tower::ServiceExt;

/// One rare pair seen once plus a frequent pair seen twenty times.
fn store() -> RecordStore {
    let mut cases = vec![case("r1"), case("r2"), case("i1")];
    let mut drugs = vec![
        drug("r1", "RARE", "PS"),
        drug("r2", "RARE", "PS"),
        drug("i1", "IBUPROFEN", "PS"),
    ];
    let mut reactions = vec![
        reaction("r1", "ODD"),
        reaction("r2", "HEADACHE"),
        reaction("i1", "ODD"),
    ];
    for idx in 2..=21 {
        let id = format!("i{idx}");
        cases.push(case(&id));
        drugs.push(drug(&id, "IBUPROFEN", "PS"));
        reactions.push(reaction(&id, "HEADACHE"));
    }
    RecordStore::new(
        cases,
        drugs,
        reactions,
        vec![outcome("r1", "DE"), outcome("i1", "OT")],
    )
}

fn app() -> Router {
    let settings = Settings {
        data_dir: PathBuf::from("./data"),
        outputs_dir: PathBuf::from("./outputs"),
        sample_size: 100,
        signal_mode: AnalysisMode::Demo,
    };
    router(AppState {
        settings,
        store: Arc::new(store()),
    })
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn pairs(json: &Value) -> Vec<(String, String)> {
    json.as_array()
        .expect("signal array")
        .iter()
        .map(|s| {
            (
                s["drug"].as_str().unwrap_or_default().to_string(),
                s["reaction"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn signals_use_the_configured_preset() {
    let (status, json) = get("/signals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        pairs(&json),
        vec![("IBUPROFEN".to_string(), "HEADACHE".to_string())]
    );
    assert_eq!(json[0]["cases"], 20);
    assert_eq!(json[0]["strength"], "Strong");
}

#[tokio::test]
async fn signal_query_overrides_apply_unclamped() {
    let (_, relaxed) = get("/signals?min_cases=1").await;
    assert_eq!(pairs(&relaxed).len(), 2);
    assert!(pairs(&relaxed).contains(&("RARE".to_string(), "ODD".to_string())));

    let (_, strict) = get("/signals?min_cases=1&prr=25").await;
    assert!(pairs(&strict).is_empty());

    let (_, no_scope) = get("/signals?top_drugs=0").await;
    assert!(pairs(&no_scope).is_empty());

    let (_, filtered) = get("/signals?min_cases=1&drug=rare&limit=5").await;
    assert_eq!(pairs(&filtered), vec![("RARE".to_string(), "ODD".to_string())]);
}

#[tokio::test]
async fn outcomes_report_every_category() {
    let (status, json) = get("/outcomes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_cases"], 23);
    assert_eq!(json["serious_rows"], 1);
    assert_eq!(json["categories"]["Death"]["count"], 1);
    assert_eq!(
        json["categories"].as_object().expect("categories").len(),
        6
    );
}

#[tokio::test]
async fn analysis_dispatch_by_name() {
    let (status, json) = get("/analysis/outcomes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["analysis"], "outcomes");
    assert_eq!(json["total_cases"], 23);

    let (status, json) = get("/analysis/signals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["signals"].as_array().expect("signals").len(), 1);

    let (status, _) = get("/analysis/bayes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remaining_routes_respond() {
    let (status, json) = get("/drugs/top?n=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["drug"], "IBUPROFEN");
    assert_eq!(json[0]["reports"], 21);

    let (status, json) = get("/quality").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["completeness"]["fields"]["Case ID"], 100.0);

    let (_, json) = get("/anomalies").await;
    assert_eq!(json["anomalies"], 0);

    let (_, json) = get("/risk").await;
    assert_eq!(json["status"], "insufficient_data");
}
