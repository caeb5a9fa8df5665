mod common;

use common::{case, outcome};
use faers_surveillance::{
    data::{Case, RecordStore},
    signals::risk::{self, roc_auc, RiskAssessment, FEATURES},
};

/// Elderly cases are mostly serious, younger ones mostly not.
fn cohort(size: usize) -> RecordStore {
    let mut cases = Vec::new();
    let mut outcomes = Vec::new();
    for idx in 0..size {
        let id = idx.to_string();
        let elderly = idx % 2 == 0;
        cases.push(Case {
            age: Some(if elderly { 78.0 } else { 34.0 }),
            sex: Some(if idx % 3 == 0 { "M" } else { "F" }.to_string()),
            report_code: Some(if idx % 4 == 0 { "PER" } else { "EXP" }.to_string()),
            ..case(&id)
        });
        let serious = if idx % 5 == 0 { !elderly } else { elderly };
        if serious {
            outcomes.push(outcome(&id, "HO"));
        } else if idx % 7 == 0 {
            outcomes.push(outcome(&id, "OT"));
        }
    }
    RecordStore::new(cases, vec![], vec![], outcomes)
}

#[test]
fn small_cohorts_are_not_modelled() {
    match risk::assess(&cohort(60)) {
        RiskAssessment::InsufficientData { rows, serious_rows } => {
            assert_eq!(rows, 60);
            assert!(serious_rows > 0);
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
    assert!(matches!(
        risk::assess(&RecordStore::default()),
        RiskAssessment::InsufficientData { rows: 0, .. }
    ));
}

#[test]
fn model_separates_elderly_serious_cases() {
    let RiskAssessment::Trained(model) = risk::assess(&cohort(300)) else {
        panic!("model should train on 300 rows");
    };
    assert_eq!(model.rows, 300);
    assert_eq!(model.train_rows + model.test_rows, 300);
    assert!(model.test_rows >= 80 && model.test_rows <= 100);
    assert!(model.accuracy > 0.7, "accuracy {}", model.accuracy);
    assert!(model.auc.expect("both classes in test") > 0.7);

    assert_eq!(model.features.len(), FEATURES.len());
    assert!(["age", "age_elderly"].contains(&model.features[0].feature.as_str()));
    let total: f64 = model.features.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn assessment_is_deterministic() {
    let store = cohort(240);
    assert_eq!(risk::assess(&store), risk::assess(&store));
}

#[test]
fn auc_counts_ties_as_half() {
    let perfect = roc_auc(&[0.1, 0.2, 0.8, 0.9], &[false, false, true, true]);
    assert_eq!(perfect, Some(1.0));
    let inverted = roc_auc(&[0.9, 0.8, 0.2, 0.1], &[false, false, true, true]);
    assert_eq!(inverted, Some(0.0));
    let tied = roc_auc(&[0.5, 0.5], &[false, true]);
    assert_eq!(tied, Some(0.5));
    assert_eq!(roc_auc(&[0.3, 0.4], &[true, true]), None);
}
