mod common;

use chrono::NaiveDate;
use faers_surveillance::{
    config::AnomalyConfig,
    data::Case,
    quality::anomaly::{self, is_anomalous},
};

fn day(d: u32) -> String {
    format!("202507{d:02}")
}

fn cases_per_day(volumes: &[(u32, usize)]) -> Vec<Case> {
    let mut cases = Vec::new();
    for (d, count) in volumes {
        for i in 0..*count {
            cases.push(common::case_on(&format!("{d}-{i}"), &day(*d)));
        }
    }
    cases
}

#[test]
fn threshold_comparison_is_strict() {
    assert!(!is_anomalous(3.0, 3.0));
    assert!(!is_anomalous(-3.0, 3.0));
    assert!(is_anomalous(3.0001, 3.0));
    assert!(is_anomalous(-3.0001, 3.0));
}

#[test]
fn detector_flags_only_beyond_the_threshold() {
    let mut volumes: Vec<(u32, usize)> = (1..=21).map(|d| (d, 1)).collect();
    volumes[9].1 = 30;
    let cases = cases_per_day(&volumes);
    let spike_z = anomaly::detect(&cases, &AnomalyConfig::default()).days[9].z_score;
    assert!(spike_z > 3.0);

    let at_boundary = anomaly::detect(&cases, &AnomalyConfig { z_threshold: spike_z });
    assert_eq!(at_boundary.anomalies, 0);
    assert!(!at_boundary.days[9].is_anomaly);

    let just_below = AnomalyConfig {
        z_threshold: spike_z - 1e-9,
    };
    let flagged = anomaly::detect(&cases, &just_below);
    assert_eq!(flagged.anomalies, 1);
    assert!(flagged.days[9].is_anomaly);
    assert_eq!(flagged.days[9].date, NaiveDate::from_ymd_opt(2025, 7, 10).expect("date"));
}

#[test]
fn spike_is_flagged() {
    let mut volumes: Vec<(u32, usize)> = (1..=21).map(|d| (d, 1)).collect();
    volumes[9].1 = 30;
    let report = anomaly::detect(&cases_per_day(&volumes), &AnomalyConfig::default());

    assert_eq!(report.days.len(), 21);
    assert_eq!(report.anomalies, 1);
    let flagged: Vec<_> = report.days.iter().filter(|d| d.is_anomaly).collect();
    assert_eq!(flagged[0].date, NaiveDate::from_ymd_opt(2025, 7, 10).expect("date"));
    assert_eq!(flagged[0].count, 30);
    assert!(flagged[0].z_score > 3.0);

    let top = report.top_anomalous(3);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].count, 30);
}

#[test]
fn z_scores_use_sample_standard_deviation() {
    let report = anomaly::detect(
        &cases_per_day(&[(1, 1), (2, 2), (3, 3)]),
        &AnomalyConfig::default(),
    );
    assert_eq!(report.mean, Some(2.0));
    assert_eq!(report.std_dev, Some(1.0));
    let z: Vec<f64> = report.days.iter().map(|d| d.z_score).collect();
    assert_eq!(z, vec![-1.0, 0.0, 1.0]);
}

#[test]
fn uniform_volume_never_flags() {
    let volumes: Vec<(u32, usize)> = (1..=10).map(|d| (d, 4)).collect();
    let report = anomaly::detect(&cases_per_day(&volumes), &AnomalyConfig::default());
    assert_eq!(report.std_dev, Some(0.0));
    assert_eq!(report.anomalies, 0);
    assert!(report.days.iter().all(|d| d.z_score == 0.0 && !d.is_anomaly));
}

#[test]
fn single_day_and_empty_series_are_quiet() {
    let single = anomaly::detect(&cases_per_day(&[(5, 9)]), &AnomalyConfig::default());
    assert_eq!(single.days.len(), 1);
    assert_eq!(single.std_dev, None);
    assert_eq!(single.anomalies, 0);

    let empty = anomaly::detect(&[], &AnomalyConfig::default());
    assert!(empty.days.is_empty());
    assert_eq!(empty.mean, None);
}

#[test]
fn unparseable_dates_are_skipped_and_order_is_calendar() {
    let cases = vec![
        common::case_on("a", "20250703"),
        common::case_on("b", "20250701"),
        common::case_on("c", "2025XX01"),
        common::case_on("d", "202507"),
        common::case_on("e", "20250230"),
        common::case("f"),
        common::case_on("g", "20250703"),
    ];
    let counts = anomaly::daily_counts(&cases);
    let days: Vec<(String, usize)> = counts.iter().map(|(d, c)| (d.to_string(), *c)).collect();
    assert_eq!(
        days,
        vec![("2025-07-01".to_string(), 1), ("2025-07-03".to_string(), 2)]
    );
}
