mod common;

use common::{case, drug, reaction, version};
use faers_surveillance::{
    config::SignalConfig,
    data::{DrugRecord, ReactionRecord, RecordStore},
    signals::{self, evaluate, sort_signals, CoOccurrence, Signal, SignalStrength},
};
use proptest::prelude::*;

fn repeat<'a>(rows: &[(&'a str, &'a str, usize)]) -> Vec<(&'a str, &'a str)> {
    rows.iter()
        .flat_map(|(d, r, n)| std::iter::repeat((*d, *r)).take(*n))
        .collect()
}

fn relaxed(min_cases: u64) -> SignalConfig {
    SignalConfig {
        min_cases,
        ..SignalConfig::demo()
    }
}

fn rare_pair_rows() -> Vec<(&'static str, &'static str)> {
    repeat(&[
        ("RARE", "ODD", 1),
        ("RARE", "HEADACHE", 1),
        ("IBUPROFEN", "ODD", 1),
        ("IBUPROFEN", "HEADACHE", 20),
    ])
}

#[test]
fn join_expands_drugs_by_reactions_per_case() {
    let store = RecordStore::new(
        vec![case("1"), case("2")],
        vec![
            drug("1", "A", "PS"),
            drug("1", "B", "PS"),
            drug("1", "C", "SS"),
            drug("2", "A", "PS"),
        ],
        vec![
            reaction("1", "X"),
            reaction("1", "Y"),
            reaction("1", "Z"),
            reaction("3", "X"),
        ],
        vec![],
    );
    let co = CoOccurrence::from_store(&store);
    assert_eq!(co.total_rows(), 6);
    assert_eq!(co.drug_total("A"), 3);
    assert_eq!(co.drug_total("B"), 3);
    assert_eq!(co.drug_total("C"), 0);
    assert_eq!(co.reaction_total("X"), 2);
    assert_eq!(co.pair_count("A", "X"), 1);
}

#[test]
fn pair_below_min_cases_is_never_emitted() {
    let rows = rare_pair_rows();
    let co = CoOccurrence::from_rows(rows.iter().copied());

    let table = co.contingency("RARE", "ODD").expect("table");
    assert_eq!((table.a, table.b, table.c, table.d), (1, 1, 1, 20));
    assert!((table.prr() - 20.0).abs() < 1e-9);

    let permissive = evaluate(&co, 1000, &relaxed(1));
    assert!(permissive
        .iter()
        .any(|s| s.drug == "RARE" && s.reaction == "ODD"));

    let strict = evaluate(&co, 1000, &relaxed(2));
    assert!(!strict.iter().any(|s| s.drug == "RARE"));
    assert!(strict.iter().all(|s| s.cases >= 2));
}

#[test]
fn emitted_signal_carries_statistics() {
    let rows = rare_pair_rows();
    let co = CoOccurrence::from_rows(rows.iter().copied());
    let found = evaluate(&co, 1000, &relaxed(2));

    assert_eq!(found.len(), 1);
    let signal = &found[0];
    assert_eq!(signal.drug, "IBUPROFEN");
    assert_eq!(signal.reaction, "HEADACHE");
    assert_eq!(signal.cases, 20);
    assert!((signal.prr - 20.0).abs() < 1e-9);
    assert!((signal.chi2 - 1000.0 * 361.0 / 1764.0).abs() < 1e-9);
    assert_eq!(signal.strength, SignalStrength::Strong);
    assert!((signal.ror - 20.0).abs() < 1e-9);
}

#[test]
fn thresholds_filter_weak_associations() {
    let rows = repeat(&[
        ("A", "X", 6),
        ("A", "Y", 4),
        ("B", "X", 4),
        ("B", "Y", 6),
    ]);
    let co = CoOccurrence::from_rows(rows.iter().copied());
    // a=6 b=4 c=4 d=6 -> PRR 2.25, chi2 = 20 * 400 / 10000 = 0.8
    let demo = evaluate(&co, 20, &SignalConfig::demo());
    assert!(demo.is_empty());

    let loose = SignalConfig {
        chi2_threshold: 0.5,
        ..SignalConfig::demo()
    };
    let found = evaluate(&co, 20, &loose);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|s| s.strength == SignalStrength::Moderate));
    assert!(found.iter().all(|s| (s.prr - 2.25).abs() < 1e-9));
    assert_eq!((found[0].drug.as_str(), found[0].reaction.as_str()), ("A", "X"));
    assert_eq!((found[1].drug.as_str(), found[1].reaction.as_str()), ("B", "Y"));
}

#[test]
fn scope_limits_evaluated_pairs() {
    let rows = rare_pair_rows();
    let co = CoOccurrence::from_rows(rows.iter().copied());
    assert_eq!(co.top_drugs(1), vec!["IBUPROFEN"]);
    assert_eq!(co.top_reactions(2), vec!["HEADACHE", "ODD"]);

    let narrow = SignalConfig {
        top_drug_count: 1,
        ..relaxed(1)
    };
    let found = evaluate(&co, 1000, &narrow);
    assert!(found.iter().all(|s| s.drug == "IBUPROFEN"));

    let none = SignalConfig {
        top_drug_count: 0,
        ..relaxed(1)
    };
    assert!(evaluate(&co, 1000, &none).is_empty());
}

#[test]
fn empty_overlap_returns_no_signals() {
    let store = RecordStore::new(
        vec![case("1")],
        vec![drug("1", "A", "PS")],
        vec![reaction("2", "X")],
        vec![],
    );
    assert!(signals::detect_signals(&store, &SignalConfig::demo()).is_empty());
    assert!(signals::detect_signals(&RecordStore::default(), &SignalConfig::standard()).is_empty());
}

fn signal(drug: &str, prr: f64, cases: u64) -> Signal {
    Signal {
        drug: drug.to_string(),
        reaction: "R".to_string(),
        prr,
        chi2: 10.0,
        cases,
        strength: SignalStrength::from_prr(prr),
        ror: prr,
        ror_ci_low: 1.0,
        ror_ci_high: prr * 2.0,
    }
}

#[test]
fn sort_orders_by_prr_then_cases() {
    let mut found = vec![
        signal("A", 3.0, 4),
        signal("B", 8.0, 2),
        signal("C", 3.0, 9),
        signal("D", 5.0, 1),
    ];
    sort_signals(&mut found);
    let order: Vec<&str> = found.iter().map(|s| s.drug.as_str()).collect();
    assert_eq!(order, vec!["B", "D", "C", "A"]);
    assert_eq!(found[1].strength, SignalStrength::Strong);
    assert_eq!(found[2].strength, SignalStrength::Moderate);
}

#[test]
fn top_reported_drugs_counts_primary_suspects() {
    let store = RecordStore::new(
        vec![],
        vec![
            drug("1", "B", "PS"),
            drug("2", "A", "PS"),
            drug("3", "A", "PS"),
            drug("4", "A", "SS"),
            drug("5", "C", "PS"),
        ],
        vec![],
        vec![],
    );
    let top = signals::top_reported_drugs(&store, 2);
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].drug.as_str(), top[0].reports), ("A", 2));
    assert_eq!((top[1].drug.as_str(), top[1].reports), ("B", 1));
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(
        (
            prop::sample::select(vec!["A", "B", "C", "D", "E"]),
            prop::sample::select(vec!["R1", "R2", "R3", "R4"]),
        )
            .prop_map(|(d, r)| (d.to_string(), r.to_string())),
        0..200,
    )
}

proptest! {
    #[test]
    fn contingency_cells_sum_to_row_total(rows in arb_rows()) {
        let co = CoOccurrence::from_rows(rows.iter().map(|(d, r)| (d.as_str(), r.as_str())));
        for drug in co.top_drugs(5) {
            for reaction in co.top_reactions(4) {
                if let Some(table) = co.contingency(drug, reaction) {
                    prop_assert_eq!(table.total(), co.total_rows());
                }
            }
        }
    }

    #[test]
    fn evaluation_is_order_independent(rows in arb_rows(), total_cases in 1u64..5000) {
        let config = relaxed(1);
        let forward = CoOccurrence::from_rows(rows.iter().map(|(d, r)| (d.as_str(), r.as_str())));
        let reversed =
            CoOccurrence::from_rows(rows.iter().rev().map(|(d, r)| (d.as_str(), r.as_str())));
        let first = evaluate(&forward, total_cases, &config);
        prop_assert_eq!(&first, &evaluate(&forward, total_cases, &config));
        prop_assert_eq!(&first, &evaluate(&reversed, total_cases, &config));
        for pair in first.windows(2) {
            prop_assert!(pair[0].prr >= pair[1].prr);
        }
        for s in &first {
            prop_assert!(s.cases >= config.min_cases);
            prop_assert_eq!(s.strength == SignalStrength::Strong, s.prr >= 5.0);
        }
    }
}

#[test]
fn case_versions_join_within_their_own_report() {
    let store = RecordStore::new(
        vec![],
        vec![
            DrugRecord {
                primary_id: version("11"),
                ..drug("1", "A", "PS")
            },
            DrugRecord {
                primary_id: version("12"),
                ..drug("1", "A", "PS")
            },
        ],
        vec![
            ReactionRecord {
                primary_id: version("11"),
                ..reaction("1", "X")
            },
            ReactionRecord {
                primary_id: version("12"),
                ..reaction("1", "X")
            },
        ],
        vec![],
    );
    let co = CoOccurrence::from_store(&store);
    assert_eq!(co.total_rows(), 2);
    assert_eq!(co.pair_count("A", "X"), 2);
    assert_eq!(co.drug_total("A"), 2);
}
