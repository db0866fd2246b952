use reimburse::dataset;
use reimburse::model::{
    round_cents, score_trip, AdjustmentRule, Comparison, Condition, EnsembleConfig,
    EnsembleMember, FeatureKey, ModelConfig, ModelConfigError, Preset, RuleEffect, Scorer,
    ScoringError, TripInput, MAX_REIMBURSEMENT, MIN_REIMBURSEMENT,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn trip(days: i64, miles: f64, receipts: f64) -> TripInput {
    TripInput::new(days, miles, receipts).expect("valid trip")
}

#[test]
fn every_preset_scores_fixture_cases_within_bounds() {
    let cases = dataset::load_cases(fixture("cases.json")).expect("fixture loads");
    assert_eq!(cases.len(), 8);

    for preset in Preset::all() {
        let scorer = Scorer::new(preset.config()).expect("preset is valid");
        for case in &cases {
            let input = case.input().expect("fixture inputs are valid");
            let amount = scorer.amount(&input).expect("fixture case scores");
            assert!(
                (MIN_REIMBURSEMENT..=MAX_REIMBURSEMENT).contains(&amount),
                "{} produced {amount} for {case:?}",
                preset.name()
            );
            assert_eq!(amount, round_cents(amount));
        }
    }
}

#[test]
fn json_and_csv_fixtures_describe_the_same_trips() {
    let json = dataset::load_labeled_cases(fixture("cases.json")).expect("json loads");
    let csv = dataset::load_labeled_cases(fixture("cases.csv")).expect("csv loads");
    let config = Preset::Base.config();

    for record in &csv {
        let twin = json
            .iter()
            .find(|candidate| {
                candidate.trip_duration_days == record.trip_duration_days
                    && candidate.miles_traveled == record.miles_traveled
                    && candidate.total_receipts_amount == record.total_receipts_amount
            })
            .expect("csv case also present in json");
        assert_eq!(twin.expected_output, record.expected_output);
        assert_eq!(
            score_trip(
                record.trip_duration_days,
                record.miles_traveled,
                record.total_receipts_amount,
                &config
            ),
            score_trip(
                twin.trip_duration_days,
                twin.miles_traveled,
                twin.total_receipts_amount,
                &config
            )
        );
    }
}

#[test]
fn ensemble_lies_between_its_members() {
    let members = vec![
        EnsembleMember {
            weight: 0.7,
            config: Preset::Base.config(),
        },
        EnsembleMember {
            weight: 0.3,
            config: Preset::Phase2.config(),
        },
    ];
    let ensemble = ModelConfig::Ensemble(EnsembleConfig::new(members).expect("weights sum to 1"));

    for (days, miles, receipts) in [(3, 150.0, 200.0), (1, 850.0, 300.49), (12, 200.0, 400.0)] {
        let base = score_trip(days, miles, receipts, &Preset::Base.config()).expect("scores");
        let phase2 = score_trip(days, miles, receipts, &Preset::Phase2.config()).expect("scores");
        let blended = score_trip(days, miles, receipts, &ensemble).expect("scores");

        let (low, high) = (base.min(phase2), base.max(phase2));
        assert!(
            blended >= low - 1e-9 && blended <= high + 1e-9,
            "{blended} outside [{low}, {high}]"
        );
    }
}

#[test]
fn ensemble_weights_must_sum_to_one() {
    let members = vec![
        EnsembleMember {
            weight: 0.6,
            config: Preset::Base.config(),
        },
        EnsembleMember {
            weight: 0.6,
            config: Preset::Enhanced.config(),
        },
    ];
    assert!(matches!(
        EnsembleConfig::new(members),
        Err(ModelConfigError::EnsembleWeightsSum { .. })
    ));
}

#[test]
fn additive_rule_only_touches_matching_trips() {
    let mut config = Preset::Enhanced.config();
    let plain = Scorer::new(config.clone()).expect("preset is valid");
    if let ModelConfig::Enhanced(params) = &mut config {
        params.rules.push(AdjustmentRule {
            name: "three day bonus".to_string(),
            conditions: vec![Condition::new(
                FeatureKey::TripDurationDays,
                Comparison::Eq,
                3.0,
            )],
            effect: RuleEffect::Add(25.0),
        });
    }
    let ruled = Scorer::new(config).expect("rule config is valid");

    let matching = trip(3, 93.0, 1.42);
    let before = plain.predict(&matching).expect("scores").trace.expect("trace");
    let after = ruled.predict(&matching).expect("scores").trace.expect("trace");
    assert!((after.additive_bonus - before.additive_bonus - 25.0).abs() < 1e-9);
    assert_eq!(after.after_patterns, before.after_patterns);

    let other = trip(4, 93.0, 1.42);
    assert_eq!(
        plain.predict(&other).expect("scores"),
        ruled.predict(&other).expect("scores")
    );
}

#[test]
fn malformed_inputs_are_rejected_per_field() {
    let config = Preset::Base.config();
    let cases = [
        (0, 10.0, 10.0, "trip_duration_days"),
        (2, -1.0, 10.0, "miles_traveled"),
        (2, 10.0, f64::NAN, "total_receipts_amount"),
        (2, f64::INFINITY, 10.0, "miles_traveled"),
    ];

    for (days, miles, receipts, expected_field) in cases {
        match score_trip(days, miles, receipts, &config) {
            Err(ScoringError::InvalidInput { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected invalid {expected_field}, got {other:?}"),
        }
    }
}

#[test]
fn durations_beyond_u32_still_score_within_bounds() {
    let days = i64::from(u32::MAX) * 2;
    for preset in Preset::all() {
        let amount = score_trip(days, 500.0, 800.0, &preset.config()).expect("positive duration");
        assert!((MIN_REIMBURSEMENT..=MAX_REIMBURSEMENT).contains(&amount));
    }
}
