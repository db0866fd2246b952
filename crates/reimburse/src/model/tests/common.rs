use crate::model::{ModelConfig, Prediction, Preset, Scorer, TripInput};

pub(super) fn trip(days: i64, miles: f64, receipts: f64) -> TripInput {
    TripInput::new(days, miles, receipts).expect("valid trip")
}

pub(super) fn scorer(preset: Preset) -> Scorer {
    Scorer::new(preset.config()).expect("preset config is valid")
}

pub(super) fn predict(config: &ModelConfig, days: i64, miles: f64, receipts: f64) -> Prediction {
    Scorer::new(config.clone())
        .expect("config is valid")
        .predict(&trip(days, miles, receipts))
        .expect("trip scores")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
