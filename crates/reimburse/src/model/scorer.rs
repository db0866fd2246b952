use super::cluster::{Cluster, ClusterScheme};
use super::domain::{ScoringError, TripInput, TripRecord};
use super::features::FeatureVector;
use super::params::{
    BaseParams, EnhancedParams, InteractionCoefficients, ModelConfig, ModelConfigError,
    PatternAdjustments, Phase2Bonuses, Phase2Params, RoundingBug, ThresholdEffects,
};
use super::rules;
use serde::Serialize;

pub const MIN_REIMBURSEMENT: f64 = 50.0;
pub const MAX_REIMBURSEMENT: f64 = 5000.0;

/// Running amount after each stage of a single-model score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreTrace {
    pub cluster: Cluster,
    pub base_amount: f64,
    pub after_cluster: f64,
    pub after_thresholds: f64,
    pub after_patterns: f64,
    pub rounding_bonus: f64,
    pub additive_bonus: f64,
}

impl ScoreTrace {
    pub fn unclamped(&self) -> f64 {
        self.after_patterns + self.rounding_bonus + self.additive_bonus
    }
}

/// Final amount for one trip. Ensembles carry no trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ScoreTrace>,
}

/// A prediction with the features it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Explanation {
    pub features: FeatureVector,
    pub prediction: Prediction,
}

/// Scores trips with one validated configuration.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ModelConfig,
}

impl Scorer {
    pub fn new(config: ModelConfig) -> Result<Self, ModelConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn into_config(self) -> ModelConfig {
        self.config
    }

    pub fn predict(&self, input: &TripInput) -> Result<Prediction, ScoringError> {
        let features = FeatureVector::compute(input);
        predict_features(&self.config, &features)
    }

    pub fn explain(&self, input: &TripInput) -> Result<Explanation, ScoringError> {
        let features = FeatureVector::compute(input);
        let prediction = predict_features(&self.config, &features)?;
        Ok(Explanation {
            features,
            prediction,
        })
    }

    pub fn predict_record(&self, record: &TripRecord) -> Result<Prediction, ScoringError> {
        self.predict(&record.input()?)
    }

    pub fn amount(&self, input: &TripInput) -> Result<f64, ScoringError> {
        self.predict(input).map(|prediction| prediction.amount)
    }
}

/// One-shot scoring from raw values.
pub fn score_trip(
    days: i64,
    miles: f64,
    receipts: f64,
    config: &ModelConfig,
) -> Result<f64, ScoringError> {
    let input = TripInput::new(days, miles, receipts)?;
    let features = FeatureVector::compute(&input);
    predict_features(config, &features).map(|prediction| prediction.amount)
}

pub(crate) fn predict_features(
    config: &ModelConfig,
    features: &FeatureVector,
) -> Result<Prediction, ScoringError> {
    let trace = match config {
        ModelConfig::Base(params) => base_path(params, features),
        ModelConfig::Enhanced(params) => enhanced_path(params, features),
        ModelConfig::Phase2(params) => phase2_path(params, features),
        ModelConfig::Ensemble(ensemble) => {
            let mut blended = 0.0;
            for member in &ensemble.members {
                let prediction = predict_features(&member.config, features)?;
                blended += member.weight * prediction.amount;
            }
            return finalize(blended, None);
        }
    };

    if !trace.base_amount.is_finite() {
        return Err(ScoringError::Computation {
            stage: "base amount",
        });
    }
    if !trace.after_patterns.is_finite() {
        return Err(ScoringError::Computation {
            stage: "multiplicative adjustments",
        });
    }
    finalize(trace.unclamped(), Some(trace))
}

fn finalize(amount: f64, trace: Option<ScoreTrace>) -> Result<Prediction, ScoringError> {
    if !amount.is_finite() {
        return Err(ScoringError::Computation {
            stage: "additive bonuses",
        });
    }
    let clamped = amount.clamp(MIN_REIMBURSEMENT, MAX_REIMBURSEMENT);
    Ok(Prediction {
        amount: round_cents(clamped),
        trace,
    })
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn base_path(params: &BaseParams, features: &FeatureVector) -> ScoreTrace {
    let cluster = Cluster::classify(features, ClusterScheme::Base);
    let base_amount = base_amount(params, features);
    let after_cluster = base_amount * cluster_multiplier(params, None, cluster, features);
    let after_thresholds = apply_thresholds(&params.thresholds, features, after_cluster);

    ScoreTrace {
        cluster,
        base_amount,
        after_cluster,
        after_thresholds,
        after_patterns: after_thresholds,
        rounding_bonus: rounding_bonus(&params.rounding_bug, features, after_thresholds),
        additive_bonus: interaction_bonus(&params.interactions, features),
    }
}

fn enhanced_path(params: &EnhancedParams, features: &FeatureVector) -> ScoreTrace {
    let base = &params.base;
    let cluster = Cluster::classify(features, ClusterScheme::Extended);
    let base_amount = base_amount(base, features);
    let multiplier = cluster_multiplier(base, Some(&params.extended_clusters), cluster, features);
    let after_cluster = base_amount * multiplier;
    let after_thresholds = apply_thresholds(&base.thresholds, features, after_cluster);
    let after_patterns = apply_patterns(&params.patterns, features, after_thresholds);
    let after_patterns = rules::apply_multipliers(&params.rules, features, after_patterns);

    ScoreTrace {
        cluster,
        base_amount,
        after_cluster,
        after_thresholds,
        after_patterns,
        rounding_bonus: rounding_bonus(&base.rounding_bug, features, after_patterns),
        additive_bonus: interaction_bonus(&base.interactions, features)
            + rules::additive_total(&params.rules, features),
    }
}

fn phase2_path(params: &Phase2Params, features: &FeatureVector) -> ScoreTrace {
    let mut trace = enhanced_path(&params.enhanced, features);
    trace.additive_bonus += phase2_bonus(
        &params.bonuses,
        &params.enhanced.base.thresholds,
        features,
    );
    trace
}

fn base_amount(params: &BaseParams, features: &FeatureVector) -> f64 {
    params.base_per_diem * features.trip_duration_days
        + params.mileage.reimbursement(features.miles_traveled)
        + params.receipts.reimbursement(features.total_receipts_amount)
}

fn cluster_multiplier(
    params: &BaseParams,
    extended: Option<&[f64; Cluster::EXTENDED_COUNT]>,
    cluster: Cluster,
    features: &FeatureVector,
) -> f64 {
    let index = cluster.index();
    match cluster {
        Cluster::LongHighSpending if features.vacation_penalty => params.clusters.vacation_bonus,
        Cluster::LongHighSpending => params.clusters.vacation_base,
        _ if index < Cluster::BASE_COUNT => params.clusters.base[index],
        _ => extended
            .and_then(|multipliers| multipliers.get(index - Cluster::BASE_COUNT))
            .copied()
            .unwrap_or(1.0),
    }
}

fn apply_thresholds(thresholds: &ThresholdEffects, features: &FeatureVector, amount: f64) -> f64 {
    let mut amount = amount;
    if features.is_5_day_trip {
        amount *= thresholds.five_day_multiplier;
    }
    if features.total_receipts_amount > thresholds.receipt_threshold {
        amount *= thresholds.receipt_multiplier;
    }
    if features.miles_per_day > thresholds.efficiency_threshold {
        amount *= thresholds.efficiency_multiplier;
    }
    if features.miles_traveled > thresholds.miles_threshold {
        amount *= thresholds.miles_multiplier;
    }
    amount
}

fn apply_patterns(patterns: &PatternAdjustments, features: &FeatureVector, amount: f64) -> f64 {
    let mut amount = amount;

    if features.one_day_long_distance {
        amount *= patterns.one_day_long_distance;
    } else if features.very_short_trip {
        amount *= patterns.one_day;
    } else if features.trip_duration_days >= patterns.long_trip_days {
        amount *= patterns.long_trip;
    }

    if features.extreme_efficiency {
        amount *= patterns.extreme_efficiency;
    }
    if features.extreme_spending {
        amount *= patterns.extreme_spending;
    }
    if features.short_high_expense {
        amount *= patterns.short_high_expense;
    }
    amount
}

fn rounding_bonus(bug: &RoundingBug, features: &FeatureVector, amount: f64) -> f64 {
    let cents = features.receipt_cents;
    if bug.primary_cents.contains(&cents) {
        bug.base_bonus + amount * bug.multiplier
    } else if bug.secondary_cents.contains(&cents) {
        bug.base_bonus / 2.0 + amount * (bug.multiplier / 2.0)
    } else {
        0.0
    }
}

fn interaction_bonus(coefficients: &InteractionCoefficients, features: &FeatureVector) -> f64 {
    features.duration_spending_interaction * coefficients.interaction_coeff
        + features.log_receipts * coefficients.log_bonus_coeff
}

fn phase2_bonus(
    bonuses: &Phase2Bonuses,
    thresholds: &ThresholdEffects,
    features: &FeatureVector,
) -> f64 {
    let polynomial = features.duration_squared * bonuses.duration_squared_coeff
        + features.log_miles * bonuses.log_miles_coeff;

    let distance = (features.total_receipts_amount - thresholds.receipt_threshold).abs();
    let proximity = if bonuses.proximity_window > 0.0 && distance <= bonuses.proximity_window {
        bonuses.proximity_bonus * (1.0 - distance / bonuses.proximity_window)
    } else {
        0.0
    };

    let efficiency = features.total_efficiency.min(bonuses.efficiency_ratio_cap)
        * bonuses.efficiency_ratio_coeff;
    let pattern = f64::from(features.ideal_pattern_count()) * bonuses.pattern_match_coeff;

    polynomial + proximity + efficiency + pattern
}
