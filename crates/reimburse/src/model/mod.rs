//! Deterministic reimbursement scoring.
//!
//! A trip flows through [`FeatureVector::compute`], [`Cluster::classify`] and
//! the variant-specific path of [`Scorer`]: tiered base amount, cluster
//! multiplier, threshold multipliers, pattern adjustments, the additive
//! rounding-bug bonus, interaction bonuses, and a final clamp to
//! `[50.00, 5000.00]`.

mod artifact;
mod cluster;
mod domain;
mod ensemble;
mod features;
mod params;
mod presets;
mod rules;
mod scorer;
mod tiers;

#[cfg(test)]
mod tests;

pub use artifact::{ArtifactError, ModelArtifact};
pub use cluster::{Cluster, ClusterScheme};
pub use domain::{ScoringError, TripInput, TripRecord};
pub use ensemble::{EnsembleConfig, EnsembleMember};
pub use features::{
    receipt_cents, EfficiencyBand, FeatureKey, FeatureVector, SpendingBand, ROUNDING_BUG_CENTS,
};
pub use params::{
    BaseParams, ClusterMultipliers, EnhancedParams, InteractionCoefficients, ModelConfig,
    ModelConfigError, PatternAdjustments, Phase2Bonuses, Phase2Params, RoundingBug,
    ThresholdEffects,
};
pub use presets::{Preset, UnknownPreset};
pub use rules::{AdjustmentRule, Comparison, Condition, RuleEffect};
pub use scorer::{
    round_cents, score_trip, Explanation, Prediction, ScoreTrace, Scorer, MAX_REIMBURSEMENT,
    MIN_REIMBURSEMENT,
};
pub use tiers::{progressive_total, MileageTiers, ReceiptTiers};

pub(crate) use scorer::predict_features;
