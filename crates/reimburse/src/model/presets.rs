//! Named parameter sets.
//!
//! The base constants come from a regression fit against the historical
//! cases. The other presets are hand-tuned starting points for the
//! optimizer; in particular the edge-case rule factors were picked from a
//! handful of worst-case errors and are only illustrative defaults.

use super::cluster::Cluster;
use super::ensemble::{EnsembleConfig, EnsembleMember};
use super::features::FeatureKey;
use super::params::{
    BaseParams, ClusterMultipliers, EnhancedParams, InteractionCoefficients, ModelConfig,
    PatternAdjustments, Phase2Bonuses, Phase2Params, RoundingBug, ThresholdEffects,
};
use super::rules::{AdjustmentRule, Comparison, Condition, RuleEffect};
use super::tiers::{MileageTiers, ReceiptTiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Base,
    Conservative,
    Enhanced,
    Phase2,
    EdgeCase,
    Ensemble,
}

impl Preset {
    pub const fn all() -> [Self; 6] {
        [
            Self::Base,
            Self::Conservative,
            Self::Enhanced,
            Self::Phase2,
            Self::EdgeCase,
            Self::Ensemble,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Conservative => "conservative",
            Self::Enhanced => "enhanced",
            Self::Phase2 => "phase2",
            Self::EdgeCase => "edge_case",
            Self::Ensemble => "ensemble",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Base => "six calculation paths with regression-fitted constants",
            Self::Conservative => "base paths with every multiplier pulled halfway to 1.0",
            Self::Enhanced => "extended clusters plus pattern-specific adjustments",
            Self::Phase2 => "enhanced model with polynomial, proximity and pattern bonuses",
            Self::EdgeCase => "enhanced model with dampening rules for known outliers",
            Self::Ensemble => "0.5 base, 0.2 enhanced, 0.2 phase2, 0.1 conservative blend",
        }
    }

    pub fn config(self) -> ModelConfig {
        match self {
            Self::Base => ModelConfig::Base(base_params()),
            Self::Conservative => ModelConfig::Base(conservative_params()),
            Self::Enhanced => ModelConfig::Enhanced(enhanced_params()),
            Self::Phase2 => ModelConfig::Phase2(Phase2Params {
                enhanced: enhanced_params(),
                bonuses: phase2_bonuses(),
            }),
            Self::EdgeCase => {
                let mut params = enhanced_params();
                params.rules = edge_case_rules();
                ModelConfig::Enhanced(params)
            }
            Self::Ensemble => ModelConfig::Ensemble(EnsembleConfig {
                members: vec![
                    EnsembleMember {
                        weight: 0.5,
                        config: Self::Base.config(),
                    },
                    EnsembleMember {
                        weight: 0.2,
                        config: Self::Enhanced.config(),
                    },
                    EnsembleMember {
                        weight: 0.2,
                        config: Self::Phase2.config(),
                    },
                    EnsembleMember {
                        weight: 0.1,
                        config: Self::Conservative.config(),
                    },
                ],
            }),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset '{0}', expected one of base, conservative, enhanced, phase2, edge_case, ensemble")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .into_iter()
            .find(|preset| preset.name() == normalized)
            .ok_or_else(|| UnknownPreset(value.to_string()))
    }
}

fn base_params() -> BaseParams {
    BaseParams {
        base_per_diem: 45.5195880490612,
        mileage: MileageTiers {
            breakpoints: [100.0, 500.0],
            rates: [0.787071175593883, 0.45114227601327, 0.200831651920261],
        },
        receipts: ReceiptTiers {
            breakpoints: [50.0, 500.0, 1500.0],
            rates: [
                0.399975746217208,
                0.3045420665708,
                0.436856841815577,
                0.121882355942393,
            ],
        },
        clusters: ClusterMultipliers {
            base: [
                1.14756663634639,
                1.11176444876928,
                1.20275399349877,
                1.19116480573546,
                1.07688362098627,
                1.2140054738624,
            ],
            vacation_bonus: 1.04678047616035,
            vacation_base: 1.07234985943884,
        },
        thresholds: ThresholdEffects {
            five_day_multiplier: 1.08250167328268,
            receipt_threshold: 660.54,
            receipt_multiplier: 1.19666525936238,
            efficiency_threshold: 187.01,
            efficiency_multiplier: 1.01898035206799,
            miles_threshold: 473.8,
            miles_multiplier: 1.02133465968143,
        },
        interactions: InteractionCoefficients {
            interaction_coeff: 0.000555204802994334,
            log_bonus_coeff: 5.12776389976777,
        },
        rounding_bug: RoundingBug {
            base_bonus: 20.6993690179661,
            multiplier: 0.00616844543255866,
            primary_cents: vec![49, 99],
            secondary_cents: Vec::new(),
        },
    }
}

fn halfway_to_one(value: f64) -> f64 {
    1.0 + (value - 1.0) / 2.0
}

fn conservative_params() -> BaseParams {
    let mut params = base_params();

    for multiplier in params.clusters.base.iter_mut() {
        *multiplier = halfway_to_one(*multiplier);
    }
    params.clusters.vacation_bonus = halfway_to_one(params.clusters.vacation_bonus);
    params.clusters.vacation_base = halfway_to_one(params.clusters.vacation_base);

    let thresholds = &mut params.thresholds;
    thresholds.five_day_multiplier = halfway_to_one(thresholds.five_day_multiplier);
    thresholds.receipt_multiplier = halfway_to_one(thresholds.receipt_multiplier);
    thresholds.efficiency_multiplier = halfway_to_one(thresholds.efficiency_multiplier);
    thresholds.miles_multiplier = halfway_to_one(thresholds.miles_multiplier);

    params.rounding_bug.base_bonus /= 2.0;
    params.rounding_bug.multiplier /= 2.0;
    params
}

fn enhanced_params() -> EnhancedParams {
    let mut base = base_params();
    base.rounding_bug.secondary_cents = vec![1, 49, 51, 99];

    EnhancedParams {
        base,
        extended_clusters: extended_cluster_multipliers(),
        patterns: PatternAdjustments {
            one_day_long_distance: 0.90,
            one_day: 0.95,
            long_trip: 0.97,
            long_trip_days: 12.0,
            extreme_efficiency: 0.96,
            extreme_spending: 0.93,
            short_high_expense: 0.92,
        },
        rules: Vec::new(),
    }
}

fn extended_cluster_multipliers() -> [f64; Cluster::EXTENDED_COUNT] {
    // Order follows Cluster::index() for labels 6..=10.
    [1.05, 1.08, 1.10, 1.12, 1.06]
}

fn phase2_bonuses() -> Phase2Bonuses {
    Phase2Bonuses {
        duration_squared_coeff: 0.05,
        log_miles_coeff: 1.5,
        proximity_window: 40.0,
        proximity_bonus: 12.0,
        efficiency_ratio_coeff: 2.0,
        efficiency_ratio_cap: 10.0,
        pattern_match_coeff: 8.0,
    }
}

fn edge_case_rules() -> Vec<AdjustmentRule> {
    vec![
        AdjustmentRule {
            name: "long stay with heavy receipts and little driving".to_string(),
            conditions: vec![
                Condition::new(FeatureKey::TripDurationDays, Comparison::Ge, 10.0),
                Condition::new(FeatureKey::MilesPerDay, Comparison::Lt, 30.0),
                Condition::new(FeatureKey::TotalReceiptsAmount, Comparison::Gt, 2000.0),
            ],
            effect: RuleEffect::Multiply(0.75),
        },
        AdjustmentRule {
            name: "one day with extreme receipts".to_string(),
            conditions: vec![
                Condition::new(FeatureKey::TripDurationDays, Comparison::Eq, 1.0),
                Condition::new(FeatureKey::TotalReceiptsAmount, Comparison::Gt, 1800.0),
            ],
            effect: RuleEffect::Multiply(0.65),
        },
        AdjustmentRule {
            name: "short local trip with high receipts".to_string(),
            conditions: vec![
                Condition::new(FeatureKey::TripDurationDays, Comparison::Le, 3.0),
                Condition::new(FeatureKey::MilesTraveled, Comparison::Lt, 100.0),
                Condition::new(FeatureKey::TotalReceiptsAmount, Comparison::Gt, 1500.0),
            ],
            effect: RuleEffect::Multiply(0.70),
        },
    ]
}
