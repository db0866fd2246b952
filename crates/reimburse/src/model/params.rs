use super::cluster::Cluster;
use super::ensemble::EnsembleConfig;
use super::rules::{AdjustmentRule, RuleEffect};
use super::tiers::{strictly_increasing, MileageTiers, ReceiptTiers};
use serde::{Deserialize, Serialize};

/// Per-cluster multipliers for the six base paths, with the vacation split
/// used by the long, high-spending cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMultipliers {
    pub base: [f64; Cluster::BASE_COUNT],
    pub vacation_bonus: f64,
    pub vacation_base: f64,
}

/// Conditional multipliers applied in a fixed order after the cluster step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEffects {
    pub five_day_multiplier: f64,
    pub receipt_threshold: f64,
    pub receipt_multiplier: f64,
    pub efficiency_threshold: f64,
    pub efficiency_multiplier: f64,
    pub miles_threshold: f64,
    pub miles_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionCoefficients {
    pub interaction_coeff: f64,
    pub log_bonus_coeff: f64,
}

/// Additive bonus for receipts whose cents hit a flagged ending.
///
/// `secondary_cents` pays half the base bonus and half the multiplier, and
/// only when the primary set did not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingBug {
    pub base_bonus: f64,
    pub multiplier: f64,
    pub primary_cents: Vec<u8>,
    #[serde(default)]
    pub secondary_cents: Vec<u8>,
}

/// Parameters of the original six-path model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseParams {
    pub base_per_diem: f64,
    pub mileage: MileageTiers,
    pub receipts: ReceiptTiers,
    pub clusters: ClusterMultipliers,
    pub thresholds: ThresholdEffects,
    pub interactions: InteractionCoefficients,
    pub rounding_bug: RoundingBug,
}

/// Multiplicative adjustments for trip shapes the thresholds miss.
///
/// The duration factors are exclusive (first match of one-day long distance,
/// one day, long trip); the rest stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternAdjustments {
    pub one_day_long_distance: f64,
    pub one_day: f64,
    pub long_trip: f64,
    pub long_trip_days: f64,
    pub extreme_efficiency: f64,
    pub extreme_spending: f64,
    pub short_high_expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedParams {
    pub base: BaseParams,
    pub extended_clusters: [f64; Cluster::EXTENDED_COUNT],
    pub patterns: PatternAdjustments,
    #[serde(default)]
    pub rules: Vec<AdjustmentRule>,
}

/// Additive bonuses layered on the enhanced model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase2Bonuses {
    pub duration_squared_coeff: f64,
    pub log_miles_coeff: f64,
    /// Receipts within this many dollars of the receipt threshold earn a
    /// share of `proximity_bonus` that shrinks linearly with distance.
    pub proximity_window: f64,
    pub proximity_bonus: f64,
    pub efficiency_ratio_coeff: f64,
    pub efficiency_ratio_cap: f64,
    pub pattern_match_coeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase2Params {
    pub enhanced: EnhancedParams,
    pub bonuses: Phase2Bonuses,
}

/// Complete parameter set for one scorer.
///
/// Each variant has its own explicit scoring path; nothing probes for
/// optional fields at scoring time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ModelConfig {
    Base(BaseParams),
    Enhanced(EnhancedParams),
    Phase2(Phase2Params),
    Ensemble(EnsembleConfig),
}

impl ModelConfig {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Base(_) => "base",
            Self::Enhanced(_) => "enhanced",
            Self::Phase2(_) => "phase2",
            Self::Ensemble(_) => "ensemble",
        }
    }

    pub fn base_params(&self) -> Option<&BaseParams> {
        match self {
            Self::Base(params) => Some(params),
            Self::Enhanced(params) => Some(&params.base),
            Self::Phase2(params) => Some(&params.enhanced.base),
            Self::Ensemble(_) => None,
        }
    }

    pub fn base_params_mut(&mut self) -> Option<&mut BaseParams> {
        match self {
            Self::Base(params) => Some(params),
            Self::Enhanced(params) => Some(&mut params.base),
            Self::Phase2(params) => Some(&mut params.enhanced.base),
            Self::Ensemble(_) => None,
        }
    }

    pub fn enhanced_params(&self) -> Option<&EnhancedParams> {
        match self {
            Self::Enhanced(params) => Some(params),
            Self::Phase2(params) => Some(&params.enhanced),
            Self::Base(_) | Self::Ensemble(_) => None,
        }
    }

    pub fn enhanced_params_mut(&mut self) -> Option<&mut EnhancedParams> {
        match self {
            Self::Enhanced(params) => Some(params),
            Self::Phase2(params) => Some(&mut params.enhanced),
            Self::Base(_) | Self::Ensemble(_) => None,
        }
    }

    pub fn phase2_bonuses(&self) -> Option<&Phase2Bonuses> {
        match self {
            Self::Phase2(params) => Some(&params.bonuses),
            _ => None,
        }
    }

    pub fn phase2_bonuses_mut(&mut self) -> Option<&mut Phase2Bonuses> {
        match self {
            Self::Phase2(params) => Some(&mut params.bonuses),
            _ => None,
        }
    }

    /// Checks tier monotonicity and parameter domains.
    pub fn validate(&self) -> Result<(), ModelConfigError> {
        match self {
            Self::Base(params) => params.validate(),
            Self::Enhanced(params) => params.validate(),
            Self::Phase2(params) => {
                params.enhanced.validate()?;
                params.bonuses.validate()
            }
            Self::Ensemble(ensemble) => ensemble.validate(),
        }
    }
}

impl BaseParams {
    fn validate(&self) -> Result<(), ModelConfigError> {
        if !strictly_increasing(&self.mileage.breakpoints) {
            return Err(ModelConfigError::NonIncreasingBreakpoints { schedule: "mileage" });
        }
        if !strictly_increasing(&self.receipts.breakpoints) {
            return Err(ModelConfigError::NonIncreasingBreakpoints { schedule: "receipts" });
        }

        non_negative("base_per_diem", self.base_per_diem)?;
        for (index, rate) in self.mileage.rates.iter().enumerate() {
            non_negative(&format!("mileage.rates[{index}]"), *rate)?;
        }
        for (index, rate) in self.receipts.rates.iter().enumerate() {
            non_negative(&format!("receipts.rates[{index}]"), *rate)?;
        }

        for (index, multiplier) in self.clusters.base.iter().enumerate() {
            positive(&format!("clusters.base[{index}]"), *multiplier)?;
        }
        positive("clusters.vacation_bonus", self.clusters.vacation_bonus)?;
        positive("clusters.vacation_base", self.clusters.vacation_base)?;

        let thresholds = &self.thresholds;
        positive("thresholds.five_day_multiplier", thresholds.five_day_multiplier)?;
        non_negative("thresholds.receipt_threshold", thresholds.receipt_threshold)?;
        positive("thresholds.receipt_multiplier", thresholds.receipt_multiplier)?;
        non_negative("thresholds.efficiency_threshold", thresholds.efficiency_threshold)?;
        positive("thresholds.efficiency_multiplier", thresholds.efficiency_multiplier)?;
        non_negative("thresholds.miles_threshold", thresholds.miles_threshold)?;
        positive("thresholds.miles_multiplier", thresholds.miles_multiplier)?;

        finite("interactions.interaction_coeff", self.interactions.interaction_coeff)?;
        finite("interactions.log_bonus_coeff", self.interactions.log_bonus_coeff)?;

        let bug = &self.rounding_bug;
        finite("rounding_bug.base_bonus", bug.base_bonus)?;
        finite("rounding_bug.multiplier", bug.multiplier)?;
        if let Some(cents) = bug
            .primary_cents
            .iter()
            .chain(bug.secondary_cents.iter())
            .find(|cents| **cents > 99)
        {
            return Err(ModelConfigError::InvalidCents { cents: *cents });
        }

        Ok(())
    }
}

impl EnhancedParams {
    fn validate(&self) -> Result<(), ModelConfigError> {
        self.base.validate()?;

        for (index, multiplier) in self.extended_clusters.iter().enumerate() {
            positive(&format!("extended_clusters[{index}]"), *multiplier)?;
        }

        let patterns = &self.patterns;
        positive("patterns.one_day_long_distance", patterns.one_day_long_distance)?;
        positive("patterns.one_day", patterns.one_day)?;
        positive("patterns.long_trip", patterns.long_trip)?;
        positive("patterns.long_trip_days", patterns.long_trip_days)?;
        positive("patterns.extreme_efficiency", patterns.extreme_efficiency)?;
        positive("patterns.extreme_spending", patterns.extreme_spending)?;
        positive("patterns.short_high_expense", patterns.short_high_expense)?;

        for rule in &self.rules {
            if rule.conditions.is_empty() {
                return Err(ModelConfigError::EmptyRule {
                    rule: rule.name.clone(),
                });
            }
            if rule.conditions.iter().any(|condition| !condition.value.is_finite()) {
                return Err(ModelConfigError::NonFinite {
                    parameter: format!("rules[{}].conditions", rule.name),
                });
            }
            match rule.effect {
                RuleEffect::Multiply(factor) => positive(&format!("rules[{}]", rule.name), factor)?,
                RuleEffect::Add(bonus) => finite(&format!("rules[{}]", rule.name), bonus)?,
            }
        }

        Ok(())
    }
}

impl Phase2Bonuses {
    fn validate(&self) -> Result<(), ModelConfigError> {
        finite("bonuses.duration_squared_coeff", self.duration_squared_coeff)?;
        finite("bonuses.log_miles_coeff", self.log_miles_coeff)?;
        non_negative("bonuses.proximity_window", self.proximity_window)?;
        finite("bonuses.proximity_bonus", self.proximity_bonus)?;
        finite("bonuses.efficiency_ratio_coeff", self.efficiency_ratio_coeff)?;
        non_negative("bonuses.efficiency_ratio_cap", self.efficiency_ratio_cap)?;
        finite("bonuses.pattern_match_coeff", self.pattern_match_coeff)
    }
}

fn finite(parameter: &str, value: f64) -> Result<(), ModelConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelConfigError::NonFinite {
            parameter: parameter.to_string(),
        })
    }
}

fn non_negative(parameter: &str, value: f64) -> Result<(), ModelConfigError> {
    finite(parameter, value)?;
    if value < 0.0 {
        return Err(ModelConfigError::OutOfDomain {
            parameter: parameter.to_string(),
            value,
            expected: "a non-negative value",
        });
    }
    Ok(())
}

fn positive(parameter: &str, value: f64) -> Result<(), ModelConfigError> {
    finite(parameter, value)?;
    if value <= 0.0 {
        return Err(ModelConfigError::OutOfDomain {
            parameter: parameter.to_string(),
            value,
            expected: "a positive value",
        });
    }
    Ok(())
}

/// A configuration the scorer must not run with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelConfigError {
    #[error("{schedule} tier breakpoints must be positive and strictly increasing")]
    NonIncreasingBreakpoints { schedule: &'static str },
    #[error("{parameter} must be finite")]
    NonFinite { parameter: String },
    #[error("{parameter} = {value} is out of domain, expected {expected}")]
    OutOfDomain {
        parameter: String,
        value: f64,
        expected: &'static str,
    },
    #[error("rounding-bug cents ending {cents} is not in 0..=99")]
    InvalidCents { cents: u8 },
    #[error("adjustment rule '{rule}' has no conditions")]
    EmptyRule { rule: String },
    #[error("{variant} configuration has no parameter {parameter}")]
    MissingParameter {
        parameter: String,
        variant: &'static str,
    },
    #[error("ensemble needs at least one member")]
    EmptyEnsemble,
    #[error("ensemble member {index} cannot itself be an ensemble")]
    NestedEnsemble { index: usize },
    #[error("ensemble weight {weight} at member {index} must be finite and non-negative")]
    InvalidEnsembleWeight { index: usize, weight: f64 },
    #[error("ensemble weights sum to {sum}, expected 1")]
    EnsembleWeightsSum { sum: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::presets::Preset;

    #[test]
    fn every_preset_validates() {
        for preset in Preset::all() {
            preset
                .config()
                .validate()
                .unwrap_or_else(|err| panic!("{preset} preset invalid: {err}"));
        }
    }

    #[test]
    fn rejects_non_increasing_mileage_breakpoints() {
        let mut config = Preset::Base.config();
        if let Some(params) = config.base_params_mut() {
            params.mileage.breakpoints = [500.0, 100.0];
        }
        assert_eq!(
            config.validate(),
            Err(ModelConfigError::NonIncreasingBreakpoints { schedule: "mileage" })
        );
    }

    #[test]
    fn rejects_equal_receipt_breakpoints() {
        let mut config = Preset::Enhanced.config();
        if let Some(params) = config.base_params_mut() {
            params.receipts.breakpoints = [50.0, 500.0, 500.0];
        }
        assert_eq!(
            config.validate(),
            Err(ModelConfigError::NonIncreasingBreakpoints { schedule: "receipts" })
        );
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        let mut config = Preset::Base.config();
        if let Some(params) = config.base_params_mut() {
            params.clusters.base[2] = 0.0;
        }
        match config.validate() {
            Err(ModelConfigError::OutOfDomain { parameter, .. }) => {
                assert_eq!(parameter, "clusters.base[2]")
            }
            other => panic!("expected out-of-domain multiplier, got {other:?}"),
        }
    }

    #[test]
    fn rejects_cents_outside_range() {
        let mut config = Preset::Base.config();
        if let Some(params) = config.base_params_mut() {
            params.rounding_bug.primary_cents.push(149);
        }
        assert_eq!(
            config.validate(),
            Err(ModelConfigError::InvalidCents { cents: 149 })
        );
    }

    #[test]
    fn rejects_nan_bonus() {
        let mut config = Preset::Phase2.config();
        if let Some(bonuses) = config.phase2_bonuses_mut() {
            bonuses.pattern_match_coeff = f64::NAN;
        }
        assert!(matches!(
            config.validate(),
            Err(ModelConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn serializes_with_variant_tag() {
        let json = serde_json::to_value(Preset::Enhanced.config()).expect("config serializes");
        assert_eq!(json["variant"], "enhanced");
        assert!(json["base"]["mileage"]["breakpoints"].is_array());

        let parsed: ModelConfig = serde_json::from_value(json).expect("config parses");
        assert_eq!(parsed, Preset::Enhanced.config());
    }
}
