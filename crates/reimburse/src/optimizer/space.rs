use super::OptimizerError;
use crate::model::{BaseParams, EnhancedParams, ModelConfig, ModelConfigError, Phase2Bonuses};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of coordinate search; later stages start from the winners of
/// earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Thresholds,
    TierBoundaries,
    Rates,
    Multipliers,
    Interactions,
}

impl SearchPhase {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Thresholds,
            Self::TierBoundaries,
            Self::Rates,
            Self::Multipliers,
            Self::Interactions,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Thresholds => "thresholds",
            Self::TierBoundaries => "tier boundaries",
            Self::Rates => "rates",
            Self::Multipliers => "multipliers",
            Self::Interactions => "interactions",
        }
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of one tunable scalar inside a [`ModelConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    BasePerDiem,
    MileageBreakpoint(usize),
    MileageRate(usize),
    ReceiptBreakpoint(usize),
    ReceiptRate(usize),
    ClusterMultiplier(usize),
    VacationBonus,
    VacationBase,
    FiveDayMultiplier,
    ReceiptThreshold,
    ReceiptMultiplier,
    EfficiencyThreshold,
    EfficiencyMultiplier,
    MilesThreshold,
    MilesMultiplier,
    InteractionCoeff,
    LogBonusCoeff,
    RoundingBugBonus,
    RoundingBugMultiplier,
    ExtendedClusterMultiplier(usize),
    OneDayLongDistanceFactor,
    OneDayFactor,
    LongTripFactor,
    ExtremeEfficiencyFactor,
    ExtremeSpendingFactor,
    ShortHighExpenseFactor,
    DurationSquaredCoeff,
    LogMilesCoeff,
    ProximityBonus,
    EfficiencyRatioCoeff,
    PatternMatchCoeff,
}

impl ParamKey {
    pub fn phase(self) -> SearchPhase {
        match self {
            Self::ReceiptThreshold | Self::EfficiencyThreshold | Self::MilesThreshold => {
                SearchPhase::Thresholds
            }
            Self::MileageBreakpoint(_) | Self::ReceiptBreakpoint(_) => SearchPhase::TierBoundaries,
            Self::BasePerDiem | Self::MileageRate(_) | Self::ReceiptRate(_) => SearchPhase::Rates,
            Self::ClusterMultiplier(_)
            | Self::VacationBonus
            | Self::VacationBase
            | Self::FiveDayMultiplier
            | Self::ReceiptMultiplier
            | Self::EfficiencyMultiplier
            | Self::MilesMultiplier
            | Self::ExtendedClusterMultiplier(_)
            | Self::OneDayLongDistanceFactor
            | Self::OneDayFactor
            | Self::LongTripFactor
            | Self::ExtremeEfficiencyFactor
            | Self::ExtremeSpendingFactor
            | Self::ShortHighExpenseFactor => SearchPhase::Multipliers,
            Self::InteractionCoeff
            | Self::LogBonusCoeff
            | Self::RoundingBugBonus
            | Self::RoundingBugMultiplier
            | Self::DurationSquaredCoeff
            | Self::LogMilesCoeff
            | Self::ProximityBonus
            | Self::EfficiencyRatioCoeff
            | Self::PatternMatchCoeff => SearchPhase::Interactions,
        }
    }

    /// Current value, or `None` when the variant has no such parameter.
    pub fn get(self, config: &ModelConfig) -> Option<f64> {
        match config {
            ModelConfig::Base(params) => self.base_value(params),
            ModelConfig::Enhanced(params) => self.enhanced_value(params),
            ModelConfig::Phase2(params) => self
                .bonus_value(&params.bonuses)
                .or_else(|| self.enhanced_value(&params.enhanced)),
            ModelConfig::Ensemble(_) => None,
        }
    }

    pub fn set(self, config: &mut ModelConfig, value: f64) -> Result<(), ModelConfigError> {
        let variant = config.variant_name();
        match self.slot(config) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ModelConfigError::MissingParameter {
                parameter: self.to_string(),
                variant,
            }),
        }
    }

    fn slot(self, config: &mut ModelConfig) -> Option<&mut f64> {
        match config {
            ModelConfig::Base(params) => self.base_slot(params),
            ModelConfig::Enhanced(params) => self.enhanced_slot(params),
            ModelConfig::Phase2(params) => self
                .bonus_slot(&mut params.bonuses)
                .or_else(|| self.enhanced_slot(&mut params.enhanced)),
            ModelConfig::Ensemble(_) => None,
        }
    }

    fn base_slot(self, params: &mut BaseParams) -> Option<&mut f64> {
        match self {
            Self::BasePerDiem => Some(&mut params.base_per_diem),
            Self::MileageBreakpoint(index) => params.mileage.breakpoints.get_mut(index),
            Self::MileageRate(index) => params.mileage.rates.get_mut(index),
            Self::ReceiptBreakpoint(index) => params.receipts.breakpoints.get_mut(index),
            Self::ReceiptRate(index) => params.receipts.rates.get_mut(index),
            Self::ClusterMultiplier(index) => params.clusters.base.get_mut(index),
            Self::VacationBonus => Some(&mut params.clusters.vacation_bonus),
            Self::VacationBase => Some(&mut params.clusters.vacation_base),
            Self::FiveDayMultiplier => Some(&mut params.thresholds.five_day_multiplier),
            Self::ReceiptThreshold => Some(&mut params.thresholds.receipt_threshold),
            Self::ReceiptMultiplier => Some(&mut params.thresholds.receipt_multiplier),
            Self::EfficiencyThreshold => Some(&mut params.thresholds.efficiency_threshold),
            Self::EfficiencyMultiplier => Some(&mut params.thresholds.efficiency_multiplier),
            Self::MilesThreshold => Some(&mut params.thresholds.miles_threshold),
            Self::MilesMultiplier => Some(&mut params.thresholds.miles_multiplier),
            Self::InteractionCoeff => Some(&mut params.interactions.interaction_coeff),
            Self::LogBonusCoeff => Some(&mut params.interactions.log_bonus_coeff),
            Self::RoundingBugBonus => Some(&mut params.rounding_bug.base_bonus),
            Self::RoundingBugMultiplier => Some(&mut params.rounding_bug.multiplier),
            _ => None,
        }
    }

    fn enhanced_slot(self, params: &mut EnhancedParams) -> Option<&mut f64> {
        match self {
            Self::ExtendedClusterMultiplier(index) => params.extended_clusters.get_mut(index),
            Self::OneDayLongDistanceFactor => Some(&mut params.patterns.one_day_long_distance),
            Self::OneDayFactor => Some(&mut params.patterns.one_day),
            Self::LongTripFactor => Some(&mut params.patterns.long_trip),
            Self::ExtremeEfficiencyFactor => Some(&mut params.patterns.extreme_efficiency),
            Self::ExtremeSpendingFactor => Some(&mut params.patterns.extreme_spending),
            Self::ShortHighExpenseFactor => Some(&mut params.patterns.short_high_expense),
            _ => self.base_slot(&mut params.base),
        }
    }

    fn bonus_slot(self, bonuses: &mut Phase2Bonuses) -> Option<&mut f64> {
        match self {
            Self::DurationSquaredCoeff => Some(&mut bonuses.duration_squared_coeff),
            Self::LogMilesCoeff => Some(&mut bonuses.log_miles_coeff),
            Self::ProximityBonus => Some(&mut bonuses.proximity_bonus),
            Self::EfficiencyRatioCoeff => Some(&mut bonuses.efficiency_ratio_coeff),
            Self::PatternMatchCoeff => Some(&mut bonuses.pattern_match_coeff),
            _ => None,
        }
    }

    fn base_value(self, params: &BaseParams) -> Option<f64> {
        match self {
            Self::BasePerDiem => Some(params.base_per_diem),
            Self::MileageBreakpoint(index) => params.mileage.breakpoints.get(index).copied(),
            Self::MileageRate(index) => params.mileage.rates.get(index).copied(),
            Self::ReceiptBreakpoint(index) => params.receipts.breakpoints.get(index).copied(),
            Self::ReceiptRate(index) => params.receipts.rates.get(index).copied(),
            Self::ClusterMultiplier(index) => params.clusters.base.get(index).copied(),
            Self::VacationBonus => Some(params.clusters.vacation_bonus),
            Self::VacationBase => Some(params.clusters.vacation_base),
            Self::FiveDayMultiplier => Some(params.thresholds.five_day_multiplier),
            Self::ReceiptThreshold => Some(params.thresholds.receipt_threshold),
            Self::ReceiptMultiplier => Some(params.thresholds.receipt_multiplier),
            Self::EfficiencyThreshold => Some(params.thresholds.efficiency_threshold),
            Self::EfficiencyMultiplier => Some(params.thresholds.efficiency_multiplier),
            Self::MilesThreshold => Some(params.thresholds.miles_threshold),
            Self::MilesMultiplier => Some(params.thresholds.miles_multiplier),
            Self::InteractionCoeff => Some(params.interactions.interaction_coeff),
            Self::LogBonusCoeff => Some(params.interactions.log_bonus_coeff),
            Self::RoundingBugBonus => Some(params.rounding_bug.base_bonus),
            Self::RoundingBugMultiplier => Some(params.rounding_bug.multiplier),
            _ => None,
        }
    }

    fn enhanced_value(self, params: &EnhancedParams) -> Option<f64> {
        match self {
            Self::ExtendedClusterMultiplier(index) => params.extended_clusters.get(index).copied(),
            Self::OneDayLongDistanceFactor => Some(params.patterns.one_day_long_distance),
            Self::OneDayFactor => Some(params.patterns.one_day),
            Self::LongTripFactor => Some(params.patterns.long_trip),
            Self::ExtremeEfficiencyFactor => Some(params.patterns.extreme_efficiency),
            Self::ExtremeSpendingFactor => Some(params.patterns.extreme_spending),
            Self::ShortHighExpenseFactor => Some(params.patterns.short_high_expense),
            _ => self.base_value(&params.base),
        }
    }

    fn bonus_value(self, bonuses: &Phase2Bonuses) -> Option<f64> {
        match self {
            Self::DurationSquaredCoeff => Some(bonuses.duration_squared_coeff),
            Self::LogMilesCoeff => Some(bonuses.log_miles_coeff),
            Self::ProximityBonus => Some(bonuses.proximity_bonus),
            Self::EfficiencyRatioCoeff => Some(bonuses.efficiency_ratio_coeff),
            Self::PatternMatchCoeff => Some(bonuses.pattern_match_coeff),
            _ => None,
        }
    }

    /// Default search domain for the key.
    fn default_range(self) -> (f64, f64) {
        match self {
            Self::BasePerDiem => (20.0, 150.0),
            Self::MileageBreakpoint(0) => (25.0, 300.0),
            Self::MileageBreakpoint(_) => (300.0, 1200.0),
            Self::ReceiptBreakpoint(0) => (10.0, 200.0),
            Self::ReceiptBreakpoint(1) => (200.0, 1000.0),
            Self::ReceiptBreakpoint(_) => (1000.0, 3000.0),
            Self::MileageRate(_) | Self::ReceiptRate(_) => (0.0, 1.5),
            Self::ReceiptThreshold => (300.0, 1200.0),
            Self::EfficiencyThreshold => (100.0, 300.0),
            Self::MilesThreshold => (200.0, 1000.0),
            Self::ClusterMultiplier(_)
            | Self::VacationBonus
            | Self::VacationBase
            | Self::ExtendedClusterMultiplier(_) => (0.7, 1.6),
            Self::FiveDayMultiplier
            | Self::ReceiptMultiplier
            | Self::EfficiencyMultiplier
            | Self::MilesMultiplier => (0.8, 1.4),
            Self::OneDayLongDistanceFactor
            | Self::OneDayFactor
            | Self::LongTripFactor
            | Self::ExtremeEfficiencyFactor
            | Self::ExtremeSpendingFactor
            | Self::ShortHighExpenseFactor => (0.6, 1.2),
            Self::InteractionCoeff => (-0.005, 0.005),
            Self::LogBonusCoeff => (-10.0, 20.0),
            Self::RoundingBugBonus => (0.0, 60.0),
            Self::RoundingBugMultiplier => (0.0, 0.05),
            Self::DurationSquaredCoeff => (-1.0, 1.0),
            Self::LogMilesCoeff => (-10.0, 10.0),
            Self::ProximityBonus => (0.0, 50.0),
            Self::EfficiencyRatioCoeff => (-10.0, 10.0),
            Self::PatternMatchCoeff => (-20.0, 20.0),
        }
    }

    fn candidates() -> Vec<Self> {
        let mut keys = vec![
            Self::ReceiptThreshold,
            Self::EfficiencyThreshold,
            Self::MilesThreshold,
            Self::MileageBreakpoint(0),
            Self::MileageBreakpoint(1),
            Self::ReceiptBreakpoint(0),
            Self::ReceiptBreakpoint(1),
            Self::ReceiptBreakpoint(2),
            Self::BasePerDiem,
        ];
        keys.extend((0..3).map(Self::MileageRate));
        keys.extend((0..4).map(Self::ReceiptRate));
        keys.extend((0..6).map(Self::ClusterMultiplier));
        keys.extend([
            Self::VacationBonus,
            Self::VacationBase,
            Self::FiveDayMultiplier,
            Self::ReceiptMultiplier,
            Self::EfficiencyMultiplier,
            Self::MilesMultiplier,
        ]);
        keys.extend((0..5).map(Self::ExtendedClusterMultiplier));
        keys.extend([
            Self::OneDayLongDistanceFactor,
            Self::OneDayFactor,
            Self::LongTripFactor,
            Self::ExtremeEfficiencyFactor,
            Self::ExtremeSpendingFactor,
            Self::ShortHighExpenseFactor,
            Self::InteractionCoeff,
            Self::LogBonusCoeff,
            Self::RoundingBugBonus,
            Self::RoundingBugMultiplier,
            Self::DurationSquaredCoeff,
            Self::LogMilesCoeff,
            Self::ProximityBonus,
            Self::EfficiencyRatioCoeff,
            Self::PatternMatchCoeff,
        ]);
        keys
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasePerDiem => f.write_str("base_per_diem"),
            Self::MileageBreakpoint(index) => write!(f, "mileage.breakpoints[{index}]"),
            Self::MileageRate(index) => write!(f, "mileage.rates[{index}]"),
            Self::ReceiptBreakpoint(index) => write!(f, "receipts.breakpoints[{index}]"),
            Self::ReceiptRate(index) => write!(f, "receipts.rates[{index}]"),
            Self::ClusterMultiplier(index) => write!(f, "clusters.base[{index}]"),
            Self::VacationBonus => f.write_str("clusters.vacation_bonus"),
            Self::VacationBase => f.write_str("clusters.vacation_base"),
            Self::FiveDayMultiplier => f.write_str("thresholds.five_day_multiplier"),
            Self::ReceiptThreshold => f.write_str("thresholds.receipt_threshold"),
            Self::ReceiptMultiplier => f.write_str("thresholds.receipt_multiplier"),
            Self::EfficiencyThreshold => f.write_str("thresholds.efficiency_threshold"),
            Self::EfficiencyMultiplier => f.write_str("thresholds.efficiency_multiplier"),
            Self::MilesThreshold => f.write_str("thresholds.miles_threshold"),
            Self::MilesMultiplier => f.write_str("thresholds.miles_multiplier"),
            Self::InteractionCoeff => f.write_str("interactions.interaction_coeff"),
            Self::LogBonusCoeff => f.write_str("interactions.log_bonus_coeff"),
            Self::RoundingBugBonus => f.write_str("rounding_bug.base_bonus"),
            Self::RoundingBugMultiplier => f.write_str("rounding_bug.multiplier"),
            Self::ExtendedClusterMultiplier(index) => write!(f, "extended_clusters[{index}]"),
            Self::OneDayLongDistanceFactor => f.write_str("patterns.one_day_long_distance"),
            Self::OneDayFactor => f.write_str("patterns.one_day"),
            Self::LongTripFactor => f.write_str("patterns.long_trip"),
            Self::ExtremeEfficiencyFactor => f.write_str("patterns.extreme_efficiency"),
            Self::ExtremeSpendingFactor => f.write_str("patterns.extreme_spending"),
            Self::ShortHighExpenseFactor => f.write_str("patterns.short_high_expense"),
            Self::DurationSquaredCoeff => f.write_str("bonuses.duration_squared_coeff"),
            Self::LogMilesCoeff => f.write_str("bonuses.log_miles_coeff"),
            Self::ProximityBonus => f.write_str("bonuses.proximity_bonus"),
            Self::EfficiencyRatioCoeff => f.write_str("bonuses.efficiency_ratio_coeff"),
            Self::PatternMatchCoeff => f.write_str("bonuses.pattern_match_coeff"),
        }
    }
}

/// Closed search interval for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBound {
    pub key: ParamKey,
    pub min: f64,
    pub max: f64,
}

impl ParameterBound {
    pub fn new(key: ParamKey, min: f64, max: f64) -> Self {
        Self { key, min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// The parameters a search may move, each with its bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    bounds: Vec<ParameterBound>,
}

impl ParameterSpace {
    pub fn new(bounds: Vec<ParameterBound>) -> Self {
        Self { bounds }
    }

    /// Every parameter the configuration's variant exposes, with default
    /// bounds widened to contain the current value.
    pub fn for_config(config: &ModelConfig) -> Result<Self, OptimizerError> {
        if matches!(config, ModelConfig::Ensemble(_)) {
            return Err(OptimizerError::NotSearchable {
                variant: config.variant_name(),
            });
        }

        let bounds = ParamKey::candidates()
            .into_iter()
            .filter_map(|key| {
                let current = key.get(config)?;
                let (min, max) = key.default_range();
                Some(ParameterBound::new(key, min.min(current), max.max(current)))
            })
            .collect();
        Ok(Self { bounds })
    }

    /// Keeps only the listed keys, in the order given.
    pub fn restricted_to(&self, keys: &[ParamKey]) -> Self {
        let bounds = keys
            .iter()
            .filter_map(|key| self.bound(*key).copied())
            .collect();
        Self { bounds }
    }

    pub fn with_bound(mut self, bound: ParameterBound) -> Self {
        match self.bounds.iter_mut().find(|existing| existing.key == bound.key) {
            Some(existing) => *existing = bound,
            None => self.bounds.push(bound),
        }
        self
    }

    pub fn bounds(&self) -> &[ParameterBound] {
        &self.bounds
    }

    pub fn bound(&self, key: ParamKey) -> Option<&ParameterBound> {
        self.bounds.iter().find(|bound| bound.key == key)
    }

    pub fn in_phase(&self, phase: SearchPhase) -> impl Iterator<Item = &ParameterBound> + '_ {
        self.bounds
            .iter()
            .filter(move |bound| bound.key.phase() == phase)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}
