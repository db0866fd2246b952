use super::domain::TripInput;
use serde::{Deserialize, Serialize};

/// Cent endings that trigger the primary rounding-bug flag.
pub const ROUNDING_BUG_CENTS: [u8; 2] = [49, 99];

/// Coarse miles-per-day band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyBand {
    Low,
    Medium,
    Optimal,
    High,
    VeryHigh,
}

impl EfficiencyBand {
    fn from_miles_per_day(miles_per_day: f64) -> Self {
        if miles_per_day < 100.0 {
            Self::Low
        } else if miles_per_day < 180.0 {
            Self::Medium
        } else if miles_per_day <= 220.0 {
            Self::Optimal
        } else if miles_per_day <= 300.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// Coarse receipts-per-day band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingBand {
    Low,
    Medium,
    High,
}

impl SpendingBand {
    fn from_receipts_per_day(receipts_per_day: f64) -> Self {
        if receipts_per_day < 75.0 {
            Self::Low
        } else if receipts_per_day <= 120.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Numeric features addressable by name from data-driven adjustment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    TripDurationDays,
    MilesTraveled,
    TotalReceiptsAmount,
    MilesPerDay,
    ReceiptsPerDay,
    ReceiptsPerMile,
    ReceiptCents,
    LogReceipts,
    TotalEfficiency,
    DurationSpendingInteraction,
}

/// Everything the scorer knows about a trip, derived from its three inputs.
///
/// Computation is pure arithmetic over a validated [`TripInput`], so it never
/// fails and recomputing it yields bitwise-identical values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub trip_duration_days: f64,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,

    pub miles_per_day: f64,
    pub receipts_per_day: f64,
    pub receipts_per_mile: f64,

    pub efficiency_band: EfficiencyBand,
    pub efficiency_bonus_zone: bool,
    pub efficiency_penalty_zone: bool,
    pub very_low_efficiency: bool,
    pub extreme_efficiency: bool,

    pub spending_band: SpendingBand,
    pub very_low_receipts: bool,
    pub optimal_receipt_range: bool,
    pub high_spending: bool,
    pub extreme_spending: bool,

    pub receipt_cents: u8,
    pub rounding_bug: bool,

    pub is_5_day_trip: bool,
    pub sweet_spot_duration: bool,
    pub duration_penalty_zone: bool,
    pub very_short_trip: bool,
    pub very_long_trip: bool,

    pub sweet_spot_combo: bool,
    pub vacation_penalty: bool,
    pub high_mile_low_spend: bool,
    pub low_mile_high_spend: bool,
    pub short_high_efficiency: bool,
    pub long_low_efficiency: bool,
    pub medium_balanced: bool,
    pub one_day_long_distance: bool,
    pub short_high_expense: bool,

    pub efficiency_spending_interaction: f64,
    pub duration_efficiency_interaction: f64,
    pub duration_spending_interaction: f64,

    pub duration_squared: f64,
    pub miles_squared: f64,
    pub receipts_squared: f64,
    pub duration_cubed: f64,

    pub log_duration: f64,
    pub log_miles: f64,
    pub log_receipts: f64,

    pub total_efficiency: f64,
    pub cost_per_mile: f64,
    pub productivity_score: f64,
}

impl FeatureVector {
    pub fn compute(input: &TripInput) -> Self {
        let days = input.days() as f64;
        let miles = input.miles();
        let receipts = input.receipts();

        let miles_per_day = miles / days;
        let receipts_per_day = receipts / days;
        let receipts_per_mile = if miles > 0.0 { receipts / miles } else { 0.0 };
        let receipt_cents = receipt_cents(receipts);
        let day_count = input.days();

        Self {
            trip_duration_days: days,
            miles_traveled: miles,
            total_receipts_amount: receipts,

            miles_per_day,
            receipts_per_day,
            receipts_per_mile,

            efficiency_band: EfficiencyBand::from_miles_per_day(miles_per_day),
            efficiency_bonus_zone: (180.0..=220.0).contains(&miles_per_day),
            efficiency_penalty_zone: miles_per_day > 300.0,
            very_low_efficiency: miles_per_day < 50.0,
            extreme_efficiency: miles_per_day > 400.0,

            spending_band: SpendingBand::from_receipts_per_day(receipts_per_day),
            very_low_receipts: receipts < 50.0,
            optimal_receipt_range: (600.0..=800.0).contains(&receipts),
            high_spending: receipts > 1000.0,
            extreme_spending: receipts_per_day > 400.0,

            receipt_cents,
            rounding_bug: ROUNDING_BUG_CENTS.contains(&receipt_cents),

            is_5_day_trip: day_count == 5,
            sweet_spot_duration: (4..=6).contains(&day_count),
            duration_penalty_zone: day_count < 2 || day_count > 10,
            very_short_trip: day_count == 1,
            very_long_trip: day_count >= 8,

            sweet_spot_combo: day_count == 5
                && miles_per_day >= 180.0
                && receipts_per_day < 100.0,
            vacation_penalty: day_count >= 8 && receipts_per_day > 120.0,
            high_mile_low_spend: miles_per_day > 200.0 && receipts_per_day < 80.0,
            low_mile_high_spend: miles_per_day < 100.0 && receipts_per_day > 100.0,
            short_high_efficiency: day_count <= 3 && miles_per_day > 150.0,
            long_low_efficiency: day_count >= 7 && miles_per_day < 100.0,
            medium_balanced: (4..=6).contains(&day_count)
                && (100.0..=200.0).contains(&miles_per_day)
                && (50.0..=150.0).contains(&receipts_per_day),
            one_day_long_distance: day_count == 1 && miles > 800.0,
            short_high_expense: day_count <= 2 && receipts > 1000.0,

            efficiency_spending_interaction: miles_per_day * receipts_per_day,
            duration_efficiency_interaction: days * miles_per_day,
            duration_spending_interaction: days * receipts_per_day,

            duration_squared: days * days,
            miles_squared: miles * miles,
            receipts_squared: receipts * receipts,
            duration_cubed: days * days * days,

            log_duration: (days + 1.0).ln(),
            log_miles: (miles + 1.0).ln(),
            log_receipts: (receipts + 1.0).ln(),

            total_efficiency: (miles * days) / (receipts + 1.0),
            cost_per_mile: receipts_per_mile,
            productivity_score: miles / (days * (receipts + 1.0)),
        }
    }

    pub fn value(&self, key: FeatureKey) -> f64 {
        match key {
            FeatureKey::TripDurationDays => self.trip_duration_days,
            FeatureKey::MilesTraveled => self.miles_traveled,
            FeatureKey::TotalReceiptsAmount => self.total_receipts_amount,
            FeatureKey::MilesPerDay => self.miles_per_day,
            FeatureKey::ReceiptsPerDay => self.receipts_per_day,
            FeatureKey::ReceiptsPerMile => self.receipts_per_mile,
            FeatureKey::ReceiptCents => f64::from(self.receipt_cents),
            FeatureKey::LogReceipts => self.log_receipts,
            FeatureKey::TotalEfficiency => self.total_efficiency,
            FeatureKey::DurationSpendingInteraction => self.duration_spending_interaction,
        }
    }

    /// Number of "ideal trip shape" flags that hold.
    pub fn ideal_pattern_count(&self) -> u32 {
        [
            self.sweet_spot_combo,
            self.medium_balanced,
            self.efficiency_bonus_zone,
            self.optimal_receipt_range,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count() as u32
    }
}

/// Fractional cents of a receipts amount: `round(receipts * 100) mod 100`.
pub fn receipt_cents(receipts: f64) -> u8 {
    let cents = (receipts * 100.0).round() as i64;
    cents.rem_euclid(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(days: i64, miles: f64, receipts: f64) -> FeatureVector {
        let input = TripInput::new(days, miles, receipts).expect("valid trip");
        FeatureVector::compute(&input)
    }

    #[test]
    fn derives_rates_per_day() {
        let vector = features(4, 400.0, 300.0);
        assert_eq!(vector.miles_per_day, 100.0);
        assert_eq!(vector.receipts_per_day, 75.0);
        assert_eq!(vector.receipts_per_mile, 0.75);
    }

    #[test]
    fn zero_miles_yields_zero_receipts_per_mile() {
        let vector = features(2, 0.0, 120.0);
        assert_eq!(vector.receipts_per_mile, 0.0);
        assert_eq!(vector.cost_per_mile, 0.0);
        assert!(vector.very_low_efficiency);
    }

    #[test]
    fn extracts_cents_without_float_drift() {
        assert_eq!(receipt_cents(300.49), 49);
        assert_eq!(receipt_cents(12.99), 99);
        assert_eq!(receipt_cents(1.005 + 0.004), 1);
        assert_eq!(receipt_cents(45.0), 0);
        assert_eq!(receipt_cents(0.5), 50);
    }

    #[test]
    fn flags_rounding_bug_only_for_primary_endings() {
        assert!(features(2, 10.0, 300.49).rounding_bug);
        assert!(features(2, 10.0, 7.99).rounding_bug);
        assert!(!features(2, 10.0, 7.00).rounding_bug);
        assert!(!features(2, 10.0, 7.50).rounding_bug);
        assert!(!features(2, 10.0, 7.51).rounding_bug);
    }

    #[test]
    fn duration_flags_follow_day_count() {
        let five = features(5, 900.0, 45.0);
        assert!(five.is_5_day_trip);
        assert!(five.sweet_spot_duration);
        assert!(!five.duration_penalty_zone);

        let one = features(1, 850.0, 300.49);
        assert!(one.very_short_trip);
        assert!(one.duration_penalty_zone);
        assert!(one.one_day_long_distance);
        assert!(one.extreme_efficiency);
    }

    #[test]
    fn vacation_penalty_needs_long_trip_and_high_spend() {
        assert!(features(9, 300.0, 1350.0).vacation_penalty);
        assert!(!features(9, 300.0, 900.0).vacation_penalty);
        assert!(!features(6, 300.0, 1350.0).vacation_penalty);
    }

    #[test]
    fn bands_cover_boundaries() {
        assert_eq!(
            features(1, 180.0, 10.0).efficiency_band,
            EfficiencyBand::Optimal
        );
        assert_eq!(
            features(1, 220.0, 10.0).efficiency_band,
            EfficiencyBand::Optimal
        );
        assert_eq!(
            features(1, 300.5, 10.0).efficiency_band,
            EfficiencyBand::VeryHigh
        );
        assert_eq!(features(1, 0.0, 120.0).spending_band, SpendingBand::Medium);
        assert_eq!(features(1, 0.0, 120.5).spending_band, SpendingBand::High);
    }

    #[test]
    fn recomputation_is_bitwise_identical() {
        let input = TripInput::new(7, 812.37, 1143.11).expect("valid trip");
        let first = FeatureVector::compute(&input);
        let second = FeatureVector::compute(&input);
        assert_eq!(first.log_receipts.to_bits(), second.log_receipts.to_bits());
        assert_eq!(
            first.productivity_score.to_bits(),
            second.productivity_score.to_bits()
        );
        assert_eq!(first, second);
    }

    #[test]
    fn counts_ideal_patterns() {
        let vector = features(5, 1050.0, 450.0);
        assert!(!vector.medium_balanced);
        assert!(vector.sweet_spot_combo);
        assert!(vector.efficiency_bonus_zone);
        assert_eq!(vector.ideal_pattern_count(), 2);
    }
}
