use super::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which predicate chain assigns clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterScheme {
    /// The six original calculation paths.
    Base,
    /// Five edge-case clusters checked ahead of the original six.
    Extended,
}

/// Calculation path chosen for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    ShortExtremeEfficiency,
    LongLowEfficiency,
    MediumHighSpending,
    MediumEfficientFrugal,
    LongHighSpending,
    Standard,
    OneDayLongDistance,
    ExtremeEfficiency,
    ExtremeSpending,
    ShortHighExpense,
    ExtendedLowSpend,
}

impl Cluster {
    pub const BASE_COUNT: usize = 6;
    pub const EXTENDED_COUNT: usize = 5;

    /// Stable label in `0..=10`; the first six are the base clusters.
    pub const fn index(self) -> usize {
        match self {
            Self::ShortExtremeEfficiency => 0,
            Self::LongLowEfficiency => 1,
            Self::MediumHighSpending => 2,
            Self::MediumEfficientFrugal => 3,
            Self::LongHighSpending => 4,
            Self::Standard => 5,
            Self::OneDayLongDistance => 6,
            Self::ExtremeEfficiency => 7,
            Self::ExtremeSpending => 8,
            Self::ShortHighExpense => 9,
            Self::ExtendedLowSpend => 10,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ShortExtremeEfficiency => "very short, extremely high efficiency",
            Self::LongLowEfficiency => "long, very low efficiency",
            Self::MediumHighSpending => "medium length, very high spending",
            Self::MediumEfficientFrugal => "medium length, efficient, low spending",
            Self::LongHighSpending => "long, high spending",
            Self::Standard => "everything else",
            Self::OneDayLongDistance => "one day, long distance",
            Self::ExtremeEfficiency => "extreme efficiency",
            Self::ExtremeSpending => "extreme daily spending",
            Self::ShortHighExpense => "short, high expense",
            Self::ExtendedLowSpend => "extended stay, low spending",
        }
    }

    /// First matching predicate wins; the last branch is unconditional.
    pub fn classify(features: &FeatureVector, scheme: ClusterScheme) -> Self {
        if scheme == ClusterScheme::Extended {
            if let Some(cluster) = extended_cluster(features) {
                return cluster;
            }
        }
        base_cluster(features)
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster {} ({})", self.index(), self.label())
    }
}

fn extended_cluster(features: &FeatureVector) -> Option<Cluster> {
    let days = features.trip_duration_days;

    if features.one_day_long_distance {
        Some(Cluster::OneDayLongDistance)
    } else if features.extreme_efficiency {
        Some(Cluster::ExtremeEfficiency)
    } else if features.extreme_spending {
        Some(Cluster::ExtremeSpending)
    } else if features.short_high_expense {
        Some(Cluster::ShortHighExpense)
    } else if days >= 12.0 && features.receipts_per_day < 50.0 {
        Some(Cluster::ExtendedLowSpend)
    } else {
        None
    }
}

fn base_cluster(features: &FeatureVector) -> Cluster {
    let days = features.trip_duration_days;
    let receipts = features.total_receipts_amount;
    let miles_per_day = features.miles_per_day;

    if days <= 1.5 && miles_per_day > 500.0 {
        Cluster::ShortExtremeEfficiency
    } else if days > 8.0 && miles_per_day < 50.0 {
        Cluster::LongLowEfficiency
    } else if (3.0..=5.0).contains(&days) && receipts > 1500.0 {
        Cluster::MediumHighSpending
    } else if (4.0..=7.0).contains(&days) && miles_per_day > 150.0 && receipts < 800.0 {
        Cluster::MediumEfficientFrugal
    } else if days > 8.0 && receipts > 1200.0 {
        Cluster::LongHighSpending
    } else {
        Cluster::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::domain::TripInput;

    fn classify(days: i64, miles: f64, receipts: f64, scheme: ClusterScheme) -> Cluster {
        let input = TripInput::new(days, miles, receipts).expect("valid trip");
        Cluster::classify(&FeatureVector::compute(&input), scheme)
    }

    #[test]
    fn base_chain_assigns_each_original_path() {
        use ClusterScheme::Base;
        assert_eq!(
            classify(1, 600.0, 20.0, Base),
            Cluster::ShortExtremeEfficiency
        );
        assert_eq!(classify(10, 200.0, 300.0, Base), Cluster::LongLowEfficiency);
        assert_eq!(classify(4, 200.0, 1800.0, Base), Cluster::MediumHighSpending);
        assert_eq!(
            classify(6, 1200.0, 500.0, Base),
            Cluster::MediumEfficientFrugal
        );
        assert_eq!(classify(10, 900.0, 1500.0, Base), Cluster::LongHighSpending);
        assert_eq!(classify(2, 100.0, 100.0, Base), Cluster::Standard);
    }

    #[test]
    fn earlier_predicates_take_precedence() {
        // Long, low efficiency and high spending: the efficiency branch comes first.
        assert_eq!(
            classify(10, 100.0, 2000.0, ClusterScheme::Base),
            Cluster::LongLowEfficiency
        );
    }

    #[test]
    fn extended_clusters_preempt_original_ones() {
        assert_eq!(
            classify(1, 850.0, 300.49, ClusterScheme::Base),
            Cluster::ShortExtremeEfficiency
        );
        assert_eq!(
            classify(1, 850.0, 300.49, ClusterScheme::Extended),
            Cluster::OneDayLongDistance
        );
        assert_eq!(
            classify(2, 900.0, 100.0, ClusterScheme::Extended),
            Cluster::ExtremeEfficiency
        );
        assert_eq!(
            classify(3, 100.0, 1500.0, ClusterScheme::Extended),
            Cluster::ExtremeSpending
        );
        assert_eq!(
            classify(2, 100.0, 700.0, ClusterScheme::Extended),
            Cluster::Standard
        );
        assert_eq!(
            classify(14, 300.0, 350.0, ClusterScheme::Extended),
            Cluster::ExtendedLowSpend
        );
    }

    #[test]
    fn indices_are_unique_and_dense() {
        let all = [
            Cluster::ShortExtremeEfficiency,
            Cluster::LongLowEfficiency,
            Cluster::MediumHighSpending,
            Cluster::MediumEfficientFrugal,
            Cluster::LongHighSpending,
            Cluster::Standard,
            Cluster::OneDayLongDistance,
            Cluster::ExtremeEfficiency,
            Cluster::ExtremeSpending,
            Cluster::ShortHighExpense,
            Cluster::ExtendedLowSpend,
        ];
        let mut seen: Vec<usize> = all.iter().map(|cluster| cluster.index()).collect();
        seen.sort_unstable();
        let expected: Vec<usize> = (0..Cluster::BASE_COUNT + Cluster::EXTENDED_COUNT).collect();
        assert_eq!(seen, expected);
    }
}
