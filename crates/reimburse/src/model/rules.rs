use super::features::{FeatureKey, FeatureVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
        }
    }
}

/// One conjunct of a rule: `feature <comparison> value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: FeatureKey,
    pub comparison: Comparison,
    pub value: f64,
}

impl Condition {
    pub fn new(feature: FeatureKey, comparison: Comparison, value: f64) -> Self {
        Self {
            feature,
            comparison,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    /// Scales the running amount during the multiplicative stage.
    Multiply(f64),
    /// Added alongside the interaction bonuses.
    Add(f64),
}

/// Extra pattern adjustment applied when every condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub effect: RuleEffect,
}

impl AdjustmentRule {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        self.conditions.iter().all(|condition| {
            condition
                .comparison
                .holds(features.value(condition.feature), condition.value)
        })
    }
}

/// Applies every matching multiplicative rule, in list order.
pub(crate) fn apply_multipliers(
    rules: &[AdjustmentRule],
    features: &FeatureVector,
    amount: f64,
) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.matches(features))
        .fold(amount, |running, rule| match rule.effect {
            RuleEffect::Multiply(factor) => running * factor,
            RuleEffect::Add(_) => running,
        })
}

/// Sum of every matching additive rule.
pub(crate) fn additive_total(rules: &[AdjustmentRule], features: &FeatureVector) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.matches(features))
        .map(|rule| match rule.effect {
            RuleEffect::Add(bonus) => bonus,
            RuleEffect::Multiply(_) => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::domain::TripInput;

    fn features(days: i64, miles: f64, receipts: f64) -> FeatureVector {
        FeatureVector::compute(&TripInput::new(days, miles, receipts).expect("valid trip"))
    }

    fn long_trip_rule(effect: RuleEffect) -> AdjustmentRule {
        AdjustmentRule {
            name: "long trip".to_string(),
            conditions: vec![
                Condition::new(FeatureKey::TripDurationDays, Comparison::Ge, 10.0),
                Condition::new(FeatureKey::ReceiptsPerDay, Comparison::Gt, 100.0),
            ],
            effect,
        }
    }

    #[test]
    fn requires_every_condition() {
        let rule = long_trip_rule(RuleEffect::Multiply(0.5));
        assert!(rule.matches(&features(10, 100.0, 1200.0)));
        assert!(!rule.matches(&features(10, 100.0, 900.0)));
        assert!(!rule.matches(&features(9, 100.0, 1200.0)));
    }

    #[test]
    fn multipliers_and_additions_stay_separate() {
        let rules = vec![
            long_trip_rule(RuleEffect::Multiply(0.5)),
            long_trip_rule(RuleEffect::Add(12.0)),
        ];
        let matching = features(12, 100.0, 2400.0);
        assert_eq!(apply_multipliers(&rules, &matching, 100.0), 50.0);
        assert_eq!(additive_total(&rules, &matching), 12.0);

        let other = features(2, 100.0, 50.0);
        assert_eq!(apply_multipliers(&rules, &other, 100.0), 100.0);
        assert_eq!(additive_total(&rules, &other), 0.0);
    }

    #[test]
    fn deserializes_from_json() {
        let rule: AdjustmentRule = serde_json::from_str(
            r#"{
                "name": "one day splurge",
                "conditions": [
                    {"feature": "trip_duration_days", "comparison": "eq", "value": 1},
                    {"feature": "total_receipts_amount", "comparison": "gt", "value": 1800}
                ],
                "effect": {"multiply": 0.65}
            }"#,
        )
        .expect("rule parses");
        assert_eq!(rule.effect, RuleEffect::Multiply(0.65));
        assert!(rule.matches(&features(1, 100.0, 1900.0)));
    }
}
