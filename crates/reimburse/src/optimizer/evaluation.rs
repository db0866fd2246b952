use super::OptimizerError;
use crate::model::{predict_features, FeatureVector, ModelConfig, ScoringError, TripRecord};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Absolute error charged for a case that fails to score.
pub const DEFAULT_FAILURE_PENALTY: f64 = 1000.0;

/// Score assigned to configurations the validity guard rejects.
pub const INVALID_SCORE: f64 = f64::MAX;

const EXACT_TOLERANCE: f64 = 0.01;
const CLOSE_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    MeanAbsoluteError,
    SumSquaredError,
}

impl Objective {
    pub const fn name(self) -> &'static str {
        match self {
            Self::MeanAbsoluteError => "mean_absolute_error",
            Self::SumSquaredError => "sum_squared_error",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate error of one configuration; lower is better.
///
/// Implementations never fail: rejected configurations score
/// [`INVALID_SCORE`] and failing cases are charged a finite penalty.
pub trait FitnessEvaluator: Sync {
    fn objective(&self) -> Objective;

    fn score(&self, config: &ModelConfig) -> f64;
}

#[derive(Debug, Clone)]
struct LabeledCase {
    record: TripRecord,
    expected: f64,
    features: Result<FeatureVector, ScoringError>,
}

/// Error detail for one labeled case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseError {
    pub index: usize,
    pub record: TripRecord,
    pub expected: f64,
    pub predicted: Option<f64>,
    pub error: f64,
    pub miles_per_day: Option<f64>,
    pub receipts_per_day: Option<f64>,
}

/// Summary of a configuration against the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub objective: Objective,
    pub cases: usize,
    pub score: f64,
    pub mean_absolute_error: f64,
    pub sum_squared_error: f64,
    pub exact_matches: usize,
    pub close_matches: usize,
    pub max_error: f64,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    count: usize,
    absolute: f64,
    squared: f64,
    exact: usize,
    close: usize,
    max: f64,
    failures: usize,
}

impl Totals {
    fn record(mut self, error: f64, failed: bool) -> Self {
        self.count += 1;
        self.absolute += error;
        self.squared += error * error;
        self.max = self.max.max(error);
        if failed {
            self.failures += 1;
        } else {
            if error < EXACT_TOLERANCE {
                self.exact += 1;
            }
            if error < CLOSE_TOLERANCE {
                self.close += 1;
            }
        }
        self
    }

    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            absolute: self.absolute + other.absolute,
            squared: self.squared + other.squared,
            exact: self.exact + other.exact,
            close: self.close + other.close,
            max: self.max.max(other.max),
            failures: self.failures + other.failures,
        }
    }
}

/// Scores configurations against a fixed set of labeled trips.
///
/// Features are computed once up front; each evaluation then walks the cases
/// without touching shared state. With the `rayon` feature the walk is split
/// across worker threads and the partial totals are merged afterwards.
#[derive(Debug, Clone)]
pub struct DatasetEvaluator {
    cases: Vec<LabeledCase>,
    objective: Objective,
    failure_penalty: f64,
}

impl DatasetEvaluator {
    pub fn new(records: &[TripRecord], objective: Objective) -> Result<Self, OptimizerError> {
        if records.is_empty() {
            return Err(OptimizerError::EmptyDataset);
        }

        let cases = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let expected = record
                    .expected_output
                    .filter(|value| value.is_finite())
                    .ok_or(OptimizerError::UnlabeledRecord { index })?;
                let features = record
                    .input()
                    .map(|input| FeatureVector::compute(&input));
                Ok(LabeledCase {
                    record: *record,
                    expected,
                    features,
                })
            })
            .collect::<Result<Vec<_>, OptimizerError>>()?;

        Ok(Self {
            cases,
            objective,
            failure_penalty: DEFAULT_FAILURE_PENALTY,
        })
    }

    pub fn with_failure_penalty(mut self, penalty: f64) -> Self {
        self.failure_penalty = penalty;
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Full report; an invalid configuration scores every case as a failure.
    pub fn evaluate(&self, config: &ModelConfig) -> EvaluationReport {
        let totals = if config.validate().is_ok() {
            self.totals(config)
        } else {
            self.cases
                .iter()
                .fold(Totals::default(), |totals, _| {
                    totals.record(self.failure_penalty, true)
                })
        };
        let mean_absolute_error = totals.absolute / totals.count as f64;

        EvaluationReport {
            objective: self.objective,
            cases: totals.count,
            score: self.objective_value(&totals),
            mean_absolute_error,
            sum_squared_error: totals.squared,
            exact_matches: totals.exact,
            close_matches: totals.close,
            max_error: totals.max,
            failures: totals.failures,
        }
    }

    /// The `limit` cases with the largest absolute error, worst first.
    pub fn worst_cases(&self, config: &ModelConfig, limit: usize) -> Vec<CaseError> {
        let mut errors: Vec<CaseError> = self
            .cases
            .iter()
            .enumerate()
            .map(|(index, case)| {
                let predicted = case
                    .features
                    .as_ref()
                    .ok()
                    .and_then(|features| predict_features(config, features).ok())
                    .map(|prediction| prediction.amount);
                let features = case.features.as_ref().ok();
                CaseError {
                    index,
                    record: case.record,
                    expected: case.expected,
                    predicted,
                    error: predicted
                        .map(|amount| (amount - case.expected).abs())
                        .unwrap_or(self.failure_penalty),
                    miles_per_day: features.map(|features| features.miles_per_day),
                    receipts_per_day: features.map(|features| features.receipts_per_day),
                }
            })
            .collect();

        errors.sort_by(|left, right| {
            right
                .error
                .partial_cmp(&left.error)
                .unwrap_or(Ordering::Equal)
                .then(left.index.cmp(&right.index))
        });
        errors.truncate(limit);
        errors
    }

    fn case_error(&self, config: &ModelConfig, case: &LabeledCase) -> (f64, bool) {
        let prediction = case
            .features
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|features| predict_features(config, features));
        match prediction {
            Ok(prediction) => ((prediction.amount - case.expected).abs(), false),
            Err(_) => (self.failure_penalty, true),
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn totals(&self, config: &ModelConfig) -> Totals {
        self.cases.iter().fold(Totals::default(), |totals, case| {
            let (error, failed) = self.case_error(config, case);
            totals.record(error, failed)
        })
    }

    #[cfg(feature = "rayon")]
    fn totals(&self, config: &ModelConfig) -> Totals {
        self.cases
            .par_iter()
            .fold(Totals::default, |totals, case| {
                let (error, failed) = self.case_error(config, case);
                totals.record(error, failed)
            })
            .reduce(Totals::default, Totals::merge)
    }

    fn objective_value(&self, totals: &Totals) -> f64 {
        match self.objective {
            Objective::MeanAbsoluteError => totals.absolute / totals.count as f64,
            Objective::SumSquaredError => totals.squared,
        }
    }
}

impl FitnessEvaluator for DatasetEvaluator {
    fn objective(&self) -> Objective {
        self.objective
    }

    fn score(&self, config: &ModelConfig) -> f64 {
        if config.validate().is_err() {
            return INVALID_SCORE;
        }
        let score = self.objective_value(&self.totals(config));
        if score.is_finite() {
            score
        } else {
            INVALID_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{score_trip, Preset};

    fn labeled(days: i64, miles: f64, receipts: f64, config: &ModelConfig) -> TripRecord {
        let amount = score_trip(days, miles, receipts, config).expect("trip scores");
        TripRecord::new(days, miles, receipts).labeled(amount)
    }

    fn records() -> Vec<TripRecord> {
        let config = Preset::Base.config();
        vec![
            labeled(1, 55.0, 3.6, &config),
            labeled(3, 93.0, 1.42, &config),
            labeled(5, 130.0, 306.9, &config),
            labeled(8, 1025.0, 1500.28, &config),
        ]
    }

    #[test]
    fn generating_config_scores_zero() {
        let evaluator =
            DatasetEvaluator::new(&records(), Objective::MeanAbsoluteError).expect("labeled data");
        assert_eq!(evaluator.score(&Preset::Base.config()), 0.0);

        let report = evaluator.evaluate(&Preset::Base.config());
        assert_eq!(report.cases, 4);
        assert_eq!(report.exact_matches, 4);
        assert_eq!(report.close_matches, 4);
        assert_eq!(report.failures, 0);
    }

    #[test]
    fn other_config_scores_positive() {
        let evaluator =
            DatasetEvaluator::new(&records(), Objective::SumSquaredError).expect("labeled data");
        let report = evaluator.evaluate(&Preset::Conservative.config());
        assert!(report.score > 0.0);
        assert_eq!(report.score, report.sum_squared_error);
        assert!(report.max_error >= report.mean_absolute_error);
    }

    #[test]
    fn rejects_empty_and_unlabeled_data() {
        assert!(matches!(
            DatasetEvaluator::new(&[], Objective::MeanAbsoluteError),
            Err(OptimizerError::EmptyDataset)
        ));
        let mut data = records();
        data.push(TripRecord::new(2, 10.0, 10.0));
        assert!(matches!(
            DatasetEvaluator::new(&data, Objective::MeanAbsoluteError),
            Err(OptimizerError::UnlabeledRecord { index: 4 })
        ));
    }

    #[test]
    fn invalid_config_gets_worst_score() {
        let evaluator =
            DatasetEvaluator::new(&records(), Objective::MeanAbsoluteError).expect("labeled data");
        let mut config = Preset::Base.config();
        if let Some(params) = config.base_params_mut() {
            params.mileage.breakpoints = [600.0, 500.0];
        }
        assert_eq!(evaluator.score(&config), INVALID_SCORE);
        assert_eq!(evaluator.evaluate(&config).failures, 4);
    }

    #[test]
    fn failing_case_costs_the_penalty() {
        let mut data = records();
        data.push(TripRecord::new(0, 10.0, 10.0).labeled(100.0));
        let evaluator = DatasetEvaluator::new(&data, Objective::MeanAbsoluteError)
            .expect("labeled data")
            .with_failure_penalty(500.0);

        let report = evaluator.evaluate(&Preset::Base.config());
        assert_eq!(report.failures, 1);
        assert_eq!(report.max_error, 500.0);
        assert_eq!(report.mean_absolute_error, 100.0);

        let worst = evaluator.worst_cases(&Preset::Base.config(), 2);
        assert_eq!(worst.len(), 2);
        assert_eq!(worst[0].index, 4);
        assert!(worst[0].predicted.is_none());
        assert_eq!(worst[1].error, 0.0);
    }
}
