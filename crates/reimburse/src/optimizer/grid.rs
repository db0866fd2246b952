use super::evaluation::FitnessEvaluator;
use super::space::ParamKey;
use super::state::{OptimizerState, SearchBudget, Termination};
use super::OptimizerError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Candidate values for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub key: ParamKey,
    pub values: Vec<f64>,
}

impl GridAxis {
    pub fn new(key: ParamKey, values: Vec<f64>) -> Self {
        Self { key, values }
    }
}

/// Exhaustive search over the cartesian product of a few axes.
///
/// Every combination is applied to the starting configuration, so the axes
/// are searched jointly but nothing outside them moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearch {
    pub axes: Vec<GridAxis>,
}

impl Default for GridSearch {
    /// The five axes that dominate the error on the historical cases.
    fn default() -> Self {
        Self {
            axes: vec![
                GridAxis::new(
                    ParamKey::ClusterMultiplier(3),
                    vec![1.0, 1.1, 1.2, 1.3, 1.4, 1.5],
                ),
                GridAxis::new(
                    ParamKey::EfficiencyMultiplier,
                    vec![1.02, 1.03, 1.05, 1.07, 1.10],
                ),
                GridAxis::new(ParamKey::LogBonusCoeff, vec![1.5, 2.0, 2.5, 3.0, 3.5]),
                GridAxis::new(ParamKey::BasePerDiem, vec![45.0, 50.0, 55.0, 60.0]),
                GridAxis::new(ParamKey::MileageRate(2), vec![0.25, 0.30, 0.35, 0.40]),
            ],
        }
    }
}

impl GridSearch {
    pub fn new(axes: Vec<GridAxis>) -> Self {
        Self { axes }
    }

    pub fn combinations(&self) -> usize {
        self.axes.iter().map(|axis| axis.values.len()).product()
    }

    pub(crate) fn search<E: FitnessEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        budget: &SearchBudget,
        state: &mut OptimizerState,
    ) -> Result<Termination, OptimizerError> {
        if self.axes.is_empty() {
            return Err(OptimizerError::EmptyParameterSpace);
        }
        if let Some(axis) = self.axes.iter().find(|axis| axis.values.is_empty()) {
            return Err(OptimizerError::EmptyGridAxis { key: axis.key });
        }

        let total = self.combinations();
        info!(axes = self.axes.len(), combinations = total, "grid search");

        let mut odometer = vec![0usize; self.axes.len()];
        let mut candidate = state.best_config().clone();
        for tested in 1..=total {
            for (axis, position) in self.axes.iter().zip(&odometer) {
                axis.key.set(&mut candidate, axis.values[*position])?;
            }
            let score = evaluator.score(&candidate);
            state.observe(&candidate, score);

            if tested % 500 == 0 {
                info!(tested, total, best = state.best_score(), "grid progress");
            }
            if let Some(termination) = state.exhausted(budget) {
                return Ok(termination);
            }
            advance(&mut odometer, &self.axes);
        }

        state.next_iteration();
        Ok(Termination::Completed)
    }
}

/// Steps the mixed-radix counter; the last axis moves fastest.
fn advance(odometer: &mut [usize], axes: &[GridAxis]) {
    for (position, axis) in odometer.iter_mut().zip(axes).rev() {
        *position += 1;
        if *position < axis.values.len() {
            return;
        }
        *position = 0;
    }
}
