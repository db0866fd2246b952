use super::evaluation::FitnessEvaluator;
use super::space::{ParameterBound, ParameterSpace, SearchPhase};
use super::state::{OptimizerState, SearchBudget, Termination};
use super::OptimizerError;
use crate::model::ModelConfigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Greedy one-parameter-at-a-time sweeps, phase by phase.
///
/// Each round visits every phase in [`SearchPhase::ordered`] and sweeps each
/// parameter over `samples` evenly spaced values in a window around its
/// current best value. The window starts at the full bound width and is
/// multiplied by `shrink` after every round, so later rounds refine instead
/// of re-scanning. Stuck in local optima is an accepted outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSearch {
    pub samples: usize,
    pub max_rounds: usize,
    pub shrink: f64,
    /// Stop once the window is narrower than this fraction of the bounds.
    pub min_span: f64,
}

impl Default for CoordinateSearch {
    fn default() -> Self {
        Self {
            samples: 11,
            max_rounds: 6,
            shrink: 0.5,
            min_span: 0.01,
        }
    }
}

impl CoordinateSearch {
    pub(crate) fn search<E: FitnessEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        space: &ParameterSpace,
        budget: &SearchBudget,
        state: &mut OptimizerState,
    ) -> Result<Termination, OptimizerError> {
        let samples = self.samples.max(2);
        let shrink = if self.shrink > 0.0 && self.shrink < 1.0 {
            self.shrink
        } else {
            0.5
        };
        let mut span = 1.0;

        for round in 1..=self.max_rounds {
            let round_start = state.best_score();
            for phase in SearchPhase::ordered() {
                let phase_start = state.best_score();
                for bound in space.in_phase(phase) {
                    if let Some(termination) =
                        self.sweep(evaluator, bound, span, samples, budget, state)?
                    {
                        return Ok(termination);
                    }
                }
                debug!(
                    round,
                    phase = %phase,
                    gained = phase_start - state.best_score(),
                    "phase finished"
                );
            }

            state.next_iteration();
            info!(
                round,
                span,
                best = state.best_score(),
                gained = round_start - state.best_score(),
                "coordinate round finished"
            );

            span *= shrink;
            if span < self.min_span {
                break;
            }
        }

        Ok(Termination::Completed)
    }

    fn sweep<E: FitnessEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        bound: &ParameterBound,
        span: f64,
        samples: usize,
        budget: &SearchBudget,
        state: &mut OptimizerState,
    ) -> Result<Option<Termination>, OptimizerError> {
        let Some(current) = bound.key.get(state.best_config()) else {
            return Err(OptimizerError::Parameter(ModelConfigError::MissingParameter {
                parameter: bound.key.to_string(),
                variant: state.best_config().variant_name(),
            }));
        };

        for value in window(bound, current, span, samples) {
            let mut candidate = state.best_config().clone();
            bound.key.set(&mut candidate, value)?;
            let score = evaluator.score(&candidate);
            state.observe(&candidate, score);

            if let Some(termination) = state.exhausted(budget) {
                return Ok(Some(termination));
            }
        }
        Ok(None)
    }
}

/// Evenly spaced values across `span * width` centred on `current`, kept
/// inside the bound and excluding `current` itself.
fn window(bound: &ParameterBound, current: f64, span: f64, samples: usize) -> Vec<f64> {
    let half = bound.width() * span / 2.0;
    let low = bound.clamp(current - half);
    let high = bound.clamp(current + half);
    let step = (high - low) / (samples - 1) as f64;

    (0..samples)
        .map(|index| low + step * index as f64)
        .filter(|value| (value - current).abs() > f64::EPSILON * current.abs().max(1.0))
        .collect()
}
