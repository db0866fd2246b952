use crate::model::ModelConfig;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Scores closer than this to the best are not improvements.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// When a search stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub max_evaluations: Option<usize>,
    pub time_limit: Option<Duration>,
    /// Consecutive evaluations without improvement before giving up.
    pub patience: Option<usize>,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_evaluations: Some(10_000),
            time_limit: None,
            patience: None,
        }
    }
}

impl SearchBudget {
    pub fn unbounded() -> Self {
        Self {
            max_evaluations: None,
            time_limit: None,
            patience: None,
        }
    }

    pub fn with_max_evaluations(mut self, limit: usize) -> Self {
        self.max_evaluations = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = Some(patience);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The strategy ran out of candidates or converged on its own.
    Completed,
    EvaluationLimit,
    TimeLimit,
    Patience,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Termination::Completed => "search completed",
            Termination::EvaluationLimit => "evaluation limit reached",
            Termination::TimeLimit => "time limit reached",
            Termination::Patience => "no improvement within patience",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    pub evaluation: usize,
    pub score: f64,
}

/// Best configuration seen so far, updated once per fitness evaluation.
#[derive(Debug, Clone)]
pub struct OptimizerState {
    best_score: f64,
    best_config: ModelConfig,
    initial_score: f64,
    evaluations: usize,
    iterations: usize,
    since_improvement: usize,
    history: Vec<Improvement>,
    started: Instant,
}

impl OptimizerState {
    pub fn new(initial: ModelConfig, initial_score: f64) -> Self {
        Self {
            best_score: initial_score,
            best_config: initial,
            initial_score,
            evaluations: 1,
            iterations: 0,
            since_improvement: 0,
            history: vec![Improvement {
                evaluation: 1,
                score: initial_score,
            }],
            started: Instant::now(),
        }
    }

    /// Records one evaluation; returns `true` when it beat the best score.
    pub fn observe(&mut self, config: &ModelConfig, score: f64) -> bool {
        self.evaluations += 1;
        if score < self.best_score - IMPROVEMENT_EPSILON {
            info!(
                evaluation = self.evaluations,
                previous = self.best_score,
                score,
                "new best configuration"
            );
            self.best_score = score;
            self.best_config = config.clone();
            self.since_improvement = 0;
            self.history.push(Improvement {
                evaluation: self.evaluations,
                score,
            });
            true
        } else {
            self.since_improvement += 1;
            false
        }
    }

    pub fn next_iteration(&mut self) {
        self.iterations += 1;
        debug!(
            iteration = self.iterations,
            best = self.best_score,
            "iteration finished"
        );
    }

    /// First budget limit that has been hit, if any.
    pub fn exhausted(&self, budget: &SearchBudget) -> Option<Termination> {
        if budget
            .max_evaluations
            .is_some_and(|limit| self.evaluations >= limit)
        {
            return Some(Termination::EvaluationLimit);
        }
        if budget
            .time_limit
            .is_some_and(|limit| self.started.elapsed() >= limit)
        {
            return Some(Termination::TimeLimit);
        }
        if budget
            .patience
            .is_some_and(|patience| self.since_improvement >= patience)
        {
            return Some(Termination::Patience);
        }
        None
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn best_config(&self) -> &ModelConfig {
        &self.best_config
    }

    pub fn initial_score(&self) -> f64 {
        self.initial_score
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn history(&self) -> &[Improvement] {
        &self.history
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn into_parts(self) -> (ModelConfig, f64, Vec<Improvement>) {
        (self.best_config, self.best_score, self.history)
    }
}
