//! Parameter search against labeled cases.
//!
//! A [`FitnessEvaluator`] turns a configuration into one aggregate error.
//! [`Optimizer::run`] drives one [`SearchStrategy`] from a starting
//! configuration, threading an explicit [`OptimizerState`] through every
//! evaluation and stopping on the [`SearchBudget`].

mod coordinate;
mod evaluation;
mod genetic;
mod grid;
mod space;
mod state;

pub use coordinate::CoordinateSearch;
pub use evaluation::{
    CaseError, DatasetEvaluator, EvaluationReport, FitnessEvaluator, Objective,
    DEFAULT_FAILURE_PENALTY, INVALID_SCORE,
};
pub use genetic::GeneticSearch;
pub use grid::{GridAxis, GridSearch};
pub use space::{ParamKey, ParameterBound, ParameterSpace, SearchPhase};
pub use state::{Improvement, OptimizerState, SearchBudget, Termination};

use crate::model::{ModelConfig, ModelConfigError};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SearchStrategy {
    Grid(GridSearch),
    Coordinate(CoordinateSearch),
    Genetic(GeneticSearch),
}

impl SearchStrategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Grid(_) => "grid",
            Self::Coordinate(_) => "coordinate",
            Self::Genetic(_) => "genetic",
        }
    }
}

/// Result of one search run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub strategy: &'static str,
    pub objective: Objective,
    pub initial_score: f64,
    pub best_score: f64,
    pub best_config: ModelConfig,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
    pub history: Vec<Improvement>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl OptimizationOutcome {
    pub fn improved(&self) -> bool {
        self.best_score < self.initial_score
    }
}

pub struct Optimizer<'a, E: FitnessEvaluator + ?Sized> {
    evaluator: &'a E,
    space: ParameterSpace,
    budget: SearchBudget,
}

impl<'a, E: FitnessEvaluator + ?Sized> Optimizer<'a, E> {
    pub fn new(evaluator: &'a E, space: ParameterSpace) -> Self {
        Self {
            evaluator,
            space,
            budget: SearchBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn run(
        &self,
        initial: ModelConfig,
        strategy: &SearchStrategy,
    ) -> Result<OptimizationOutcome, OptimizerError> {
        initial.validate().map_err(OptimizerError::InvalidStart)?;
        if !matches!(strategy, SearchStrategy::Grid(_)) {
            self.check_space()?;
        }

        let initial_score = self.evaluator.score(&initial);
        info!(
            strategy = strategy.name(),
            objective = %self.evaluator.objective(),
            parameters = self.space.len(),
            initial_score,
            "starting parameter search"
        );

        let mut state = OptimizerState::new(initial, initial_score);
        let termination = match strategy {
            SearchStrategy::Grid(grid) => grid.search(self.evaluator, &self.budget, &mut state)?,
            SearchStrategy::Coordinate(coordinate) => {
                coordinate.search(self.evaluator, &self.space, &self.budget, &mut state)?
            }
            SearchStrategy::Genetic(genetic) => {
                genetic.search(self.evaluator, &self.space, &self.budget, &mut state)?
            }
        };

        info!(
            %termination,
            best_score = state.best_score(),
            evaluations = state.evaluations(),
            elapsed_ms = state.elapsed().as_millis() as u64,
            "parameter search finished"
        );

        let evaluations = state.evaluations();
        let iterations = state.iterations();
        let elapsed = state.elapsed();
        let (best_config, best_score, history) = state.into_parts();
        Ok(OptimizationOutcome {
            strategy: strategy.name(),
            objective: self.evaluator.objective(),
            initial_score,
            best_score,
            best_config,
            evaluations,
            iterations,
            termination,
            history,
            elapsed,
        })
    }

    fn check_space(&self) -> Result<(), OptimizerError> {
        if self.space.is_empty() {
            return Err(OptimizerError::EmptyParameterSpace);
        }
        match self
            .space
            .bounds()
            .iter()
            .find(|bound| !(bound.min.is_finite() && bound.max.is_finite() && bound.min <= bound.max))
        {
            Some(bound) => Err(OptimizerError::InvalidBound { key: bound.key }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("dataset has no cases")]
    EmptyDataset,
    #[error("case {index} has no finite expected_output")]
    UnlabeledRecord { index: usize },
    #[error("parameter space is empty")]
    EmptyParameterSpace,
    #[error("{variant} configurations cannot be searched directly")]
    NotSearchable { variant: &'static str },
    #[error("grid axis {key} has no values")]
    EmptyGridAxis { key: ParamKey },
    #[error("bounds for {key} must be finite with min <= max")]
    InvalidBound { key: ParamKey },
    #[error("starting configuration is invalid: {0}")]
    InvalidStart(#[source] ModelConfigError),
    #[error(transparent)]
    Parameter(#[from] ModelConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{score_trip, Preset, TripRecord};

    fn dataset(config: &ModelConfig) -> Vec<TripRecord> {
        [
            (1, 120.0, 15.2),
            (2, 260.0, 120.49),
            (3, 450.0, 610.0),
            (5, 900.0, 45.0),
            (7, 300.0, 950.3),
            (9, 1100.0, 1800.0),
        ]
        .into_iter()
        .map(|(days, miles, receipts)| {
            let amount = score_trip(days, miles, receipts, config).expect("trip scores");
            TripRecord::new(days, miles, receipts).labeled(amount)
        })
        .collect()
    }

    fn shifted_base() -> ModelConfig {
        let mut config = Preset::Base.config();
        ParamKey::BasePerDiem
            .set(&mut config, 60.0)
            .expect("base has a per diem");
        config
    }

    #[test]
    fn grid_finds_generating_per_diem() {
        let evaluator = DatasetEvaluator::new(&dataset(&shifted_base()), Objective::MeanAbsoluteError)
            .expect("labeled data");
        let space = ParameterSpace::for_config(&Preset::Base.config()).expect("searchable");
        let strategy = SearchStrategy::Grid(GridSearch::new(vec![GridAxis::new(
            ParamKey::BasePerDiem,
            vec![45.0, 50.0, 55.0, 60.0, 65.0],
        )]));

        let outcome = Optimizer::new(&evaluator, space)
            .run(Preset::Base.config(), &strategy)
            .expect("search runs");

        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.best_score, 0.0);
        assert_eq!(ParamKey::BasePerDiem.get(&outcome.best_config), Some(60.0));
        assert_eq!(outcome.evaluations, 6);
    }

    #[test]
    fn rejects_invalid_start_and_empty_space() {
        let evaluator = DatasetEvaluator::new(&dataset(&Preset::Base.config()), Objective::default())
            .expect("labeled data");

        let mut broken = Preset::Base.config();
        ParamKey::MileageBreakpoint(0)
            .set(&mut broken, 900.0)
            .expect("base has breakpoints");
        let optimizer = Optimizer::new(&evaluator, ParameterSpace::new(Vec::new()));
        assert!(matches!(
            optimizer.run(broken, &SearchStrategy::Coordinate(CoordinateSearch::default())),
            Err(OptimizerError::InvalidStart(_))
        ));
        assert!(matches!(
            optimizer.run(
                Preset::Base.config(),
                &SearchStrategy::Genetic(GeneticSearch::default())
            ),
            Err(OptimizerError::EmptyParameterSpace)
        ));
    }

    #[test]
    fn empty_grid_axis_is_an_error() {
        let evaluator = DatasetEvaluator::new(&dataset(&Preset::Base.config()), Objective::default())
            .expect("labeled data");
        let strategy = SearchStrategy::Grid(GridSearch::new(vec![GridAxis::new(
            ParamKey::LogBonusCoeff,
            Vec::new(),
        )]));
        let result = Optimizer::new(&evaluator, ParameterSpace::new(Vec::new()))
            .run(Preset::Base.config(), &strategy);
        assert!(matches!(
            result,
            Err(OptimizerError::EmptyGridAxis {
                key: ParamKey::LogBonusCoeff
            })
        ));
    }

    #[test]
    fn evaluation_cap_stops_the_search() {
        let evaluator = DatasetEvaluator::new(&dataset(&shifted_base()), Objective::default())
            .expect("labeled data");
        let space = ParameterSpace::for_config(&Preset::Base.config()).expect("searchable");
        let outcome = Optimizer::new(&evaluator, space)
            .with_budget(SearchBudget::unbounded().with_max_evaluations(25))
            .run(
                Preset::Base.config(),
                &SearchStrategy::Genetic(GeneticSearch::default()),
            )
            .expect("search runs");

        assert_eq!(outcome.termination, Termination::EvaluationLimit);
        assert_eq!(outcome.evaluations, 25);
        assert!(outcome.best_score <= outcome.initial_score);
    }

    #[test]
    fn genetic_search_is_reproducible_for_a_seed() {
        let evaluator = DatasetEvaluator::new(&dataset(&shifted_base()), Objective::default())
            .expect("labeled data");
        let space = ParameterSpace::for_config(&Preset::Base.config())
            .expect("searchable")
            .restricted_to(&[ParamKey::BasePerDiem, ParamKey::LogBonusCoeff]);
        let strategy = SearchStrategy::Genetic(GeneticSearch {
            population: 10,
            generations: 5,
            ..GeneticSearch::default()
        });
        let optimizer = Optimizer::new(&evaluator, space);

        let first = optimizer
            .run(Preset::Base.config(), &strategy)
            .expect("search runs");
        let second = optimizer
            .run(Preset::Base.config(), &strategy)
            .expect("search runs");
        assert_eq!(first.best_config, second.best_config);
        assert_eq!(first.evaluations, second.evaluations);
    }
}
