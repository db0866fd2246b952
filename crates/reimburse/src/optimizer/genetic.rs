use super::evaluation::FitnessEvaluator;
use super::space::ParameterSpace;
use super::state::{OptimizerState, SearchBudget, Termination};
use super::OptimizerError;
use crate::model::ModelConfig;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

const MAX_MUTATION_SCALE: f64 = 0.5;
const MUTATION_GROWTH: f64 = 1.5;

/// Generational genetic algorithm over the real-valued parameter vector.
///
/// Selection is by tournament, crossover blends each gene between two
/// parents, and mutation shifts genes by up to `mutation_scale` of their
/// bound width. The mutation scale grows while generations stall and resets
/// on improvement. A fixed `seed` makes runs reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneticSearch {
    pub population: usize,
    pub generations: usize,
    pub tournament: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub mutation_scale: f64,
    pub elitism: usize,
    pub seed: u64,
}

impl Default for GeneticSearch {
    fn default() -> Self {
        Self {
            population: 40,
            generations: 60,
            tournament: 3,
            crossover_rate: 0.9,
            mutation_rate: 0.2,
            mutation_scale: 0.1,
            elitism: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Individual {
    genes: Vec<f64>,
    score: f64,
}

impl GeneticSearch {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn search<E: FitnessEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        space: &ParameterSpace,
        budget: &SearchBudget,
        state: &mut OptimizerState,
    ) -> Result<Termination, OptimizerError> {
        let population_size = self.population.max(2);
        let elitism = self.elitism.min(population_size - 1);
        let template = state.best_config().clone();
        let mut rng = SmallRng::seed_from_u64(self.seed);

        let seed_genes = space
            .bounds()
            .iter()
            .map(|bound| {
                bound
                    .key
                    .get(&template)
                    .map(|value| bound.clamp(value))
                    .unwrap_or(bound.min)
            })
            .collect::<Vec<_>>();

        info!(
            population = population_size,
            generations = self.generations,
            genes = seed_genes.len(),
            seed = self.seed,
            "genetic search"
        );

        let mut population = Vec::with_capacity(population_size);
        population.push(Individual {
            genes: seed_genes,
            score: state.best_score(),
        });
        while population.len() < population_size {
            let genes = space
                .bounds()
                .iter()
                .map(|bound| rng.random_range(bound.min..=bound.max))
                .collect();
            let (individual, termination) =
                self.evaluate(genes, &template, space, evaluator, budget, state)?;
            population.push(individual);
            if let Some(termination) = termination {
                return Ok(termination);
            }
        }

        let mut mutation_scale = self.mutation_scale;
        for generation in 1..=self.generations {
            population.sort_by(by_score);
            let generation_start = state.best_score();

            let mut next: Vec<Individual> = population.iter().take(elitism).cloned().collect();
            while next.len() < population_size {
                let first = self.select(&population, &mut rng);
                let second = self.select(&population, &mut rng);
                let mut genes = if rng.random_bool(self.crossover_rate.clamp(0.0, 1.0)) {
                    crossover(&first.genes, &second.genes, &mut rng)
                } else {
                    first.genes.clone()
                };
                self.mutate(&mut genes, space, mutation_scale, &mut rng);

                let (child, termination) =
                    self.evaluate(genes, &template, space, evaluator, budget, state)?;
                next.push(child);
                if let Some(termination) = termination {
                    return Ok(termination);
                }
            }
            population = next;
            state.next_iteration();

            if state.best_score() < generation_start {
                mutation_scale = self.mutation_scale;
            } else {
                mutation_scale = (mutation_scale * MUTATION_GROWTH).min(MAX_MUTATION_SCALE);
            }
            debug!(
                generation,
                best = state.best_score(),
                mutation_scale,
                "generation finished"
            );
        }

        Ok(Termination::Completed)
    }

    fn evaluate<E: FitnessEvaluator + ?Sized>(
        &self,
        genes: Vec<f64>,
        template: &ModelConfig,
        space: &ParameterSpace,
        evaluator: &E,
        budget: &SearchBudget,
        state: &mut OptimizerState,
    ) -> Result<(Individual, Option<Termination>), OptimizerError> {
        let config = decode(&genes, template, space)?;
        let score = evaluator.score(&config);
        state.observe(&config, score);
        Ok((Individual { genes, score }, state.exhausted(budget)))
    }

    fn select<'a>(&self, population: &'a [Individual], rng: &mut SmallRng) -> &'a Individual {
        let rounds = self.tournament.max(1);
        let mut best = &population[rng.random_range(0..population.len())];
        for _ in 1..rounds {
            let challenger = &population[rng.random_range(0..population.len())];
            if challenger.score < best.score {
                best = challenger;
            }
        }
        best
    }

    fn mutate(&self, genes: &mut [f64], space: &ParameterSpace, scale: f64, rng: &mut SmallRng) {
        let rate = self.mutation_rate.clamp(0.0, 1.0);
        for (gene, bound) in genes.iter_mut().zip(space.bounds()) {
            if rng.random_bool(rate) {
                let shift = rng.random_range(-1.0..=1.0) * scale * bound.width();
                *gene = bound.clamp(*gene + shift);
            }
        }
    }
}

fn by_score(left: &Individual, right: &Individual) -> Ordering {
    left.score.partial_cmp(&right.score).unwrap_or(Ordering::Equal)
}

fn crossover(first: &[f64], second: &[f64], rng: &mut SmallRng) -> Vec<f64> {
    first
        .iter()
        .zip(second)
        .map(|(a, b)| {
            let weight: f64 = rng.random();
            a * weight + b * (1.0 - weight)
        })
        .collect()
}

fn decode(
    genes: &[f64],
    template: &ModelConfig,
    space: &ParameterSpace,
) -> Result<ModelConfig, OptimizerError> {
    let mut config = template.clone();
    for (gene, bound) in genes.iter().zip(space.bounds()) {
        bound.key.set(&mut config, *gene)?;
    }
    Ok(config)
}
