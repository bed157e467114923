//! # Rule search
//!
//! Bounded Metropolis style search over select statements. Each iteration
//! clones the current query, applies one random edit (see
//! [`crate::optimizer::mutation`]) and scores the candidate. A strictly
//! better candidate always replaces the current one; any other candidate
//! replaces it with a fixed probability, so the walk can leave local optima.
//! The best query seen is tracked separately and is what the search returns.
//!
//! ## Termination
//!
//! The loop stops after `iterations` attempts, or earlier when no edit can
//! be made at all (an index without any values to build rules from).

use rand::Rng;
use serde::Serialize;

use crate::compiler::ast::Query;
use crate::data::RecordIndex;
use crate::optimizer::config::{SearchConfig, DEFAULT_ACCEPTANCE_PROBABILITY};
use crate::optimizer::fitness::fitness;
use crate::optimizer::mutation::{mutate, Mutation, TargetValues};

/// What happened in one iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub mutation: String,
    /// Fitness of the candidate produced this iteration
    pub candidate: f64,
    /// Fitness of the current query after the acceptance step
    pub current: f64,
    /// Best fitness seen so far
    pub best: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub best: Query,
    pub best_fitness: f64,
    pub initial_fitness: f64,
    pub trace: Vec<IterationStats>,
    /// True when the search ran out of possible edits before the iteration bound
    pub stopped_early: bool,
}

impl SearchOutcome {
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }

    pub fn improved(&self) -> bool {
        self.best_fitness > self.initial_fitness
    }
}

/// The rule search.
///
/// Stateless apart from its configuration, the index is only borrowed
/// for the duration of [`RuleSearch::run`].
#[derive(Debug, Clone, Default)]
pub struct RuleSearch {
    config: SearchConfig,
}

impl RuleSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search starting from `query`. `observer` sees every iteration as it
    /// completes (progress reporting).
    pub fn run<R, F>(&self, query: &Query, index: &RecordIndex, rng: &mut R, mut observer: F) -> SearchOutcome
    where
        R: Rng + ?Sized,
        F: FnMut(&IterationStats),
    {
        let targets = TargetValues::from_index(index);
        let acceptance = match self.config.validate() {
            Ok(()) => self.config.acceptance_probability,
            Err(e) => {
                log::warn!("{}, using {}", e, DEFAULT_ACCEPTANCE_PROBABILITY);
                DEFAULT_ACCEPTANCE_PROBABILITY
            }
        };

        let initial_fitness = fitness(query, index);
        let mut current = query.clone();
        let mut current_fitness = initial_fitness;
        let mut best = query.clone();
        let mut best_fitness = initial_fitness;
        let mut trace = Vec::with_capacity(self.config.iterations);
        let mut stopped_early = false;

        log::debug!(
            "Starting rule search: iterations={}, fields with values={}, initial fitness={:.4}",
            self.config.iterations,
            targets.fields().count(),
            initial_fitness
        );

        for iteration in 0..self.config.iterations {
            let mut candidate = current.clone();
            let mutation: Mutation = match mutate(&mut candidate, &targets, rng) {
                Some(mutation) => mutation,
                None => {
                    log::debug!("No applicable edit at iteration {}, stopping", iteration);
                    stopped_early = true;
                    break;
                }
            };

            let candidate_fitness = fitness(&candidate, index);
            let accepted = candidate_fitness > current_fitness || rng.gen_bool(acceptance);
            if accepted {
                current = candidate;
                current_fitness = candidate_fitness;
            }
            if current_fitness > best_fitness {
                best = current.clone();
                best_fitness = current_fitness;
                log::debug!("Iteration {}: new best {:.4} after {}", iteration, best_fitness, mutation);
            }

            let stats = IterationStats {
                iteration,
                mutation: mutation.to_string(),
                candidate: candidate_fitness,
                current: current_fitness,
                best: best_fitness,
                accepted,
            };
            observer(&stats);
            trace.push(stats);
        }

        log::info!(
            "Rule search finished after {} iterations: fitness {:.4} -> {:.4}",
            trace.len(),
            initial_fitness,
            best_fitness
        );

        SearchOutcome {
            best,
            best_fitness,
            initial_fitness,
            trace,
            stopped_early,
        }
    }
}

/// Run a default rule search for `iterations` steps and return the best
/// query with its fitness.
pub fn improve<R: Rng + ?Sized>(query: &Query, index: &RecordIndex, iterations: usize, rng: &mut R) -> (Query, f64) {
    let outcome = RuleSearch::new(SearchConfig::with_iterations(iterations)).run(query, index, rng, |_| {});
    (outcome.best, outcome.best_fitness)
}
