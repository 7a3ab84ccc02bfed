//! Genetic algorithm framework for rotation search.
//!
//! A candidate ([`Dna`]) holds one rotation-step gene per part. The
//! problem ([`GaProblem`]) assigns each candidate a cost, lower being
//! better, and the runner ([`GaRunner`]) drives generations of
//! fitness-proportional selection, single-point crossover and Gaussian
//! mutation while keeping the best-ever candidate (the incumbent) apart
//! from the population.
//!
//! # Example
//!
//! ```rust
//! use orbitnest_core::ga::{Dna, GaConfig, GaProblem, GaRunner};
//! use orbitnest_core::rng::XorShift;
//!
//! struct SumOfGenes;
//!
//! impl GaProblem for SumOfGenes {
//!     type Payload = ();
//!
//!     fn gene_count(&self) -> usize {
//!         4
//!     }
//!
//!     fn evaluate(&self, dna: &mut Dna<()>) {
//!         let cost = dna.genes.iter().sum::<usize>() as f64;
//!         dna.evaluate(cost, ());
//!     }
//! }
//!
//! let config = GaConfig::new().with_population_size(8).with_generations(5);
//! let runner = GaRunner::new(config, SumOfGenes);
//! let result = runner.run_with_rng(&mut XorShift::new(1));
//! assert!(result.best.is_some());
//! ```

use crate::rng::gaussian;
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cost assigned to a candidate that has not been evaluated (or failed).
pub const UNEVALUATED_COST: f64 = 1e5;

/// Copies of the fittest candidate placed in the selection pool.
const SELECTION_WEIGHT: f64 = 50.0;

/// Smallest allowed population.
pub const MIN_POPULATION: usize = 3;

/// Configuration for the genetic algorithm.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size (at least 3).
    pub population_size: usize,
    /// Number of reproduction steps; `generations + 1` populations are evaluated.
    pub generations: u32,
    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Number of discrete rotation steps a gene may take.
    pub rotation_steps: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            generations: 10,
            mutation_rate: 0.1,
            rotation_steps: 4,
        }
    }
}

impl GaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(MIN_POPULATION);
        self
    }

    /// Sets the number of generations.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the number of rotation steps.
    pub fn with_rotation_steps(mut self, steps: usize) -> Self {
        self.rotation_steps = steps.max(1);
        self
    }
}

/// A candidate solution: one rotation-step gene per part.
#[derive(Debug)]
pub struct Dna<P> {
    /// Rotation-step index per part, each in `[0, steps)`.
    pub genes: Vec<usize>,
    /// Cost of the last evaluation (lower is better).
    pub cost: f64,
    /// Result attached by the last evaluation.
    pub payload: Option<Arc<P>>,
}

impl<P> Clone for Dna<P> {
    fn clone(&self) -> Self {
        Self {
            genes: self.genes.clone(),
            cost: self.cost,
            payload: self.payload.clone(),
        }
    }
}

impl<P> Dna<P> {
    /// Creates an unevaluated candidate from genes.
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            cost: UNEVALUATED_COST,
            payload: None,
        }
    }

    /// Creates a candidate with genes drawn uniformly from `[0, steps)`.
    pub fn random<R: Rng + ?Sized>(len: usize, steps: usize, rng: &mut R) -> Self {
        let steps = steps.max(1);
        let genes = (0..len)
            .map(|_| (rng.gen::<f64>() * steps as f64).floor() as usize % steps)
            .collect();
        Self::new(genes)
    }

    /// Records the cost and payload of an evaluation.
    pub fn evaluate(&mut self, cost: f64, payload: P) {
        self.cost = cost;
        self.payload = Some(Arc::new(payload));
    }

    /// Returns true once a payload has been attached.
    pub fn is_evaluated(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns the number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns true if the candidate has no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Single-point crossover.
    ///
    /// Genes at or before the cut index come from `partner`, genes after it
    /// from `self`.
    pub fn crossover<R: Rng + ?Sized>(&self, partner: &Self, rng: &mut R) -> Self {
        let cut = (rng.gen::<f64>() * self.genes.len() as f64).floor() as usize;
        let genes = self
            .genes
            .iter()
            .zip(&partner.genes)
            .enumerate()
            .map(|(i, (&own, &other))| if i > cut { own } else { other })
            .collect();
        Self::new(genes)
    }

    /// Gaussian mutation.
    ///
    /// Each gene mutates with probability `rate`: a standard normal delta
    /// scaled by `steps` is added, floored and wrapped into `[0, steps)`.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, rate: f64, steps: usize) -> Self {
        let steps = steps.max(1) as i64;
        let genes = self
            .genes
            .iter()
            .map(|&gene| {
                if rng.gen::<f64>() <= rate {
                    let delta = gaussian(rng, 0.0, 1.0) * steps as f64;
                    let shifted = (gene as f64 + delta).floor() as i64;
                    shifted.rem_euclid(steps) as usize
                } else {
                    gene
                }
            })
            .collect();
        Self::new(genes)
    }
}

/// A fixed-size population of candidates.
#[derive(Debug, Clone)]
pub struct Population<P> {
    members: Vec<Dna<P>>,
    rotation_steps: usize,
    mutation_rate: f64,
    generation: u32,
}

impl<P> Population<P> {
    /// Creates a random population of `size.max(3)` candidates.
    pub fn random<R: Rng + ?Sized>(
        size: usize,
        gene_count: usize,
        rotation_steps: usize,
        mutation_rate: f64,
        rng: &mut R,
    ) -> Self {
        let members = (0..size.max(MIN_POPULATION))
            .map(|_| Dna::random(gene_count, rotation_steps, rng))
            .collect();
        Self::from_members(members, rotation_steps, mutation_rate)
    }

    /// Wraps existing candidates.
    pub fn from_members(members: Vec<Dna<P>>, rotation_steps: usize, mutation_rate: f64) -> Self {
        Self {
            members,
            rotation_steps: rotation_steps.max(1),
            mutation_rate: mutation_rate.clamp(0.0, 1.0),
            generation: 0,
        }
    }

    /// Returns the candidates.
    pub fn members(&self) -> &[Dna<P>] {
        &self.members
    }

    /// Returns the candidates mutably (for evaluation).
    pub fn members_mut(&mut self) -> &mut [Dna<P>] {
        &mut self.members
    }

    /// Returns the number of candidates.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the population is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the number of reproduction steps taken.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the lowest-cost candidate; the first one wins ties.
    pub fn dominant(&self) -> Option<&Dna<P>> {
        self.members.iter().fold(None, |best: Option<&Dna<P>>, dna| match best {
            Some(b) if b.cost <= dna.cost => Some(b),
            _ => Some(dna),
        })
    }

    /// Returns the minimum and maximum cost.
    pub fn cost_range(&self) -> (f64, f64) {
        self.members
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), dna| {
                (min.min(dna.cost), max.max(dna.cost))
            })
    }

    /// Builds the fitness-proportional selection pool (indices into the members).
    ///
    /// Each candidate appears `floor((1 - normalized cost) * 50)` times. An
    /// empty pool (uniform costs) falls back to the whole population.
    pub fn selection_pool(&self) -> Vec<usize> {
        let (min, max) = self.cost_range();
        let span = max - min;
        let mut pool = Vec::new();

        if span > 0.0 && span.is_finite() {
            for (index, dna) in self.members.iter().enumerate() {
                let fitness = 1.0 - (dna.cost - min) / span;
                let copies = (fitness * SELECTION_WEIGHT).floor().max(0.0) as usize;
                pool.extend(std::iter::repeat(index).take(copies));
            }
        }

        if pool.is_empty() {
            pool = (0..self.members.len()).collect();
        }
        pool
    }

    /// Replaces every candidate with a mutated crossover child of two pool draws.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.generation += 1;
        if self.members.is_empty() {
            return;
        }

        let pool = self.selection_pool();
        let children: Vec<Dna<P>> = (0..self.members.len())
            .map(|_| {
                let mon = &self.members[pool[rng.gen_range(0..pool.len())]];
                let dad = &self.members[pool[rng.gen_range(0..pool.len())]];
                mon.crossover(dad, rng)
                    .mutate(rng, self.mutation_rate, self.rotation_steps)
            })
            .collect();

        self.members = children;
    }
}

/// Trait for problem-specific GA operations.
pub trait GaProblem: Send + Sync {
    /// Result attached to an evaluated candidate.
    type Payload: Send + Sync;

    /// Number of genes per candidate.
    fn gene_count(&self) -> usize;

    /// Evaluates one candidate, setting its cost and payload.
    fn evaluate(&self, dna: &mut Dna<Self::Payload>);

    /// Evaluates a whole population.
    /// Default implementation uses rayon for parallel evaluation.
    fn evaluate_population(&self, _generation: u32, population: &mut [Dna<Self::Payload>]) {
        population.par_iter_mut().for_each(|dna| {
            self.evaluate(dna);
        });
    }

    /// Called after each evaluated generation (for progress reporting).
    fn on_generation(
        &self,
        _generation: u32,
        _incumbent: &Dna<Self::Payload>,
        _population: &[Dna<Self::Payload>],
    ) {
        // Default: do nothing
    }
}

/// Progress information during GA execution.
#[derive(Debug, Clone)]
pub struct GaProgress {
    /// Generation just evaluated.
    pub generation: u32,
    /// Configured number of generations.
    pub generations: u32,
    /// Incumbent cost.
    pub best_cost: f64,
    /// Average cost of the evaluated population.
    pub avg_cost: f64,
    /// Elapsed time since start.
    pub elapsed: Duration,
    /// Whether more generations follow.
    pub running: bool,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<P> {
    /// The incumbent, if at least one population was evaluated.
    pub best: Option<Dna<P>>,
    /// Number of populations evaluated.
    pub generations: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Incumbent cost after each evaluated population.
    pub history: Vec<f64>,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

/// Genetic algorithm runner.
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    cancelled: Arc<AtomicBool>,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a new GA runner.
    pub fn new(config: GaConfig, problem: P) -> Self {
        Self::with_cancel_flag(config, problem, Arc::new(AtomicBool::new(false)))
    }

    /// Creates a runner observing an existing cancellation flag.
    pub fn with_cancel_flag(config: GaConfig, problem: P, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            config,
            problem,
            cancelled,
        }
    }

    /// Returns a handle to cancel the algorithm.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Returns the problem being optimized.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs the genetic algorithm with a specific RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> GaResult<P::Payload> {
        self.run_with_rng_and_progress::<R, fn(GaProgress)>(rng, None)
    }

    /// Runs the genetic algorithm with a specific RNG and optional progress callback.
    ///
    /// Evaluates `generations + 1` populations. After each evaluation the
    /// incumbent is replaced only by a strictly cheaper candidate, so its
    /// cost never increases.
    pub fn run_with_rng_and_progress<R: Rng, F>(
        &self,
        rng: &mut R,
        progress_callback: Option<F>,
    ) -> GaResult<P::Payload>
    where
        F: Fn(GaProgress),
    {
        let start = Instant::now();
        let mut history = Vec::new();
        let mut incumbent: Option<Dna<P::Payload>> = None;
        let mut evaluated = 0u32;
        let mut cancelled = false;

        let mut population = Population::random(
            self.config.population_size,
            self.problem.gene_count(),
            self.config.rotation_steps,
            self.config.mutation_rate,
            rng,
        );

        for generation in 0..=self.config.generations {
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            self.problem
                .evaluate_population(generation, population.members_mut());

            // A population interrupted mid-evaluation is not trusted.
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            evaluated = generation + 1;

            if let Some(candidate) = population.dominant() {
                let improves = incumbent
                    .as_ref()
                    .map_or(true, |best| candidate.cost < best.cost);
                if improves {
                    incumbent = Some(candidate.clone());
                }
            }

            let Some(best) = incumbent.as_ref() else {
                break;
            };
            history.push(best.cost);

            self.problem
                .on_generation(generation, best, population.members());

            if let Some(ref callback) = progress_callback {
                let avg_cost = population.members().iter().map(|d| d.cost).sum::<f64>()
                    / population.len().max(1) as f64;

                callback(GaProgress {
                    generation,
                    generations: self.config.generations,
                    best_cost: best.cost,
                    avg_cost,
                    elapsed: start.elapsed(),
                    running: generation < self.config.generations,
                });
            }

            if generation < self.config.generations {
                population.step(rng);
            }
        }

        if cancelled {
            log::debug!("GA cancelled after {} evaluated generations", evaluated);
        }

        GaResult {
            best: incumbent,
            generations: evaluated,
            elapsed: start.elapsed(),
            history,
            cancelled,
        }
    }
}
