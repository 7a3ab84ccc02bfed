//! Solver traits and configuration.

use crate::error::Error;
use crate::ga::{GaConfig, MIN_POPULATION};
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Seed for the optimizer's random number generator.
    pub seed: u32,
    /// Population size (at least 3).
    pub population_size: usize,
    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Number of discrete rotations; step `i` rotates by `i / steps` of a turn.
    pub rotation_steps: usize,
    /// Number of generations after the initial population.
    pub generations: u32,
    /// Outward offset applied to every part before nesting.
    pub spacing: f64,
    /// Number of worker threads per pool (0 = auto).
    pub threads: usize,
    /// Trace part-to-part NFPs with the orbiting algorithm instead of the
    /// Minkowski difference.
    pub explore_edges: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            population_size: 10,
            mutation_rate: 0.1,
            rotation_steps: 4,
            generations: 10,
            spacing: 0.0,
            threads: 0,
            explore_edges: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Sets the number of rotation steps.
    pub fn with_rotation_steps(mut self, steps: usize) -> Self {
        self.rotation_steps = steps;
        self
    }

    /// Sets the number of generations.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the spacing between parts.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enables orbiting NFPs for part pairs.
    pub fn with_explore_edges(mut self, explore: bool) -> Self {
        self.explore_edges = explore;
        self
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < MIN_POPULATION {
            return Err(Error::ConfigError(format!(
                "population_size must be at least {}, got {}",
                MIN_POPULATION, self.population_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(Error::ConfigError(format!(
                "mutation_rate must be within [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if self.rotation_steps == 0 {
            return Err(Error::ConfigError(
                "rotation_steps must be at least 1".into(),
            ));
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(Error::ConfigError(format!(
                "spacing must be finite and non-negative, got {}",
                self.spacing
            )));
        }
        Ok(())
    }

    /// Derives the optimizer configuration.
    pub fn ga_config(&self) -> GaConfig {
        GaConfig::new()
            .with_population_size(self.population_size)
            .with_generations(self.generations)
            .with_mutation_rate(self.mutation_rate)
            .with_rotation_steps(self.rotation_steps)
    }
}

/// Progress event emitted during a run.
///
/// `S` is the snapshot type reported per generation and on completion.
#[derive(Debug, Clone)]
pub enum ProgressEvent<S> {
    /// Fraction of the current generation's evaluations finished.
    Evaluation {
        /// Generation being evaluated.
        generation: u32,
        /// Progress within the generation (0.0 to 1.0).
        progress: f64,
    },
    /// A generation finished; the snapshot describes the incumbent.
    Generation(S),
    /// The run finished; the snapshot describes the final incumbent.
    Completed(S),
}

impl<S> ProgressEvent<S> {
    /// Returns true for the completion event.
    pub fn is_completed(&self) -> bool {
        matches!(self, ProgressEvent::Completed(_))
    }
}

/// Progress callback for long-running operations.
pub type ProgressCallback<S> = Box<dyn Fn(ProgressEvent<S>) + Send + Sync>;

/// Trait for nesting solvers.
pub trait Solver {
    /// Container type.
    type Bin;
    /// Item type.
    type Part;
    /// Snapshot type carried by progress events.
    type Snapshot;
    /// Final result type.
    type Output;

    /// Solves the nesting problem.
    fn solve(&self, bins: &[Self::Bin], parts: &[Self::Part]) -> Result<Self::Output>;

    /// Solves with a progress callback.
    fn solve_with_progress(
        &self,
        bins: &[Self::Bin],
        parts: &[Self::Part],
        callback: ProgressCallback<Self::Snapshot>,
    ) -> Result<Self::Output>;

    /// Cancels an ongoing solve operation.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = Config::new()
            .with_seed(7)
            .with_population_size(5)
            .with_mutation_rate(0.25)
            .with_rotation_steps(8)
            .with_generations(3)
            .with_spacing(1.5)
            .with_threads(2)
            .with_explore_edges(true);

        assert_eq!(config.seed, 7);
        assert_eq!(config.population_size, 5);
        assert_eq!(config.rotation_steps, 8);
        assert_eq!(config.generations, 3);
        assert_eq!(config.threads, 2);
        assert!(config.explore_edges);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_errors() {
        assert!(Config::new().with_population_size(2).validate().is_err());
        assert!(Config::new().with_mutation_rate(1.5).validate().is_err());
        assert!(Config::new().with_mutation_rate(-0.1).validate().is_err());
        assert!(Config::new().with_rotation_steps(0).validate().is_err());
        assert!(Config::new().with_spacing(-1.0).validate().is_err());
        assert!(Config::new().with_spacing(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_ga_config_derivation() {
        let ga = Config::new()
            .with_population_size(12)
            .with_generations(4)
            .with_rotation_steps(2)
            .ga_config();
        assert_eq!(ga.population_size, 12);
        assert_eq!(ga.generations, 4);
        assert_eq!(ga.rotation_steps, 2);
    }

    #[test]
    fn test_progress_event_completed() {
        let event: ProgressEvent<u32> = ProgressEvent::Completed(1);
        assert!(event.is_completed());
        let event: ProgressEvent<u32> = ProgressEvent::Evaluation {
            generation: 0,
            progress: 0.5,
        };
        assert!(!event.is_completed());
    }
}
