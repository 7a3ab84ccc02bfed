//! # orbitnest core
//!
//! Core types and abstractions shared by the orbitnest nesting engine.
//!
//! ## Core Components
//!
//! - **Errors**: [`Error`] and the [`Result`] alias
//! - **Random numbers**: [`XorShift`], a seedable generator, and [`gaussian`]
//! - **GA framework**: [`Dna`], [`Population`], [`GaProblem`], [`GaRunner`]
//! - **Solver surface**: [`Config`], [`ProgressEvent`], [`Solver`]
//! - **Results**: [`Placement`], [`SolveResult`]
//!
//! ## Genetic optimizer
//!
//! | Step | Rule |
//! |------|------|
//! | Initialization | genes uniform in `[0, steps)` |
//! | Selection | each candidate copied `floor((1 - normalized cost) * 50)` times |
//! | Crossover | single cut; genes at or before the cut from the second parent |
//! | Mutation | per gene, Gaussian delta scaled by `steps`, wrapped |
//! | Incumbent | replaced only by a strictly cheaper candidate |
//!
//! ## Configuration
//!
//! ```rust
//! use orbitnest_core::Config;
//!
//! let config = Config::new()
//!     .with_seed(42)
//!     .with_population_size(10)
//!     .with_rotation_steps(4)
//!     .with_spacing(2.0);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod ga;
pub mod placement;
pub mod result;
pub mod rng;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{Dna, GaConfig, GaProblem, GaProgress, GaResult, GaRunner, Population};
pub use placement::{Placement, ShapeId};
pub use result::SolveResult;
pub use rng::{gaussian, XorShift};
pub use solver::{Config, ProgressCallback, ProgressEvent, Solver};
