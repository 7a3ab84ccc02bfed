//! # orbitnest 2D
//!
//! Irregular 2D polygon nesting for the orbitnest engine.
//!
//! Parts (arbitrary simple polygons) are packed into rectangular bins.
//! A genetic optimizer searches the rotation of every part; each
//! candidate is decoded by a greedy placement driven by No-Fit Polygons
//! (NFPs) that are computed once per shape pair and shared across
//! generations.
//!
//! ## Features
//!
//! - Tolerance-aware geometry kernel with tri-state containment
//! - NFP engine: rectangle fast path, orbiting, Minkowski difference
//! - Thread-safe NFP cache computing each shape pair once
//! - Bounding-box-compacting placement over free NFP regions
//! - Spacing via outward polygon offsetting
//! - Cancellable runs with progress events, on the calling thread or in
//!   the background
//!
//! ## Quick Start
//!
//! ```rust
//! use orbitnest_d2::{Bin, Config, Packer, Part, Solver};
//!
//! let bins = vec![Bin::new("sheet", 500.0, 300.0)];
//! let parts = vec![
//!     Part::rectangle("panel", 100.0, 50.0),
//!     Part::l_shape("bracket", 80.0, 60.0, 30.0, 30.0),
//!     Part::new("wedge").with_polygon(vec![(0.0, 0.0), (60.0, 0.0), (30.0, 40.0)]),
//! ];
//!
//! let config = Config::new()
//!     .with_rotation_steps(4)
//!     .with_population_size(6)
//!     .with_generations(2)
//!     .with_spacing(2.0);
//!
//! let result = Packer::new(config).solve(&bins, &parts).unwrap();
//! println!(
//!     "placed {} of {} parts, cost {:.3}",
//!     result.placed_count(),
//!     parts.len(),
//!     result.cost
//! );
//! ```
//!
//! ## Background runs
//!
//! ```rust
//! use orbitnest_d2::{Bin, Config, Packer, Part, ProgressEvent};
//!
//! let packer = Packer::new(Config::new().with_generations(1).with_population_size(3));
//! let job = packer.spawn(
//!     vec![Bin::new("sheet", 50.0, 50.0)],
//!     vec![Part::rectangle("a", 10.0, 10.0)],
//! );
//!
//! for event in job.events() {
//!     if let ProgressEvent::Generation(snapshot) = event {
//!         println!("generation {}: cost {:.3}", snapshot.generation, snapshot.cost);
//!     }
//! }
//! let result = job.join().unwrap();
//! assert!(result.is_complete());
//! ```

pub mod boundary;
pub mod clip;
pub mod ga_nesting;
pub mod geometry;
pub mod nfp;
pub mod nfp_sliding;
pub mod packer;
pub mod placement;
pub mod polygon;
pub mod predicates;

// Re-exports
pub use boundary::Bin;
pub use ga_nesting::NestingProblem;
pub use geometry::{Part, ShapeKey, ShapeKind};
pub use nfp::{compute_nfp, Nfp, NfpCache, NfpKey};
pub use nfp_sliding::compute_nfp_orbiting;
pub use packer::{apply_placements, PackJob, PackResult, PackSnapshot, Packer, PlacedPart};
pub use placement::{place, PlacementResult};
pub use polygon::{BoundingBox, Point, Polygon};
pub use predicates::{point_in_polygon, polygons_intersect, Containment};
pub use orbitnest_core::{Config, Error, Placement, ProgressEvent, Result, Solver};
