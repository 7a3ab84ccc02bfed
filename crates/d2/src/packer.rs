//! Packing orchestration.
//!
//! [`Packer`] sorts the input, applies spacing, and drives the genetic
//! optimizer over [`NestingProblem`]. It owns the shared NFP cache and the
//! stop flag, so one packer handle can stop a run started on another
//! thread through [`Packer::spawn`].
//!
//! ## Example
//!
//! ```rust
//! use orbitnest_d2::{Bin, Config, Packer, Part};
//!
//! let config = Config::new()
//!     .with_rotation_steps(1)
//!     .with_population_size(5)
//!     .with_generations(2);
//! let packer = Packer::new(config);
//!
//! let bins = vec![Bin::new("sheet", 100.0, 100.0)];
//! let parts = vec![
//!     Part::rectangle("a", 10.0, 10.0),
//!     Part::rectangle("b", 10.0, 10.0),
//! ];
//!
//! let result = packer.start(&bins, &parts, None).unwrap();
//! assert!(result.is_complete());
//! ```

use crate::boundary::Bin;
use crate::ga_nesting::NestingProblem;
use crate::geometry::Part;
use crate::nfp::NfpCache;
use crate::placement::PlacementResult;
use crate::polygon::Polygon;
use orbitnest_core::ga::{GaRunner, UNEVALUATED_COST};
use orbitnest_core::{
    Config, Error, Placement, ProgressCallback, ProgressEvent, Result, ShapeId, SolveResult,
    Solver, XorShift,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Result of a packing run.
pub type PackResult = SolveResult;

/// A part materialized at its placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPart {
    /// The bin holding the part.
    pub bin_id: ShapeId,
    /// The part.
    pub part_id: ShapeId,
    /// The source outline, rotated and translated.
    pub polygon: Polygon,
}

/// Rotates and translates the source geometry of every placed part.
///
/// Placements naming an unknown part are skipped.
pub fn apply_placements(placements: &[Placement], parts: &[Part]) -> Vec<PlacedPart> {
    placements
        .iter()
        .filter_map(|placement| {
            let part = parts.iter().find(|p| p.id() == placement.part_id)?;
            let polygon = part
                .polygon()
                .rotate(placement.rotation)
                .translate(placement.x(), placement.y());
            Some(PlacedPart {
                bin_id: placement.bin_id.clone(),
                part_id: placement.part_id.clone(),
                polygon,
            })
        })
        .collect()
}

/// State of the incumbent reported through progress events.
#[derive(Debug, Clone, Default)]
pub struct PackSnapshot {
    /// Generation the snapshot was taken after.
    pub generation: u32,
    /// Incumbent cost.
    pub cost: f64,
    /// Incumbent placements.
    pub placements: Vec<Placement>,
    /// Source outlines at their placements.
    pub placed: Vec<PlacedPart>,
    /// Parts the incumbent could not place.
    pub unplaced: Vec<ShapeId>,
    /// Bins holding at least one part, in packing order.
    pub bins: Vec<ShapeId>,
}

impl PackSnapshot {
    pub(crate) fn from_result(generation: u32, result: &PlacementResult, sources: &[Part]) -> Self {
        let mut bins: Vec<ShapeId> = Vec::new();
        for placement in &result.placements {
            if !bins.contains(&placement.bin_id) {
                bins.push(placement.bin_id.clone());
            }
        }

        Self {
            generation,
            cost: result.cost,
            placements: result.placements.clone(),
            placed: apply_placements(&result.placements, sources),
            unplaced: result.unplaced.clone(),
            bins,
        }
    }
}

/// Irregular-shape packer.
///
/// Clones share the NFP cache and the stop flag.
#[derive(Debug, Clone)]
pub struct Packer {
    config: Config,
    cache: Arc<NfpCache>,
    cancelled: Arc<AtomicBool>,
}

impl Packer {
    /// Creates a new packer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: Arc::new(NfpCache::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared NFP cache.
    pub fn cache(&self) -> &Arc<NfpCache> {
        &self.cache
    }

    /// Returns true once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Stops the running job and discards the NFP cache.
    ///
    /// Outstanding NFP and placement tasks finish without effect; the run
    /// returns the incumbent of the last fully evaluated generation.
    pub fn stop(&self) {
        log::info!("packing stop requested");
        self.cancelled.store(true, Ordering::Relaxed);
        self.cache.clear();
    }

    /// Clears the stop flag and the NFP cache.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
        self.cache.clear();
    }

    /// Runs a packing job on the calling thread.
    ///
    /// Starts from a clean cache. Geometry problems inside the run never
    /// fail it; they surface as unplaced parts. Errors are returned only
    /// for invalid input.
    pub fn start(
        &self,
        bins: &[Bin],
        parts: &[Part],
        progress: Option<ProgressCallback<PackSnapshot>>,
    ) -> Result<PackResult> {
        self.reset();
        self.run(bins, parts, progress)
    }

    /// Runs a packing job on a background thread.
    ///
    /// Progress events arrive on the returned job's channel; the final
    /// result comes from [`PackJob::join`].
    pub fn spawn(&self, bins: Vec<Bin>, parts: Vec<Part>) -> PackJob {
        self.reset();

        let (sender, events) = mpsc::channel();
        let packer = self.clone();
        let handle = std::thread::spawn(move || {
            let callback: ProgressCallback<PackSnapshot> = Box::new(move |event| {
                // a dropped receiver only means nobody is listening
                let _ = sender.send(event);
            });
            packer.run(&bins, &parts, Some(callback))
        });

        PackJob {
            packer: self.clone(),
            events,
            handle,
        }
    }

    fn validate(&self, bins: &[Bin], parts: &[Part]) -> Result<()> {
        self.config.validate()?;

        if bins.is_empty() {
            return Err(Error::InvalidBoundary("At least one bin is required".into()));
        }
        for bin in bins {
            bin.validate()?;
        }

        let mut ids = HashSet::new();
        for part in parts {
            part.validate()?;
            if !ids.insert(part.id()) {
                return Err(Error::InvalidGeometry(format!(
                    "Duplicate part id '{}'",
                    part.id()
                )));
            }
        }

        Ok(())
    }

    fn run(
        &self,
        bins: &[Bin],
        parts: &[Part],
        progress: Option<ProgressCallback<PackSnapshot>>,
    ) -> Result<PackResult> {
        self.validate(bins, parts)?;
        let start = Instant::now();

        let mut bins = bins.to_vec();
        bins.sort_by(|a, b| b.area().total_cmp(&a.area()));
        let mut sources = parts.to_vec();
        sources.sort_by(|a, b| b.area().total_cmp(&a.area()));

        let nested = if self.config.spacing > 0.0 {
            sources
                .iter()
                .map(|part| {
                    let outline = part.polygon().inflate(self.config.spacing)?;
                    Ok(part.clone().with_outline(outline))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            sources.clone()
        };

        log::info!(
            "packing {} parts into {} bins (population {}, generations {}, rotations {})",
            sources.len(),
            bins.len(),
            self.config.population_size,
            self.config.generations,
            self.config.rotation_steps
        );

        let mut problem = NestingProblem::new(
            bins,
            nested,
            sources,
            &self.config,
            Arc::clone(&self.cache),
            Arc::clone(&self.cancelled),
        )?;
        if let Some(callback) = progress {
            problem = problem.with_progress(callback);
        }

        let runner =
            GaRunner::with_cancel_flag(self.config.ga_config(), problem, Arc::clone(&self.cancelled));
        let mut rng = XorShift::new(self.config.seed);
        let ga_result = runner.run_with_rng(&mut rng);
        let problem = runner.problem();

        let mut result = PackResult::new();
        result.generations = ga_result.generations;
        result.cost_history = ga_result.history;
        result.cancelled = ga_result.cancelled;

        let snapshot = match ga_result.best.as_ref().and_then(|dna| dna.payload.as_ref()) {
            Some(best) => {
                result.placements = best.placements.clone();
                result.unplaced = best.unplaced.clone();
                result.cost = best.cost;
                PackSnapshot::from_result(ga_result.generations.saturating_sub(1), best, problem.sources())
            }
            None => {
                result.unplaced = problem.sources().iter().map(|p| p.id().to_string()).collect();
                result.cost = UNEVALUATED_COST;
                PackSnapshot {
                    cost: UNEVALUATED_COST,
                    unplaced: result.unplaced.clone(),
                    ..PackSnapshot::default()
                }
            }
        };
        result.computation_time_ms = start.elapsed().as_millis() as u64;

        if result.cancelled {
            log::info!("packing cancelled after {} generations", result.generations);
        } else {
            log::info!(
                "packing finished: cost={:.4}, placed={}, unplaced={}, {} ms",
                result.cost,
                result.placed_count(),
                result.unplaced_count(),
                result.computation_time_ms
            );
        }

        problem.notify(ProgressEvent::Completed(snapshot));
        self.cache.clear();

        Ok(result)
    }
}

impl Solver for Packer {
    type Bin = Bin;
    type Part = Part;
    type Snapshot = PackSnapshot;
    type Output = PackResult;

    fn solve(&self, bins: &[Bin], parts: &[Part]) -> Result<PackResult> {
        self.start(bins, parts, None)
    }

    fn solve_with_progress(
        &self,
        bins: &[Bin],
        parts: &[Part],
        callback: ProgressCallback<PackSnapshot>,
    ) -> Result<PackResult> {
        self.start(bins, parts, Some(callback))
    }

    fn cancel(&self) {
        self.stop();
    }
}

/// A packing job running on a background thread.
pub struct PackJob {
    packer: Packer,
    events: Receiver<ProgressEvent<PackSnapshot>>,
    handle: JoinHandle<Result<PackResult>>,
}

impl PackJob {
    /// Progress events; the channel closes when the job ends.
    pub fn events(&self) -> &Receiver<ProgressEvent<PackSnapshot>> {
        &self.events
    }

    /// Requests the job to stop.
    pub fn stop(&self) {
        self.packer.stop();
    }

    /// Returns true if the job has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the job and returns its result.
    pub fn join(self) -> Result<PackResult> {
        self.handle
            .join()
            .map_err(|_| Error::Internal("Packing thread panicked".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Mutex;

    fn config() -> Config {
        Config::new()
            .with_rotation_steps(1)
            .with_population_size(5)
            .with_generations(3)
            .with_threads(2)
    }

    fn squares() -> (Vec<Bin>, Vec<Part>) {
        (
            vec![Bin::new("sheet", 100.0, 100.0)],
            vec![Part::rectangle("a", 10.0, 10.0), Part::rectangle("b", 10.0, 10.0)],
        )
    }

    #[test]
    fn test_apply_placements_rotates_then_translates() {
        let parts = vec![Part::rectangle("r", 4.0, 2.0)];
        let placements = vec![Placement::new("sheet", "r", 10.0, 0.0, FRAC_PI_2)];
        let placed = apply_placements(&placements, &parts);

        assert_eq!(placed.len(), 1);
        let bounds = placed[0].polygon.bounds();
        assert_relative_eq!(bounds.min.x, 8.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_placements_skips_unknown() {
        let placements = vec![Placement::new("sheet", "ghost", 0.0, 0.0, 0.0)];
        assert!(apply_placements(&placements, &[]).is_empty());
    }

    #[test]
    fn test_start_places_squares() {
        let (bins, parts) = squares();
        let packer = Packer::new(config());
        let result = packer.start(&bins, &parts, None).unwrap();

        assert!(result.is_complete());
        assert_eq!(result.placed_count(), 2);
        assert!(result.cost < 2.0);
        assert_eq!(result.generations, 4);
        assert_eq!(result.bins_used(), vec!["sheet"]);
        assert!(packer.cache().is_empty());
    }

    #[test]
    fn test_progress_events_order() {
        let (bins, parts) = squares();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let packer = Packer::new(config());
        packer
            .start(
                &bins,
                &parts,
                Some(Box::new(move |event| {
                    let tag = match event {
                        ProgressEvent::Evaluation { .. } => 'e',
                        ProgressEvent::Generation(_) => 'g',
                        ProgressEvent::Completed(_) => 'c',
                    };
                    sink.lock().unwrap().push(tag);
                })),
            )
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.last(), Some(&'c'));
        assert_eq!(events.iter().filter(|&&t| t == 'g').count(), 3);
        assert_eq!(events.iter().filter(|&&t| t == 'e').count(), 20);
    }

    #[test]
    fn test_spacing_reports_source_geometry() {
        let bins = vec![Bin::new("sheet", 50.0, 50.0)];
        let parts = vec![Part::rectangle("a", 10.0, 10.0)];
        let packer = Packer::new(config().with_spacing(2.0));
        let result = packer.start(&bins, &parts, None).unwrap();

        // the inflated outline sits at the bin edge, the source 2 units in
        let placement = result.placement_of("a").unwrap();
        assert_relative_eq!(placement.x(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(placement.y(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_input() {
        let packer = Packer::new(config());
        let parts = vec![Part::rectangle("a", 1.0, 1.0)];
        assert!(matches!(packer.start(&[], &parts, None), Err(Error::InvalidBoundary(_))));

        let bins = vec![Bin::new("sheet", 10.0, 10.0)];
        let dupes = vec![Part::rectangle("a", 1.0, 1.0), Part::rectangle("a", 2.0, 2.0)];
        assert!(matches!(packer.start(&bins, &dupes, None), Err(Error::InvalidGeometry(_))));

        let bad = Packer::new(config().with_population_size(2));
        assert!(matches!(bad.start(&bins, &parts, None), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_spawn_streams_events() {
        let (bins, parts) = squares();
        let packer = Packer::new(config());
        let job = packer.spawn(bins, parts);

        let completed = job.events().iter().filter(ProgressEvent::is_completed).count();
        assert_eq!(completed, 1);

        let result = job.join().unwrap();
        assert!(!result.cancelled);
        assert!(result.is_complete());
    }

    #[test]
    fn test_stop_spawned_job() {
        let (bins, parts) = squares();
        let packer = Packer::new(config());
        let job = packer.spawn(bins, parts);
        job.stop();

        let result = job.join().unwrap();
        // stopped either before or after the first generation
        assert!(result.cancelled || result.generations == 4);
        assert!(packer.is_stopped());
    }
}
