//! Genetic Algorithm based 2D nesting optimization.
//!
//! A chromosome holds one rotation step per part (parts in descending area
//! order). Decoding rotates every part by its gene and runs the greedy
//! NFP placement; the placement cost is the fitness to minimize.
//!
//! Each population is evaluated in two phases: all NFPs the population
//! needs are resolved into the shared cache on the NFP pool, then the
//! placements run on the placement pool. Placement never waits for an NFP,
//! so the first phase must be complete before the second starts.

use crate::boundary::Bin;
use crate::geometry::{Part, ShapeKind};
use crate::nfp::{compute_nfp, NfpCache, NfpKey};
use crate::packer::PackSnapshot;
use crate::placement::{place, PlacementResult};
use crate::polygon::Polygon;
use orbitnest_core::ga::{Dna, GaProblem};
use orbitnest_core::{Config, Error, ProgressCallback, ProgressEvent, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Inputs of one pending NFP computation.
#[derive(Debug, Clone)]
struct NfpRequest {
    a: Polygon,
    a_kind: ShapeKind,
    b: Polygon,
    inside: bool,
}

/// Problem definition for GA-based 2D nesting.
pub struct NestingProblem {
    /// Bins in packing order.
    bins: Vec<Bin>,
    /// Parts as nested (spacing applied), in gene order.
    parts: Vec<Part>,
    /// Parts as supplied, in gene order; used for snapshots.
    sources: Vec<Part>,
    rotation_steps: usize,
    generations: u32,
    explore_edges: bool,
    cache: Arc<NfpCache>,
    nfp_pool: ThreadPool,
    placement_pool: ThreadPool,
    cancelled: Arc<AtomicBool>,
    progress: Option<ProgressCallback<PackSnapshot>>,
}

impl NestingProblem {
    /// Creates a new nesting problem.
    ///
    /// `parts` and `sources` must be index-aligned; `parts` may carry
    /// inflated outlines. Fails if a worker pool cannot be built.
    pub fn new(
        bins: Vec<Bin>,
        parts: Vec<Part>,
        sources: Vec<Part>,
        config: &Config,
        cache: Arc<NfpCache>,
        cancelled: Arc<AtomicBool>,
    ) -> Result<Self> {
        if parts.len() != sources.len() {
            return Err(Error::Internal(format!(
                "{} nested parts for {} source parts",
                parts.len(),
                sources.len()
            )));
        }

        Ok(Self {
            bins,
            parts,
            sources,
            rotation_steps: config.rotation_steps.max(1),
            generations: config.generations,
            explore_edges: config.explore_edges,
            cache,
            nfp_pool: build_pool("orbitnest-nfp", config.threads)?,
            placement_pool: build_pool("orbitnest-place", config.threads)?,
            cancelled,
            progress: None,
        })
    }

    /// Sets the progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback<PackSnapshot>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Returns the source parts in gene order.
    pub fn sources(&self) -> &[Part] {
        &self.sources
    }

    /// Returns the bins in packing order.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Forwards an event to the progress callback, if any.
    pub fn notify(&self, event: ProgressEvent<PackSnapshot>) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Parts rotated according to `genes`.
    pub fn decode(&self, genes: &[usize]) -> Vec<Part> {
        self.parts
            .iter()
            .zip(genes)
            .map(|(part, &gene)| part.transform(gene, self.rotation_steps))
            .collect()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Adds every NFP `parts` needs that is not cached yet.
    fn collect_requests(&self, parts: &[Part], requests: &mut HashMap<NfpKey, NfpRequest>) {
        let shapes: Vec<Polygon> = parts.iter().map(Part::shape).collect();

        for bin in &self.bins {
            for (part, shape) in parts.iter().zip(&shapes) {
                let key = NfpKey::new(bin.key(), part.key(), true);
                if requests.contains_key(&key) || self.cache.contains(&key) {
                    continue;
                }
                requests.insert(
                    key,
                    NfpRequest {
                        a: bin.polygon().clone(),
                        a_kind: ShapeKind::Bin,
                        b: shape.clone(),
                        inside: true,
                    },
                );
            }
        }

        for (i, (a, a_shape)) in parts.iter().zip(&shapes).enumerate() {
            for (j, (b, b_shape)) in parts.iter().zip(&shapes).enumerate() {
                if i == j {
                    continue;
                }
                let key = NfpKey::new(a.key(), b.key(), false);
                if requests.contains_key(&key) || self.cache.contains(&key) {
                    continue;
                }
                requests.insert(
                    key,
                    NfpRequest {
                        a: a_shape.clone(),
                        a_kind: ShapeKind::Part,
                        b: b_shape.clone(),
                        inside: false,
                    },
                );
            }
        }
    }

    fn resolve(&self, key: &NfpKey, request: &NfpRequest) {
        let outcome = self.cache.get_or_compute(key, || {
            compute_nfp(
                &request.a,
                request.a_kind,
                &request.b,
                request.inside,
                self.explore_edges,
            )
        });

        match outcome {
            Ok(Some(_)) => {}
            Ok(None) => log::debug!("NFP {} unavailable", key),
            Err(e) => log::warn!("NFP {} not cached: {}", key, e),
        }
    }

    /// Resolves all `requests` on the NFP pool.
    fn resolve_all(&self, requests: &HashMap<NfpKey, NfpRequest>) {
        self.nfp_pool.install(|| {
            requests.par_iter().for_each(|(key, request)| {
                if !self.is_cancelled() {
                    self.resolve(key, request);
                }
            });
        });
    }
}

fn build_pool(name: &'static str, threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build {} pool: {}", name, e)))
}

impl GaProblem for NestingProblem {
    type Payload = PlacementResult;

    fn gene_count(&self) -> usize {
        self.parts.len()
    }

    fn evaluate(&self, dna: &mut Dna<Self::Payload>) {
        let parts = self.decode(&dna.genes);
        let mut requests = HashMap::new();
        self.collect_requests(&parts, &mut requests);
        for (key, request) in &requests {
            self.resolve(key, request);
        }

        let result = place(&self.bins, &parts, &self.cache);
        dna.evaluate(result.cost, result);
    }

    fn evaluate_population(&self, generation: u32, population: &mut [Dna<Self::Payload>]) {
        let candidates: Vec<Vec<Part>> = population.iter().map(|dna| self.decode(&dna.genes)).collect();

        let mut requests = HashMap::new();
        for parts in &candidates {
            self.collect_requests(parts, &mut requests);
        }
        log::debug!(
            "generation {}: resolving {} NFPs ({} cached)",
            generation,
            requests.len(),
            self.cache.len()
        );
        self.resolve_all(&requests);

        if self.is_cancelled() {
            return;
        }

        let done = AtomicUsize::new(0);
        let total = population.len().max(1);
        self.placement_pool.install(|| {
            population
                .par_iter_mut()
                .zip(candidates.par_iter())
                .for_each(|(dna, parts)| {
                    if self.is_cancelled() {
                        return;
                    }
                    let result = place(&self.bins, parts, &self.cache);
                    dna.evaluate(result.cost, result);

                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    self.notify(ProgressEvent::Evaluation {
                        generation,
                        progress: finished as f64 / total as f64,
                    });
                });
        });
    }

    fn on_generation(
        &self,
        generation: u32,
        incumbent: &Dna<Self::Payload>,
        _population: &[Dna<Self::Payload>],
    ) {
        let unplaced = incumbent.payload.as_ref().map_or(0, |p| p.unplaced.len());
        log::debug!(
            "generation {}: cost={:.4}, unplaced={}/{}",
            generation,
            incumbent.cost,
            unplaced,
            self.parts.len()
        );

        if generation >= self.generations {
            return;
        }
        if let Some(result) = &incumbent.payload {
            self.notify(ProgressEvent::Generation(PackSnapshot::from_result(
                generation,
                result,
                &self.sources,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn problem(config: &Config) -> NestingProblem {
        let bins = vec![Bin::new("sheet", 100.0, 100.0)];
        let parts = vec![
            Part::rectangle("a", 30.0, 10.0),
            Part::rectangle("b", 20.0, 10.0),
        ];
        NestingProblem::new(
            bins,
            parts.clone(),
            parts,
            config,
            Arc::new(NfpCache::new()),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_applies_genes() {
        let config = Config::new().with_rotation_steps(4).with_threads(1);
        let problem = problem(&config);
        let parts = problem.decode(&[1, 2]);
        assert_eq!(parts[0].rotation_index(), 1);
        assert_eq!(parts[1].rotation_index(), 2);
        assert_relative_eq!(parts[0].rotation(), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_evaluate_fills_cache() {
        let config = Config::new().with_rotation_steps(1).with_threads(1);
        let problem = problem(&config);
        let mut dna = Dna::new(vec![0, 0]);
        problem.evaluate(&mut dna);

        // one inner NFP per part plus both part orderings
        assert_eq!(problem.cache.len(), 4);
        let result = dna.payload.as_ref().unwrap();
        assert!(result.unplaced.is_empty());
        assert!(dna.cost < 2.0);
    }

    #[test]
    fn test_population_evaluation_reports_progress() {
        let config = Config::new().with_rotation_steps(2).with_threads(2);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let problem = problem(&config).with_progress(Box::new(move |event| {
            if let ProgressEvent::Evaluation { progress, .. } = event {
                sink.lock().unwrap().push(progress);
            }
        }));

        let mut population = vec![Dna::new(vec![0, 0]), Dna::new(vec![1, 0]), Dna::new(vec![1, 1])];
        problem.evaluate_population(0, &mut population);

        assert!(population.iter().all(Dna::is_evaluated));
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen.len(), 3);
        assert_relative_eq!(seen[2], 1.0);
    }

    #[test]
    fn test_cancelled_population_left_unevaluated() {
        let config = Config::new().with_threads(1);
        let problem = problem(&config);
        problem.cancelled.store(true, Ordering::Relaxed);

        let mut population = vec![Dna::new(vec![0, 0])];
        problem.evaluate_population(0, &mut population);
        assert!(!population[0].is_evaluated());
        assert!(problem.cache.is_empty());
    }

    #[test]
    fn test_mismatched_sources_rejected() {
        let config = Config::new();
        let result = NestingProblem::new(
            vec![Bin::new("sheet", 10.0, 10.0)],
            vec![Part::rectangle("a", 1.0, 1.0)],
            Vec::new(),
            &config,
            Arc::new(NfpCache::new()),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
