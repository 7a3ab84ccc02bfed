//! No-Fit Polygon (NFP) computation and caching.
//!
//! The NFP of a stationary shape A and a movable shape B is the locus of
//! B's reference point (its first vertex) for which B touches A without
//! overlapping. The inner NFP (A is a container) is the locus for which B
//! lies inside A.
//!
//! This module implements:
//! - **Rectangle fast path**: the inner NFP of an axis-aligned bin is a
//!   rectangle, computed from bounding boxes alone
//! - **Orbiting**: exact sliding NFP, see [`crate::nfp_sliding`]
//! - **Minkowski difference**: outer NFP of two parts via `A ⊕ (−B)` using
//!   `i_overlay`
//!
//! Results are shared through a thread-safe [`NfpCache`] that computes each
//! key at most once, including keys whose computation fails.

use crate::clip;
use crate::geometry::{ShapeKey, ShapeKind};
use crate::nfp_sliding::compute_nfp_orbiting;
use crate::polygon::{Point, Polygon};
use orbitnest_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// NFP computation result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nfp {
    /// The NFP polygon(s), each in solid orientation.
    ///
    /// The first polygon is the outer boundary; further polygons come from
    /// edge exploration (interior pockets or additional inner regions).
    pub polygons: Vec<Polygon>,
}

impl Nfp {
    /// Creates a new empty NFP.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an NFP with a single polygon.
    pub fn from_polygon(polygon: Polygon) -> Self {
        Self {
            polygons: vec![polygon],
        }
    }

    /// Creates an NFP with multiple polygons.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// Returns true if the NFP is empty.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Returns the total vertex count across all polygons.
    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::len).sum()
    }

    /// The polygons translated by `position`.
    pub fn translated(&self, position: Point) -> Vec<Polygon> {
        self.polygons
            .iter()
            .map(|p| p.translate(position.x, position.y))
            .collect()
    }

    fn normalized(self) -> Self {
        Self {
            polygons: self
                .polygons
                .into_iter()
                .map(|p| if p.area() > 0.0 { p.reversed() } else { p })
                .collect(),
        }
    }
}

/// Computes the NFP of `b` relative to `a`.
///
/// # Algorithm Selection
/// - `a` is a bin and `inside` is set: rectangle fast path
/// - `explore_edges` or `inside`: orbiting
/// - otherwise: Minkowski difference
///
/// # Arguments
/// * `a` - The stationary shape, already in its rotation state
/// * `a_kind` - Whether `a` is a bin or a part
/// * `b` - The movable shape, already in its rotation state
/// * `inside` - Compute the inner NFP (`b` inside `a`)
/// * `explore_edges` - Search for additional NFP loops when orbiting
///
/// # Returns
/// Solid-oriented polygons in world positions of `b`'s first vertex, or
/// [`Error::NfpUnavailable`] when no NFP exists or none could be traced.
pub fn compute_nfp(
    a: &Polygon,
    a_kind: ShapeKind,
    b: &Polygon,
    inside: bool,
    explore_edges: bool,
) -> Result<Nfp> {
    if a.len() < 3 || b.len() < 3 {
        return Err(Error::NfpUnavailable(
            "polygons need at least 3 vertices".into(),
        ));
    }

    let nfp = if a_kind == ShapeKind::Bin && inside {
        no_fit_rectangle(a, b)
            .map(Nfp::from_polygon)
            .ok_or_else(|| Error::NfpUnavailable("shape does not fit the bin".into()))?
    } else if explore_edges || inside {
        let polygons = compute_nfp_orbiting(a, b, inside, explore_edges);
        if polygons.is_empty() {
            return Err(Error::NfpUnavailable("orbit did not close".into()));
        }
        Nfp::from_polygons(polygons)
    } else {
        minkowski_difference(a, b)
            .map(Nfp::from_polygon)
            .map_err(|e| Error::NfpUnavailable(e.to_string()))?
    };

    Ok(nfp.normalized())
}

/// Inner NFP of `b` in the bounding rectangle of `a`.
///
/// Returns `None` when `b`'s bounding box is wider or taller than `a`'s.
/// A shape exactly as large as the bin yields a degenerate rectangle.
pub fn no_fit_rectangle(a: &Polygon, b: &Polygon) -> Option<Polygon> {
    let abb = a.world_bounds();
    let bbb = b.world_bounds();
    if bbb.width() > abb.width() || bbb.height() > abb.height() {
        return None;
    }

    let reference = b.world_point(0);
    let left = abb.min.x - bbb.min.x;
    let right = abb.max.x - bbb.max.x;
    let bottom = abb.min.y - bbb.min.y;
    let top = abb.max.y - bbb.max.y;

    Some(Polygon::new(vec![
        reference + Point::new(left, bottom),
        reference + Point::new(right, bottom),
        reference + Point::new(right, top),
        reference + Point::new(left, top),
    ]))
}

/// Outer NFP of two parts as the Minkowski difference `A ⊕ (−B)`.
///
/// The largest contour of the sum is kept and shifted by `b`'s first vertex
/// so that it tracks `b`'s reference point.
pub fn minkowski_difference(a: &Polygon, b: &Polygon) -> Result<Polygon> {
    let negated = Polygon::new(b.world_points().map(|p| -p).collect());
    let sum = clip::minkowski_sum(a, &negated)?;

    let outer = sum
        .into_iter()
        .max_by(|x, y| x.area().abs().total_cmp(&y.area().abs()))
        .ok_or_else(|| Error::NfpUnavailable("empty Minkowski sum".into()))?;

    let reference = b.world_point(0);
    Ok(outer.translate(reference.x, reference.y).into_solid())
}

// ============================================================================
// NFP Cache
// ============================================================================

/// Cache key for NFP lookups.
///
/// The edge-exploration flag is not part of the key: within one packing
/// run it is constant, so an NFP computed with and without exploration
/// never coexist.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct NfpKey {
    /// The stationary shape.
    pub a: ShapeKey,
    /// The movable shape.
    pub b: ShapeKey,
    /// Inner NFP.
    pub inside: bool,
}

impl NfpKey {
    /// Creates a new key.
    pub fn new(a: ShapeKey, b: ShapeKey, inside: bool) -> Self {
        Self { a, b, inside }
    }
}

impl fmt::Display for NfpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / inside={}", self.a, self.b, self.inside)
    }
}

/// A resolved entry: `None` records an unavailable NFP.
type Slot = Arc<OnceLock<Option<Arc<Nfp>>>>;

/// Thread-safe NFP cache.
///
/// Each key is computed at most once even under concurrent requests:
/// racing callers block on the same slot and share its outcome. Failed
/// computations are stored as unavailable so they are not retried.
#[derive(Debug, Default)]
pub struct NfpCache {
    cache: RwLock<HashMap<NfpKey, Slot>>,
}

impl NfpCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &NfpKey) -> Result<Slot> {
        {
            let cache = self.cache.read().map_err(|e| {
                Error::Internal(format!("Failed to acquire cache read lock: {}", e))
            })?;
            if let Some(slot) = cache.get(key) {
                return Ok(Arc::clone(slot));
            }
        }

        let mut cache = self.cache.write().map_err(|e| {
            Error::Internal(format!("Failed to acquire cache write lock: {}", e))
        })?;
        Ok(Arc::clone(cache.entry(key.clone()).or_default()))
    }

    fn resolved(&self, key: &NfpKey) -> Option<Option<Arc<Nfp>>> {
        let cache = self.cache.read().ok()?;
        cache.get(key)?.get().cloned()
    }

    /// Returns the NFP for `key` if it has been resolved and is available.
    pub fn get(&self, key: &NfpKey) -> Option<Arc<Nfp>> {
        self.resolved(key).flatten()
    }

    /// Returns true once `key` has been resolved, successfully or not.
    pub fn contains(&self, key: &NfpKey) -> bool {
        self.resolved(key).is_some()
    }

    /// Gets a cached NFP or computes and caches it.
    ///
    /// `compute` runs at most once per key for the lifetime of the entry.
    /// Errors and empty results are cached as unavailable (`Ok(None)`).
    pub fn get_or_compute<F>(&self, key: &NfpKey, compute: F) -> Result<Option<Arc<Nfp>>>
    where
        F: FnOnce() -> Result<Nfp>,
    {
        let slot = self.slot(key)?;
        let value = slot.get_or_init(|| match compute() {
            Ok(nfp) if !nfp.is_empty() => Some(Arc::new(nfp)),
            Ok(_) => {
                log::debug!("NFP {} is empty", key);
                None
            }
            Err(e) => {
                log::debug!("NFP {} unavailable: {}", key, e);
                None
            }
        });
        Ok(value.clone())
    }

    /// Stores a resolved entry unless the key is already resolved.
    pub fn insert(&self, key: NfpKey, nfp: Option<Nfp>) -> Result<()> {
        let slot = self.slot(&key)?;
        let _ = slot.set(nfp.filter(|n| !n.is_empty()).map(Arc::new));
        Ok(())
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the cache.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rect(w: f64, h: f64) -> Polygon {
        Polygon::rectangle(w, h)
    }

    fn key(a: &str, b: &str, inside: bool) -> NfpKey {
        NfpKey::new(
            ShapeKey::new(ShapeKind::Part, a, 0),
            ShapeKey::new(ShapeKind::Part, b, 0),
            inside,
        )
    }

    #[test]
    fn test_no_fit_rectangle() {
        let bin = rect(100.0, 50.0);
        let part = rect(10.0, 20.0);
        let nfp = no_fit_rectangle(&bin, &part).unwrap();

        let bounds = nfp.bounds();
        assert_relative_eq!(bounds.min.x, 0.0);
        assert_relative_eq!(bounds.min.y, 0.0);
        assert_relative_eq!(bounds.max.x, 90.0);
        assert_relative_eq!(bounds.max.y, 30.0);
        assert!(nfp.is_solid());
    }

    #[test]
    fn test_no_fit_rectangle_tracks_reference_vertex() {
        // reference vertex is not the bounding-box corner
        let bin = rect(10.0, 10.0);
        let part = Polygon::from_coords(&[(2.0, 0.0), (4.0, 2.0), (2.0, 4.0), (0.0, 2.0)]);
        let nfp = no_fit_rectangle(&bin, &part).unwrap();
        let bounds = nfp.bounds();
        assert_relative_eq!(bounds.min.x, 2.0);
        assert_relative_eq!(bounds.max.x, 8.0);
        assert_relative_eq!(bounds.min.y, 0.0);
        assert_relative_eq!(bounds.max.y, 6.0);
    }

    #[test]
    fn test_no_fit_rectangle_too_large() {
        assert!(no_fit_rectangle(&rect(10.0, 10.0), &rect(11.0, 5.0)).is_none());
        assert!(no_fit_rectangle(&rect(10.0, 10.0), &rect(5.0, 11.0)).is_none());

        let exact = no_fit_rectangle(&rect(10.0, 10.0), &rect(10.0, 10.0)).unwrap();
        assert_relative_eq!(exact.area(), 0.0);
    }

    #[test]
    fn test_minkowski_difference_squares() {
        let a = rect(10.0, 10.0);
        let b = rect(5.0, 5.0);
        let nfp = minkowski_difference(&a, &b).unwrap();

        assert_relative_eq!(nfp.area().abs(), 225.0, epsilon = 1e-4);
        let bounds = nfp.bounds();
        assert_relative_eq!(bounds.min.x, -5.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.max.x, 10.0, epsilon = 1e-6);
        assert!(nfp.is_solid());
    }

    #[test]
    fn test_compute_nfp_dispatch() {
        let a = rect(10.0, 10.0);
        let b = rect(5.0, 5.0);

        let inner = compute_nfp(&a, ShapeKind::Bin, &b, true, false).unwrap();
        assert_relative_eq!(inner.polygons[0].area().abs(), 25.0, epsilon = 1e-9);

        let outer = compute_nfp(&a, ShapeKind::Part, &b, false, false).unwrap();
        assert_relative_eq!(outer.polygons[0].area().abs(), 225.0, epsilon = 1e-4);

        let orbit = compute_nfp(&a, ShapeKind::Part, &b, false, true).unwrap();
        assert_relative_eq!(orbit.polygons[0].area().abs(), 225.0, epsilon = 1e-6);

        for nfp in [&inner, &outer, &orbit] {
            assert!(nfp.polygons.iter().all(Polygon::is_solid));
        }
    }

    #[test]
    fn test_methods_share_world_frame_for_offset_shape() {
        let a = rect(10.0, 10.0).with_offset(Point::new(100.0, 0.0));
        let b = rect(5.0, 5.0);

        let minkowski = compute_nfp(&a, ShapeKind::Part, &b, false, false).unwrap();
        let orbit = compute_nfp(&a, ShapeKind::Part, &b, false, true).unwrap();
        let (m, o) = (minkowski.polygons[0].bounds(), orbit.polygons[0].bounds());
        assert_relative_eq!(m.min.x, 95.0, epsilon = 1e-6);
        assert_relative_eq!(o.min.x, m.min.x, epsilon = 1e-6);
        assert_relative_eq!(o.min.y, m.min.y, epsilon = 1e-6);
        assert_relative_eq!(o.max.x, m.max.x, epsilon = 1e-6);
        assert_relative_eq!(o.max.y, m.max.y, epsilon = 1e-6);

        let rectangle = compute_nfp(&a, ShapeKind::Bin, &b, true, false).unwrap();
        let inner_orbit = compute_nfp(&a, ShapeKind::Part, &b, true, false).unwrap();
        let (r, o) = (rectangle.polygons[0].bounds(), inner_orbit.polygons[0].bounds());
        assert_relative_eq!(r.min.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(o.min.x, r.min.x, epsilon = 1e-9);
        assert_relative_eq!(o.max.x, r.max.x, epsilon = 1e-9);
        assert_relative_eq!(o.max.y, r.max.y, epsilon = 1e-9);
    }

    #[test]
    fn test_compute_nfp_unavailable() {
        let result = compute_nfp(&rect(5.0, 5.0), ShapeKind::Bin, &rect(10.0, 10.0), true, false);
        assert!(matches!(result, Err(Error::NfpUnavailable(_))));
    }

    #[test]
    fn test_cache_computes_once() {
        let cache = NfpCache::new();
        let calls = AtomicUsize::new(0);
        let k = key("a", "b", false);

        for _ in 0..3 {
            let nfp = cache
                .get_or_compute(&k, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Nfp::from_polygon(rect(1.0, 1.0)))
                })
                .unwrap();
            assert!(nfp.is_some());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&k));
        assert!(cache.get(&k).is_some());
    }

    #[test]
    fn test_cache_stores_failure() {
        let cache = NfpCache::new();
        let calls = AtomicUsize::new(0);
        let k = key("a", "b", true);

        for _ in 0..2 {
            let nfp = cache
                .get_or_compute(&k, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::NfpUnavailable("test".into()))
                })
                .unwrap();
            assert!(nfp.is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&k));
        assert!(cache.get(&k).is_none());
    }

    #[test]
    fn test_cache_concurrent_compute_once() {
        let cache = NfpCache::new();
        let calls = AtomicUsize::new(0);
        let k = key("x", "y", false);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache
                        .get_or_compute(&k, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(Nfp::from_polygon(rect(2.0, 2.0)))
                        })
                        .unwrap()
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_insert_and_clear() {
        let cache = NfpCache::new();
        let k = key("a", "a", false);
        cache.insert(k.clone(), Some(Nfp::from_polygon(rect(1.0, 1.0)))).unwrap();
        // already resolved; second insert is ignored
        cache.insert(k.clone(), None).unwrap();
        assert!(cache.get(&k).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(&k));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("a", "b", true).to_string(), "a:0 / b:0 / inside=true");
    }
}
