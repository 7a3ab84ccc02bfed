//! Greedy NFP-driven placement of rotated parts into bins.
//!
//! Bins are filled in order. Within a bin each part goes to the vertex of
//! its free region (bin inner NFP minus the union of the placed parts'
//! NFPs) that keeps the bounding box of the bin's contents smallest, with
//! width weighted twice as heavily as height.
//!
//! Placement only reads the NFP cache. A part whose required NFPs are not
//! cached is skipped, so every NFP must be resolved before [`place`] runs.

use crate::boundary::Bin;
use crate::clip::{self, CLEAN_THRESHOLD};
use crate::geometry::Part;
use crate::nfp::{Nfp, NfpCache, NfpKey};
use crate::polygon::{approximately, BoundingBox, Point, Polygon};
use orbitnest_core::{Error, Placement, Result, ShapeId};
use std::collections::HashSet;
use std::sync::Arc;

/// NFP fragments at or below this area are dropped before clipping.
const MIN_FRAGMENT_AREA: f64 = 0.1;

/// Free regions below this area yield no candidate positions.
const MIN_CANDIDATE_AREA: f64 = 2.0;

/// Cost of opening a bin.
const BIN_COST: f64 = 1.0;

/// Cost of each part left unplaced.
const UNPLACED_COST: f64 = 2.0;

/// Outcome of one placement pass.
#[derive(Debug, Clone, Default)]
pub struct PlacementResult {
    /// Placements in bin order, then placement order.
    pub placements: Vec<Placement>,
    /// Fitness; lower is better.
    pub cost: f64,
    /// Parts that fit in no bin.
    pub unplaced: Vec<ShapeId>,
}

/// A part placed in the bin currently being filled.
struct Placed<'a> {
    part: &'a Part,
    position: Point,
}

/// Places `parts` (already rotated by their genes) into `bins`.
///
/// Parts keep their input order; bins are tried in input order and a bin
/// that accepts nothing ends the pass.
pub fn place(bins: &[Bin], parts: &[Part], cache: &NfpCache) -> PlacementResult {
    let mut remaining: Vec<&Part> = parts.iter().collect();
    let mut placements = Vec::new();
    let mut cost = 0.0;

    for bin in bins {
        // no bin is opened, or charged, once every part has a place
        if remaining.is_empty() {
            break;
        }
        cost += BIN_COST;

        let mut placed: Vec<Placed<'_>> = Vec::new();
        let mut occupied: Vec<Point> = Vec::new();
        let mut min_width: Option<f64> = None;

        for &part in &remaining {
            let Some(bin_nfp) = cache.get(&NfpKey::new(bin.key(), part.key(), true)) else {
                continue;
            };

            let pair_nfps: Option<Vec<(Arc<Nfp>, Point)>> = placed
                .iter()
                .map(|p| {
                    cache
                        .get(&NfpKey::new(p.part.key(), part.key(), false))
                        .map(|nfp| (nfp, p.position))
                })
                .collect();
            let Some(pair_nfps) = pair_nfps else {
                log::trace!("part '{}' skipped: pair NFP missing", part.id());
                continue;
            };

            let shape = part.shape();
            let Some(&reference) = shape.points().first() else {
                continue;
            };

            let position = if placed.is_empty() {
                leftmost_position(&bin_nfp, reference)
            } else {
                match best_position(&bin_nfp, &pair_nfps, &occupied, &shape, reference) {
                    Ok(Some((position, width))) => {
                        min_width = Some(width);
                        Some(position)
                    }
                    Ok(None) => None,
                    Err(e) => {
                        log::debug!("part '{}' skipped in bin '{}': {}", part.id(), bin.id(), e);
                        None
                    }
                }
            };

            if let Some(position) = position {
                occupied.extend(shape.points().iter().map(|&p| p + position));
                placements.push(Placement::new(
                    bin.id(),
                    part.id(),
                    position.x,
                    position.y,
                    part.rotation(),
                ));
                placed.push(Placed { part, position });
            }
        }

        if let Some(width) = min_width {
            cost += width / bin.area();
        }

        if placed.is_empty() {
            log::debug!("{}", Error::BinExhausted { bin: bin.id().to_string() });
            break;
        }

        let placed_ids: HashSet<&str> = placed.iter().map(|p| p.part.id()).collect();
        remaining.retain(|part| !placed_ids.contains(part.id()));
    }

    cost += UNPLACED_COST * remaining.len() as f64;

    PlacementResult {
        placements,
        cost,
        unplaced: remaining.iter().map(|part| part.id().to_string()).collect(),
    }
}

/// Translation putting `reference` on the inner-NFP vertex with the smallest x.
fn leftmost_position(bin_nfp: &Nfp, reference: Point) -> Option<Point> {
    let mut best: Option<Point> = None;
    for point in bin_nfp.polygons.iter().flat_map(|p| p.points()) {
        let shift = *point - reference;
        if best.map_or(true, |b| shift.x < b.x) {
            best = Some(shift);
        }
    }
    best
}

fn usable(polygon: &Polygon) -> bool {
    polygon.len() >= 3 && polygon.area().abs() >= MIN_FRAGMENT_AREA
}

/// Best translation of `shape` among the free-region vertices.
///
/// Returns the translation and the area of the resulting bounding box.
fn best_position(
    bin_nfp: &Nfp,
    pair_nfps: &[(Arc<Nfp>, Point)],
    occupied: &[Point],
    shape: &Polygon,
    reference: Point,
) -> Result<Option<(Point, f64)>> {
    let forbidden: Vec<Polygon> = pair_nfps
        .iter()
        .flat_map(|(nfp, position)| nfp.translated(*position))
        .map(|polygon| clip::clean(&polygon, CLEAN_THRESHOLD))
        .filter(|polygon| polygon.len() > 2 && polygon.area().abs() > MIN_FRAGMENT_AREA)
        .collect();

    let combined = clip::union(&forbidden)?;
    let free: Vec<Polygon> = clip::difference(&bin_nfp.polygons, &combined)?
        .iter()
        .map(|polygon| clip::clean(polygon, CLEAN_THRESHOLD))
        .filter(usable)
        .collect();

    let occupied_bounds = BoundingBox::from_points(occupied.iter().copied());
    let mut best: Option<(Point, f64, f64)> = None;

    for candidate in free.iter().filter(|p| p.area().abs() >= MIN_CANDIDATE_AREA) {
        for &vertex in candidate.points() {
            let shift = vertex - reference;
            let Some(shape_bounds) =
                BoundingBox::from_points(shape.points().iter().map(|&p| p + shift))
            else {
                continue;
            };
            let bounds = occupied_bounds.map_or(shape_bounds, |b| b.union(&shape_bounds));

            let metric = bounds.width() * 2.0 + bounds.height();
            let better = best.map_or(true, |(best_shift, best_metric, _)| {
                metric < best_metric || (approximately(best_metric, metric) && shift.x < best_shift.x)
            });
            if better {
                best = Some((shift, metric, bounds.area()));
            }
        }
    }

    Ok(best.map(|(shift, _, area)| (shift, area)))
}
