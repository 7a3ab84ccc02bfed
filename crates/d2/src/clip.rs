//! Adapter over the polygon clip engine.
//!
//! Boolean operations run on `i_overlay` with the non-zero fill rule.
//! Coordinates are snapped to a `1 / CLIP_SCALE` grid before every call so
//! that vertices produced by different NFPs meet exactly; the cleanup
//! threshold is tuned against the same scale.
//!
//! Results come back as flat contour lists: each shape's outer loop first
//! (solid orientation), followed by its holes.

use crate::polygon::{Point, Polygon, TOLERANCE};
use geo::{Coord, LineString, Simplify};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use orbitnest_core::{Error, Result};

/// Quantization scale applied before boolean operations.
pub const CLIP_SCALE: f64 = 1e7;

/// Distance below which cleanup drops vertices.
pub const CLEAN_THRESHOLD: f64 = 1e-4;

/// Miter limit for outline offsetting.
pub const MITER_LIMIT: f64 = 2.5;

type Contour = Vec<[f64; 2]>;

#[inline]
fn quantize(v: f64) -> f64 {
    (v * CLIP_SCALE).round() / CLIP_SCALE
}

/// World coordinates of `polygon`, snapped to the clip grid.
fn to_contour(polygon: &Polygon) -> Result<Contour> {
    polygon
        .world_points()
        .map(|p| {
            if p.x.is_finite() && p.y.is_finite() {
                Ok([quantize(p.x), quantize(p.y)])
            } else {
                Err(Error::BooleanOpFailure(format!(
                    "non-finite coordinate ({}, {})",
                    p.x, p.y
                )))
            }
        })
        .collect()
}

fn from_contour(contour: Contour) -> Polygon {
    Polygon::new(contour.into_iter().map(Point::from).collect())
}

fn to_contours(polygons: &[Polygon]) -> Result<Vec<Contour>> {
    polygons
        .iter()
        .filter(|p| p.len() >= 3)
        .map(to_contour)
        .collect()
}

fn run(subject: Vec<Contour>, clip: Vec<Contour>, rule: OverlayRule) -> Vec<Polygon> {
    let shapes = subject.overlay(&clip, rule, FillRule::NonZero);
    shapes
        .into_iter()
        .flatten()
        .filter(|contour| contour.len() >= 3)
        .map(from_contour)
        .collect()
}

/// Union of all polygons (offsets applied).
pub fn union(polygons: &[Polygon]) -> Result<Vec<Polygon>> {
    let subject = to_contours(polygons)?;
    if subject.is_empty() {
        return Ok(Vec::new());
    }
    Ok(run(subject, Vec::new(), OverlayRule::Union))
}

/// `subject` minus `clip` (offsets applied).
pub fn difference(subject: &[Polygon], clip: &[Polygon]) -> Result<Vec<Polygon>> {
    let subject = to_contours(subject)?;
    if subject.is_empty() {
        return Ok(Vec::new());
    }
    let clip = to_contours(clip)?;
    Ok(run(subject, clip, OverlayRule::Difference))
}

/// Minkowski sum of two closed outlines.
///
/// Every edge pair sweeps a quadrilateral; the quads, all brought to the
/// same orientation, are unioned. Returns outer loops and holes.
pub fn minkowski_sum(a: &Polygon, b: &Polygon) -> Result<Vec<Polygon>> {
    let (n, m) = (a.len(), b.len());
    if n < 3 || m < 3 {
        return Err(Error::BooleanOpFailure(
            "minkowski sum needs two polygons of at least 3 vertices".into(),
        ));
    }

    let sums: Vec<Vec<Point>> = a
        .world_points()
        .map(|pa| b.world_points().map(|pb| pa + pb).collect())
        .collect();

    let mut quads = Vec::with_capacity(n * m);
    for i in 0..n {
        let i1 = (i + 1) % n;
        for j in 0..m {
            let j1 = (j + 1) % m;
            let quad = Polygon::new(vec![sums[i][j], sums[i1][j], sums[i1][j1], sums[i][j1]]);
            if quad.area().abs() > TOLERANCE {
                quads.push(quad.into_solid());
            }
        }
    }

    if quads.is_empty() {
        return Err(Error::BooleanOpFailure("minkowski sum is degenerate".into()));
    }

    union(&quads)
}

/// Removes near-duplicate and near-collinear vertices from a closed loop.
pub fn clean(polygon: &Polygon, threshold: f64) -> Polygon {
    if polygon.len() < 3 {
        return polygon.clone();
    }

    let mut coords: Vec<Coord<f64>> = polygon
        .points()
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    coords.push(coords[0]);

    let simplified = LineString::from(coords).simplify(&threshold);
    let mut points: Vec<Point> = simplified.coords().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() > 1 && points[0].approx_eq_with(points[points.len() - 1], threshold) {
        points.pop();
    }

    Polygon::new(points).with_offset(polygon.offset())
}

/// Outward offset of a closed outline by `delta`.
///
/// Convex corners get a miter join; corners whose miter would exceed
/// [`MITER_LIMIT`] times `delta` are squared off at distance `delta`.
/// Concave corners leave small loops that the final union removes.
pub fn inflate(polygon: &Polygon, delta: f64) -> Result<Polygon> {
    if !delta.is_finite() || delta < 0.0 {
        return Err(Error::InvalidGeometry(format!(
            "offset distance must be finite and non-negative, got {}",
            delta
        )));
    }
    if polygon.len() < 3 {
        return Err(Error::InvalidGeometry(
            "cannot offset a polygon with fewer than 3 vertices".into(),
        ));
    }
    if delta < TOLERANCE {
        return Ok(polygon.clone());
    }

    let solid = polygon.clone().into_solid();
    let pts = solid.points();
    let n = pts.len();
    let mut outline = Vec::with_capacity(n * 2);

    for i in 0..n {
        let prev = pts[(i + n - 1) % n];
        let p = pts[i];
        let next = pts[(i + 1) % n];

        let u1 = (p - prev).normalize();
        let u2 = (next - p).normalize();
        let n1 = u1.perpendicular();
        let n2 = u2.perpendicular();
        let turn = u1.cross(u2);

        if turn > TOLERANCE {
            let cos = n1.dot(n2);
            if 1.0 + cos > 2.0 / (MITER_LIMIT * MITER_LIMIT) {
                outline.push(p + (n1 + n2) * (delta / (1.0 + cos)));
            } else {
                let bisector = (n1 + n2).normalize();
                let t1 = delta * (1.0 - n1.dot(bisector)) / u1.dot(bisector);
                let t2 = delta * (1.0 - n2.dot(bisector)) / u2.dot(bisector);
                outline.push(p + n1 * delta + u1 * t1);
                outline.push(p + n2 * delta + u2 * t2);
            }
        } else if turn < -TOLERANCE {
            outline.push(p + n1 * delta);
            outline.push(p);
            outline.push(p + n2 * delta);
        } else {
            outline.push(p + n1 * delta);
        }
    }

    let merged = union(&[Polygon::new(outline).with_offset(solid.offset())])?;
    merged
        .into_iter()
        .max_by(|a, b| a.area().abs().total_cmp(&b.area().abs()))
        .map(|p| p.into_solid())
        .ok_or_else(|| Error::BooleanOpFailure("offset produced no outline".into()))
}

impl Polygon {
    /// Outward offset by `delta` (see [`inflate`]).
    pub fn inflate(&self, delta: f64) -> Result<Polygon> {
        inflate(self, delta)
    }
}
