//! Geometric predicates on points, segments and polygons.
//!
//! These are the tolerance-aware tests the orbiting NFP algorithm relies on.
//! Containment is tri-state: a point exactly on a vertex or an edge yields
//! [`Containment::OnBoundary`], which callers must treat as "probe another
//! point" rather than as outside.

use crate::polygon::{approximately, Point, Polygon, TOLERANCE};

/// Result of a point-in-polygon test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside.
    Inside,
    /// Strictly outside.
    Outside,
    /// On a vertex or an edge; undecidable.
    OnBoundary,
}

impl Containment {
    /// `Some(true)` inside, `Some(false)` outside, `None` when undecided.
    pub fn decided(self) -> Option<bool> {
        match self {
            Containment::Inside => Some(true),
            Containment::Outside => Some(false),
            Containment::OnBoundary => None,
        }
    }
}

/// Returns true if `p` lies on segment `ab`, excluding both endpoints.
pub fn on_segment(a: Point, b: Point, p: Point) -> bool {
    // vertical
    if approximately(a.x, b.x) && approximately(p.x, a.x) {
        return !approximately(p.y, b.y)
            && !approximately(p.y, a.y)
            && p.y < a.y.max(b.y)
            && p.y > a.y.min(b.y);
    }

    // horizontal
    if approximately(a.y, b.y) && approximately(p.y, a.y) {
        return !approximately(p.x, b.x)
            && !approximately(p.x, a.x)
            && p.x < a.x.max(b.x)
            && p.x > a.x.min(b.x);
    }

    if (p.x < a.x && p.x < b.x)
        || (p.x > a.x && p.x > b.x)
        || (p.y < a.y && p.y < b.y)
        || (p.y > a.y && p.y > b.y)
    {
        return false;
    }

    if p.approx_eq(a) || p.approx_eq(b) {
        return false;
    }

    let ab = b - a;
    let ap = p - a;
    if ab.cross(ap).abs() > TOLERANCE {
        return false;
    }

    let dot = ap.dot(ab);
    if dot < 0.0 || approximately(dot, 0.0) {
        return false;
    }

    let len2 = ab.squared_length();
    !(dot > len2 || approximately(dot, len2))
}

/// Even-odd containment of `point` in `polygon` (offset applied).
///
/// Polygons with fewer than three vertices contain nothing decidable and
/// report [`Containment::OnBoundary`].
pub fn point_in_polygon(point: Point, polygon: &Polygon) -> Containment {
    let n = polygon.len();
    if n < 3 {
        return Containment::OnBoundary;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon.world_point(i);
        let pj = polygon.world_point(j);
        j = i;

        if pi.approx_eq(point) || on_segment(pi, pj, point) {
            return Containment::OnBoundary;
        }

        if pi.approx_eq(pj) {
            continue;
        }

        let crosses = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
        if crosses {
            inside = !inside;
        }
    }

    if inside {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Intersection of lines `ab` and `ef`.
///
/// With `infinite` false the point must lie within both segments' extents
/// (axis-wise, skipping axes along which a segment is degenerate).
/// Parallel lines yield `None`.
pub fn line_intersect(a: Point, b: Point, e: Point, f: Point, infinite: bool) -> Option<Point> {
    let a1 = b.y - a.y;
    let b1 = a.x - b.x;
    let c1 = b.x * a.y - a.x * b.y;
    let a2 = f.y - e.y;
    let b2 = e.x - f.x;
    let c2 = f.x * e.y - e.x * f.y;

    let denom = a1 * b2 - a2 * b1;
    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;

    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    if !infinite {
        let outside = |v: f64, s: f64, t: f64| {
            (s - t).abs() > TOLERANCE && if s < t { v < s || v > t } else { v > s || v < t }
        };
        if outside(x, a.x, b.x) || outside(y, a.y, b.y) || outside(x, e.x, f.x) || outside(y, e.y, f.y)
        {
            return None;
        }
    }

    Some(Point::new(x, y))
}

/// Index of the vertex before `i`, stepping over a coincident neighbour.
fn prev_distinct(points: &[Point], i: usize) -> usize {
    let n = points.len();
    let prev = (i + n - 1) % n;
    if points[prev].approx_eq(points[i]) {
        (prev + n - 1) % n
    } else {
        prev
    }
}

/// Index of the vertex after `next`, stepping over a coincident neighbour.
fn next_distinct(points: &[Point], next: usize) -> usize {
    let n = points.len();
    let after = (next + 1) % n;
    if points[after].approx_eq(points[next]) {
        (after + 1) % n
    } else {
        after
    }
}

/// Returns true if the two neighbours straddle `polygon`'s boundary.
fn straddles(polygon: &Polygon, before: Point, after: Point) -> bool {
    matches!(
        (point_in_polygon(before, polygon), point_in_polygon(after, polygon)),
        (Containment::Inside, Containment::Outside) | (Containment::Outside, Containment::Inside)
    )
}

/// Returns true if the boundaries of `a` and `b` (offsets applied) cross.
///
/// Touching contacts (a vertex on the other polygon's edge or vertex) count
/// as crossing only if the adjacent vertices lie on opposite sides of the
/// other polygon.
pub fn polygons_intersect(a: &Polygon, b: &Polygon) -> bool {
    let (ap, bp) = (a.points(), b.points());
    let (n, m) = (ap.len(), bp.len());
    if n < 2 || m < 2 {
        return false;
    }

    for i in 0..n {
        let i1 = (i + 1) % n;
        let a1 = a.world_point(i);
        let a2 = a.world_point(i1);
        let a0 = a.world_point(prev_distinct(ap, i));
        let a3 = a.world_point(next_distinct(ap, i1));

        for j in 0..m {
            let j1 = (j + 1) % m;
            let b1 = b.world_point(j);
            let b2 = b.world_point(j1);
            let b0 = b.world_point(prev_distinct(bp, j));
            let b3 = b.world_point(next_distinct(bp, j1));

            if on_segment(a1, a2, b1) || a1.approx_eq(b1) {
                if straddles(a, b0, b2) {
                    return true;
                }
                continue;
            }

            if on_segment(a1, a2, b2) || a2.approx_eq(b2) {
                if straddles(a, b1, b3) {
                    return true;
                }
                continue;
            }

            if on_segment(b1, b2, a1) || a1.approx_eq(b2) {
                if straddles(b, a0, a2) {
                    return true;
                }
                continue;
            }

            if on_segment(b1, b2, a2) || a2.approx_eq(b1) {
                if straddles(b, a1, a3) {
                    return true;
                }
                continue;
            }

            if line_intersect(b1, b2, a1, a2, false).is_some() {
                return true;
            }
        }
    }

    false
}
