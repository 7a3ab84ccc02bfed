//! Orbiting (sliding) algorithm for No-Fit Polygon generation.
//!
//! The movable polygon B is slid around the stationary polygon A so that
//! the two always touch but never overlap; the path of B's reference
//! vertex (`B[0]`) is the NFP boundary.
//!
//! ## Algorithm Overview
//!
//! 1. Find a start position: A's lowest vertex against B's highest vertex
//!    for outer NFPs, or a searched position for inner NFPs.
//! 2. Enumerate every touching contact at the current position and derive
//!    candidate slide vectors from the touching edges.
//! 3. Drop vectors that retrace the previous step, then move along the
//!    candidate that can slide farthest before the next collision.
//! 4. Stop when the reference point returns to the start or to any earlier
//!    trace point. An exhausted iteration budget discards the attempt.
//!
//! With edge exploration enabled, further start positions are searched at
//! A vertices no orbit has touched yet, yielding additional NFP loops
//! (interior pockets, multiple inner regions).
//!
//! Both inputs are worked on as private solid-oriented clones; the
//! per-run visited set replaces any marking of caller-owned vertices.

use crate::polygon::{approximately, Point, Polygon, TOLERANCE};
use crate::predicates::{on_segment, point_in_polygon, polygons_intersect};
use std::collections::HashSet;

/// Iteration budget per orbit, multiplied by the total vertex count.
const ITERATION_FACTOR: usize = 10;

/// Unit-vector cross product below which a reversed vector counts as retracing.
const RETRACE_TOLERANCE: f64 = 1e-8;

// ============================================================================
// Contacts and Translation Vectors
// ============================================================================

/// Type of contact between the stationary polygon A and the orbiting polygon B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    /// A vertex of B coincides with a vertex of A.
    VertexVertex,
    /// A vertex of B lies inside an edge of A.
    VertexOnEdgeOfA,
    /// A vertex of A lies inside an edge of B.
    VertexOnEdgeOfB,
}

/// A single touching contact.
///
/// For [`ContactType::VertexOnEdgeOfA`] `a` is the end vertex of the
/// touched edge; for [`ContactType::VertexOnEdgeOfB`] `b` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Type of contact.
    pub contact_type: ContactType,
    /// Vertex index on A.
    pub a: usize,
    /// Vertex index on B.
    pub b: usize,
}

/// A vertex of one of the two polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexRef {
    /// Vertex of the stationary polygon.
    A(usize),
    /// Vertex of the orbiting polygon.
    B(usize),
}

/// A candidate slide, tagged with the edge it runs along.
#[derive(Debug, Clone, Copy)]
pub struct TranslationVector {
    /// Translation of B.
    pub vector: Point,
    /// Start vertex of the generating edge.
    pub start: VertexRef,
    /// End vertex of the generating edge.
    pub end: VertexRef,
}

impl TranslationVector {
    fn new(vector: Point, start: VertexRef, end: VertexRef) -> Self {
        Self { vector, start, end }
    }
}

// ============================================================================
// Distance Queries
// ============================================================================

/// Signed distance `p` travels along `normal` until it meets segment `s1 s2`.
///
/// Without `infinite` the point must project strictly inside the segment's
/// extent perpendicular to `normal`; otherwise the segment is treated as a
/// line.
pub fn point_distance(p: Point, s1: Point, s2: Point, normal: Point, infinite: bool) -> Option<f64> {
    let normal = normal.normalize();
    let dir = normal.perpendicular();

    let pdot = p.dot(dir);
    let s1dot = s1.dot(dir);
    let s2dot = s2.dot(dir);

    let pdotnorm = p.dot(normal);
    let s1dotnorm = s1.dot(normal);
    let s2dotnorm = s2.dot(normal);

    if !infinite {
        let le = |x: f64, y: f64| x < y || approximately(x, y);
        let ge = |x: f64, y: f64| x > y || approximately(x, y);
        if (le(pdot, s1dot) && le(pdot, s2dot)) || (ge(pdot, s1dot) && ge(pdot, s2dot)) {
            return None;
        }
    }

    let d = -(pdotnorm - s1dotnorm + (s1dotnorm - s2dotnorm) * (s1dot - pdot) / (s1dot - s2dot));
    d.is_finite().then_some(d)
}

/// Distance segment `ef` (moving along `direction`) travels before hitting `ab`.
///
/// `None` means the segments never meet, or merely graze at one point.
/// Zero means they are already in contact and the motion pushes them
/// together.
pub fn segment_distance(a: Point, b: Point, e: Point, f: Point, direction: Point) -> Option<f64> {
    let normal = direction.perpendicular();
    let reverse = -direction;

    let dot_a = a.dot(normal);
    let dot_b = b.dot(normal);
    let dot_e = e.dot(normal);
    let dot_f = f.dot(normal);

    let along_a = a.dot(direction);
    let along_b = b.dot(direction);
    let along_e = e.dot(direction);
    let along_f = f.dot(direction);

    let ab_min = dot_a.min(dot_b);
    let ab_max = dot_a.max(dot_b);
    let ef_min = dot_e.min(dot_f);
    let ef_max = dot_e.max(dot_f);

    // touching at a single point
    if approximately(ab_max, ef_min) || approximately(ab_min, ef_max) {
        return None;
    }

    if ab_max < ef_min || ab_min > ef_max {
        return None;
    }

    let overlap = if (ab_max > ef_max && ab_min < ef_min) || (ef_max > ab_max && ef_min < ab_min) {
        1.0
    } else {
        let min_max = ab_max.min(ef_max);
        let max_min = ab_min.max(ef_min);
        let max_max = ab_max.max(ef_max);
        let min_min = ab_min.min(ef_min);
        (min_max - max_min) / (max_max - min_min)
    };

    let ab = b - a;
    let cross_abe = (e - a).cross(ab);
    let cross_abf = (f - a).cross(ab);

    // collinear
    if approximately(cross_abe, 0.0) && approximately(cross_abf, 0.0) {
        let ab_norm = Point::new(b.y - a.y, a.x - b.x).normalize();
        let ef_norm = Point::new(f.y - e.y, e.x - f.x).normalize();

        // normals must be opposed
        if ab_norm.cross(ef_norm).abs() < TOLERANCE && ab_norm.dot(ef_norm) < 0.0 {
            let normdot = ab_norm.dot(direction);
            // sliding along each other
            if approximately(normdot, 0.0) {
                return None;
            }
            if normdot < 0.0 {
                return Some(0.0);
            }
        }
        return None;
    }

    let mut distances = Vec::with_capacity(4);

    // A point of one segment touching the other segment does not block
    // motion that carries the segments apart.
    let touching_but_separating = |d: Option<f64>, other: Option<f64>| match d {
        Some(v) if approximately(v, 0.0) => match other {
            Some(o) => o < 0.0 || approximately(o * overlap, 0.0),
            None => true,
        },
        _ => false,
    };

    for (p, other, along_p, dot_p) in [(a, b, along_a, dot_a), (b, a, along_b, dot_b)] {
        if approximately(dot_p, dot_e) {
            distances.push(along_p - along_e);
        } else if approximately(dot_p, dot_f) {
            distances.push(along_p - along_f);
        } else if dot_p > ef_min && dot_p < ef_max {
            let d = point_distance(p, e, f, reverse, false);
            let other_d = point_distance(other, e, f, reverse, true);
            if let Some(d) = d.filter(|_| !touching_but_separating(d, other_d)) {
                distances.push(d);
            }
        }
    }

    for (p, other, dot_p) in [(e, f, dot_e), (f, e, dot_f)] {
        if dot_p > ab_min && dot_p < ab_max {
            let d = point_distance(p, a, b, direction, false);
            let other_d = point_distance(other, a, b, direction, true);
            if let Some(d) = d.filter(|_| !touching_but_separating(d, other_d)) {
                distances.push(d);
            }
        }
    }

    distances.into_iter().reduce(f64::min)
}

/// Distance B (offset applied) can slide along `direction` before touching A.
///
/// With `ignore_negative`, distances pointing backwards are skipped.
pub fn polygon_slide_distance(
    a: &Polygon,
    b: &Polygon,
    direction: Point,
    ignore_negative: bool,
) -> Option<f64> {
    let dir = direction.normalize();
    let (na, nb) = (a.len(), b.len());
    let mut distance: Option<f64> = None;

    for i in 0..nb {
        let b1 = b.world_point(i);
        let b2 = b.world_point((i + 1) % nb);
        if b1.approx_eq(b2) {
            continue;
        }
        for j in 0..na {
            let a1 = a.world_point(j);
            let a2 = a.world_point((j + 1) % na);
            if a1.approx_eq(a2) {
                continue;
            }

            if let Some(d) = segment_distance(a1, a2, b1, b2, dir) {
                let closer = distance.map_or(true, |current| d < current);
                if closer && (!ignore_negative || d > 0.0 || approximately(d, 0.0)) {
                    distance = Some(d);
                }
            }
        }
    }

    distance
}

/// Largest of B's per-vertex shortest projections onto A along `direction`.
pub fn polygon_projection_distance(a: &Polygon, b: &Polygon, direction: Point) -> Option<f64> {
    let (na, nb) = (a.len(), b.len());
    let mut distance: Option<f64> = None;

    for i in 0..nb {
        let p = b.world_point(i);
        let mut min_projection: Option<f64> = None;

        for j in 0..na {
            let s1 = a.world_point(j);
            let s2 = a.world_point((j + 1) % na);
            if (s2 - s1).cross(direction).abs() < TOLERANCE {
                continue;
            }

            if let Some(d) = point_distance(p, s1, s2, direction, false) {
                if min_projection.map_or(true, |m| d < m) {
                    min_projection = Some(d);
                }
            }
        }

        if let Some(m) = min_projection {
            if distance.map_or(true, |d| m > d) {
                distance = Some(m);
            }
        }
    }

    distance
}

// ============================================================================
// Orbit
// ============================================================================

/// Working state of one orbiting run.
struct Orbit {
    a: Polygon,
    b: Polygon,
    visited: HashSet<VertexRef>,
}

impl Orbit {
    fn new(a: &Polygon, b: &Polygon) -> Self {
        // traces are world positions of B's reference vertex, so only A's
        // offset matters
        Self {
            a: Polygon::new(a.world_points().collect()).to_solid_keep_first(),
            b: b.to_solid_keep_first().with_offset(Point::ORIGIN),
            visited: HashSet::new(),
        }
    }

    /// Start offset for an outer orbit: B's highest vertex on A's lowest vertex.
    fn outer_start(&self) -> Point {
        let lowest = self
            .a
            .points()
            .iter()
            .copied()
            .reduce(|best, p| if p.y < best.y { p } else { best })
            .unwrap_or_default();
        let highest = self
            .b
            .points()
            .iter()
            .copied()
            .reduce(|best, p| if p.y > best.y { p } else { best })
            .unwrap_or_default();
        lowest - highest
    }

    fn contacts(&self) -> Vec<Contact> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut contacts = Vec::new();

        for i in 0..la {
            let next_i = (i + 1) % la;
            let ai = self.a.world_point(i);
            for j in 0..lb {
                let next_j = (j + 1) % lb;
                let bj = self.b.world_point(j);

                let contact = if ai.approx_eq(bj) {
                    Some((ContactType::VertexVertex, i, j))
                } else if on_segment(ai, self.a.world_point(next_i), bj) {
                    Some((ContactType::VertexOnEdgeOfA, next_i, j))
                } else if on_segment(bj, self.b.world_point(next_j), ai) {
                    Some((ContactType::VertexOnEdgeOfB, i, next_j))
                } else {
                    None
                };

                if let Some((contact_type, a, b)) = contact {
                    contacts.push(Contact { contact_type, a, b });
                }
            }
        }

        contacts
    }

    fn translation_vectors(&mut self, contacts: &[Contact]) -> Vec<TranslationVector> {
        let (la, lb) = (self.a.len(), self.b.len());
        let offset = self.b.offset();
        let mut vectors = Vec::with_capacity(contacts.len() * 4);

        for contact in contacts {
            self.visited.insert(VertexRef::A(contact.a));

            let (ia, ib) = (contact.a, contact.b);
            let (prev_ia, next_ia) = ((ia + la - 1) % la, (ia + 1) % la);
            let (prev_ib, next_ib) = ((ib + lb - 1) % lb, (ib + 1) % lb);

            let vertex_a = self.a.points()[ia];
            let prev_a = self.a.points()[prev_ia];
            let next_a = self.a.points()[next_ia];
            let vertex_b = self.b.points()[ib];
            let prev_b = self.b.points()[prev_ib];
            let next_b = self.b.points()[next_ib];

            use VertexRef::{A, B};
            match contact.contact_type {
                ContactType::VertexVertex => {
                    vectors.push(TranslationVector::new(prev_a - vertex_a, A(ia), A(prev_ia)));
                    vectors.push(TranslationVector::new(next_a - vertex_a, A(ia), A(next_ia)));
                    // B edges run backwards relative to the motion
                    vectors.push(TranslationVector::new(vertex_b - prev_b, B(prev_ib), B(ib)));
                    vectors.push(TranslationVector::new(vertex_b - next_b, B(next_ib), B(ib)));
                }
                ContactType::VertexOnEdgeOfA => {
                    let vb = vertex_b + offset;
                    vectors.push(TranslationVector::new(vertex_a - vb, A(prev_ia), A(ia)));
                    vectors.push(TranslationVector::new(prev_a - vb, A(ia), A(prev_ia)));
                }
                ContactType::VertexOnEdgeOfB => {
                    vectors.push(TranslationVector::new(
                        vertex_a - (vertex_b + offset),
                        B(prev_ib),
                        B(ib),
                    ));
                    vectors.push(TranslationVector::new(
                        vertex_a - (prev_b + offset),
                        B(ib),
                        B(prev_ib),
                    ));
                }
            }
        }

        vectors
    }

    /// Picks the candidate with the longest collision-free slide.
    fn select(&self, vectors: &[TranslationVector], prev: Option<Point>) -> Option<(TranslationVector, f64)> {
        let mut best: Option<TranslationVector> = None;
        let mut max_d = 0.0;

        for candidate in vectors {
            let v = candidate.vector;
            if v.x == 0.0 && v.y == 0.0 {
                continue;
            }

            if let Some(prev) = prev {
                if v.dot(prev) < 0.0 && v.normalize().cross(prev.normalize()).abs() < RETRACE_TOLERANCE {
                    continue;
                }
            }

            let len2 = v.squared_length();
            let d = match polygon_slide_distance(&self.a, &self.b, v, true) {
                Some(d) if d * d <= len2 => d,
                _ => len2.sqrt(),
            };

            if d > max_d {
                max_d = d;
                best = Some(*candidate);
            }
        }

        best.map(|tv| (tv, max_d))
    }

    /// Traces one closed loop starting with B at `start`.
    fn trace(&mut self, start: Point) -> Option<Polygon> {
        self.b.set_offset(start);

        let limit = ITERATION_FACTOR * (self.a.len() + self.b.len());
        let origin = self.b.world_point(0);
        let mut reference = origin;
        let mut trace = vec![reference];
        let mut prev: Option<Point> = None;

        for _ in 0..limit {
            let contacts = self.contacts();
            let vectors = self.translation_vectors(&contacts);

            let Some((chosen, max_d)) = self.select(&vectors, prev) else {
                log::debug!("orbit stalled after {} steps: no free translation", trace.len());
                return None;
            };
            if approximately(max_d, 0.0) {
                log::debug!("orbit stalled after {} steps: zero slide", trace.len());
                return None;
            }

            self.visited.insert(chosen.start);
            self.visited.insert(chosen.end);

            let mut v = chosen.vector;
            let len2 = v.squared_length();
            let max_d2 = max_d * max_d;
            if max_d2 < len2 && !approximately(max_d2, len2) {
                v = v * (max_d2 / len2).sqrt();
            }

            prev = Some(v);
            reference = reference + v;

            let closed = reference.approx_eq(origin)
                || trace[..trace.len() - 1].iter().any(|p| p.approx_eq(reference));
            if closed {
                return (trace.len() >= 3).then(|| Polygon::new(trace));
            }

            trace.push(reference);
            self.b.set_offset(self.b.offset() + v);
        }

        log::warn!("orbit did not close within {} iterations", limit);
        None
    }

    /// Containment of B in A, judged by the first decidable B vertex.
    fn b_inside(&self) -> Option<bool> {
        self.b
            .world_points()
            .find_map(|p| point_in_polygon(p, &self.a).decided())
    }

    fn is_start(&self, b_inside: bool, inside: bool, found: &[Polygon]) -> bool {
        let reference = self.b.world_point(0);
        b_inside == inside
            && !polygons_intersect(&self.a, &self.b)
            && !found
                .iter()
                .flat_map(|nfp| nfp.points())
                .any(|p| p.approx_eq(reference))
    }

    /// Searches A's unvisited vertices for a non-overlapping placement of B.
    ///
    /// Returns B's offset, or `None` when nothing is left to try or the two
    /// polygons cannot be told apart (containment undecidable everywhere).
    fn search_start(&mut self, inside: bool, found: &[Polygon]) -> Option<Point> {
        let (la, lb) = (self.a.len(), self.b.len());

        for i in 0..la {
            if !self.visited.insert(VertexRef::A(i)) {
                continue;
            }
            let ai = self.a.points()[i];

            for j in 0..lb {
                let mut offset = ai - self.b.points()[j];
                self.b.set_offset(offset);

                let Some(mut b_inside) = self.b_inside() else {
                    log::debug!("start point search: polygons are indistinguishable");
                    return None;
                };
                if self.is_start(b_inside, inside, found) {
                    return Some(offset);
                }

                // slide B along A's edge until it stops overlapping
                let mut v = self.a.points()[(i + 1) % la] - ai;
                let d1 = polygon_projection_distance(&self.a, &self.b, v);
                let d2 = polygon_projection_distance(&self.b, &self.a, -v);
                let d = match (d1, d2) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                };
                let Some(d) = d.filter(|&d| d > 0.0 && !approximately(d, 0.0)) else {
                    continue;
                };

                let vd2 = v.squared_length();
                if d * d < vd2 && !approximately(d * d, vd2) {
                    v = v * (d / vd2.sqrt());
                }

                offset = offset + v;
                self.b.set_offset(offset);
                if let Some(decided) = self.b_inside() {
                    b_inside = decided;
                }
                if self.is_start(b_inside, inside, found) {
                    return Some(offset);
                }
            }
        }

        None
    }
}

/// Computes NFP loops of `b` around (or inside) `a` by orbiting.
///
/// Points are world positions of `b`'s first vertex. Without
/// `explore_edges` at most one loop is returned; an empty result means the
/// NFP is unavailable.
pub fn compute_nfp_orbiting(a: &Polygon, b: &Polygon, inside: bool, explore_edges: bool) -> Vec<Polygon> {
    if a.len() < 3 || b.len() < 3 {
        return Vec::new();
    }

    let mut orbit = Orbit::new(a, b);
    let mut start = if inside {
        orbit.search_start(true, &[])
    } else {
        Some(orbit.outer_start())
    };

    let mut found = Vec::new();
    while let Some(offset) = start {
        if let Some(nfp) = orbit.trace(offset) {
            found.push(nfp);
        }
        if !explore_edges {
            break;
        }
        start = orbit.search_start(inside, &found);
    }

    found
}

// ============================================================================
// Tests
// ============================================================================
