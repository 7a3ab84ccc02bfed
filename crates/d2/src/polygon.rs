//! Geometry kernel: points, polygons and bounding boxes.
//!
//! All comparisons go through [`approximately`] with a default tolerance of
//! `1e-9`, so vertices that differ only by floating-point noise are treated
//! as the same vertex.
//!
//! ## Orientation
//!
//! [`Polygon::area`] is the signed trapezoid sum
//! `0.5 * Σ (x[j] + x[i]) * (y[j] - y[i])` with `j` the previous vertex.
//! It is negative for loops that run clockwise on screen (y pointing down),
//! which is the orientation used for every solid polygon the NFP engine
//! produces.

use std::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default tolerance for approximate comparisons.
pub const TOLERANCE: f64 = 1e-9;

/// Returns true if `a` and `b` differ by less than [`TOLERANCE`].
#[inline]
pub fn approximately(a: f64, b: f64) -> bool {
    approximately_with(a, b, TOLERANCE)
}

/// Returns true if `a` and `b` differ by less than `tolerance`.
#[inline]
pub fn approximately_with(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// An immutable 2D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product (`self.x * other.y - self.y * other.x`).
    #[inline]
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared length.
    #[inline]
    pub fn squared_length(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f64 {
        self.squared_length().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Point {
        let len = self.length();
        if len == 0.0 {
            return self;
        }
        Point::new(self.x / len, self.y / len)
    }

    /// The vector rotated a quarter turn clockwise: `(y, -x)`.
    #[inline]
    pub fn perpendicular(self) -> Point {
        Point::new(self.y, -self.x)
    }

    /// Rotates about the origin by `angle` radians.
    pub fn rotate(self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Scales both coordinates.
    #[inline]
    pub fn scale(self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    /// Translates by `(dx, dy)`.
    #[inline]
    pub fn translate(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Returns true if both coordinates match within [`TOLERANCE`].
    #[inline]
    pub fn approx_eq(self, other: Point) -> bool {
        self.approx_eq_with(other, TOLERANCE)
    }

    /// Returns true if both coordinates match within `tolerance`.
    #[inline]
    pub fn approx_eq_with(self, other: Point, tolerance: f64) -> bool {
        approximately_with(self.x, other.x, tolerance) && approximately_with(self.y, other.y, tolerance)
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    #[inline]
    fn mul(self, rhs: f64) -> Point {
        self.scale(rhs)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point,
    /// Maximum corner.
    pub max: Point,
}

impl BoundingBox {
    /// Creates a box from two corners.
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set; `None` when empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Self { min, max })
    }

    /// Width of the box.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Area of the box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Returns the box shifted by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> BoundingBox {
        BoundingBox::new(self.min.translate(dx, dy), self.max.translate(dx, dy))
    }

    /// Returns true if `other` lies inside this box (within tolerance).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min.x >= self.min.x - TOLERANCE
            && other.min.y >= self.min.y - TOLERANCE
            && other.max.x <= self.max.x + TOLERANCE
            && other.max.y <= self.max.y + TOLERANCE
    }

    /// Returns true if the interiors overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x - TOLERANCE
            && other.min.x < self.max.x - TOLERANCE
            && self.min.y < other.max.y - TOLERANCE
            && other.min.y < self.max.y - TOLERANCE
    }
}

/// An ordered vertex loop (implicitly closed) plus a translation offset.
///
/// The offset is added to every vertex when a world position is needed;
/// area and bounds are computed on the untranslated vertices.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    points: Vec<Point>,
    offset: Point,
}

impl Polygon {
    /// Creates a polygon with a zero offset.
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            offset: Point::ORIGIN,
        }
    }

    /// Creates a polygon from coordinate pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&c| Point::from(c)).collect())
    }

    /// Axis-aligned rectangle with its first corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self::from_coords(&[(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)])
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    /// Returns the vertices.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the polygon and returns its vertices.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Returns the translation offset.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Replaces the translation offset.
    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertex `i` with the offset applied.
    #[inline]
    pub fn world_point(&self, i: usize) -> Point {
        self.points[i] + self.offset
    }

    /// All vertices with the offset applied.
    pub fn world_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().map(move |&p| p + self.offset)
    }

    /// Signed area (negative for solid polygons, see the module docs).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut j = n - 1;
        for i in 0..n {
            let (pj, pi) = (self.points[j], self.points[i]);
            sum += (pj.x + pi.x) * (pj.y - pi.y);
            j = i;
        }
        0.5 * sum
    }

    /// Bounds of the untranslated vertices.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.points.iter().copied()).unwrap_or_default()
    }

    /// Bounds with the offset applied.
    pub fn world_bounds(&self) -> BoundingBox {
        self.bounds().translate(self.offset.x, self.offset.y)
    }

    /// Returns a copy with every vertex moved by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Polygon {
        Polygon {
            points: self.points.iter().map(|p| p.translate(dx, dy)).collect(),
            offset: self.offset,
        }
    }

    /// Returns a copy rotated about the origin by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Polygon {
        if angle == 0.0 {
            return self.clone();
        }
        Polygon {
            points: self.points.iter().map(|p| p.rotate(angle)).collect(),
            offset: self.offset,
        }
    }

    /// Returns a copy with the vertex order reversed.
    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon {
            points,
            offset: self.offset,
        }
    }

    /// Returns true if the polygon has solid orientation (`area() <= 0`).
    pub fn is_solid(&self) -> bool {
        self.area() <= 0.0
    }

    /// Reverses the vertex order when the area is positive.
    pub fn into_solid(mut self) -> Polygon {
        if self.area() > 0.0 {
            self.points.reverse();
        }
        self
    }

    /// Solid-oriented copy that keeps the first vertex in place.
    ///
    /// The first vertex is the reference point NFPs are expressed in, so
    /// reorienting must not move it.
    pub fn to_solid_keep_first(&self) -> Polygon {
        if self.is_solid() || self.points.len() < 3 {
            return self.clone();
        }
        let mut points = Vec::with_capacity(self.points.len());
        points.push(self.points[0]);
        points.extend(self.points[1..].iter().rev().copied());
        Polygon {
            points,
            offset: self.offset,
        }
    }

    /// Returns true if every vertex matches the other polygon's within tolerance.
    pub fn approx_eq(&self, other: &Polygon) -> bool {
        self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(&other.points)
                .all(|(a, b)| a.approx_eq(*b))
    }

    /// Returns true if the polygon is an axis-aligned rectangle.
    pub fn is_axis_aligned_rectangle(&self) -> bool {
        if self.points.len() != 4 {
            return false;
        }
        let bounds = self.bounds();
        self.points.iter().all(|p| {
            (approximately(p.x, bounds.min.x) || approximately(p.x, bounds.max.x))
                && (approximately(p.y, bounds.min.y) || approximately(p.y, bounds.max.y))
        }) && approximately(self.area().abs(), bounds.area())
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Polygon::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn l_shape() -> Polygon {
        Polygon::from_coords(&[
            (0.0, 0.0),
            (30.0, 0.0),
            (30.0, 10.0),
            (10.0, 10.0),
            (10.0, 30.0),
            (0.0, 30.0),
        ])
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, -2.0);
        assert_eq!(a + b, Point::new(4.0, 2.0));
        assert_eq!(a - b, Point::new(2.0, 6.0));
        assert_eq!(-a, Point::new(-3.0, -4.0));
        assert_eq!(a * 2.0, Point::new(6.0, 8.0));
        assert_relative_eq!(a.dot(b), -5.0);
        assert_relative_eq!(a.cross(b), -10.0);
        assert_relative_eq!(a.length(), 5.0);
        assert_eq!(a.perpendicular(), Point::new(4.0, -3.0));
    }

    #[test]
    fn test_point_normalize_zero() {
        assert_eq!(Point::ORIGIN.normalize(), Point::ORIGIN);
        assert_relative_eq!(Point::new(0.0, 7.0).normalize().y, 1.0);
    }

    #[test]
    fn test_point_rotate() {
        let p = Point::new(1.0, 0.0).rotate(PI / 2.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_approx_eq() {
        let a = Point::new(1.0, 1.0);
        assert!(a.approx_eq(Point::new(1.0 + 1e-10, 1.0 - 1e-10)));
        assert!(!a.approx_eq(Point::new(1.0 + 1e-6, 1.0)));
        assert!(!a.approx_eq(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_rectangle_area_is_solid() {
        let rect = Polygon::rectangle(20.0, 15.0);
        assert_relative_eq!(rect.area(), -300.0);
        assert!(rect.is_solid());
        assert_relative_eq!(rect.reversed().area(), 300.0);
    }

    #[test]
    fn test_area_invariant_under_rotation() {
        let poly = l_shape();
        let area = poly.area();
        for k in 0..8 {
            let rotated = poly.rotate(k as f64 * PI / 4.0 + 0.1);
            assert_relative_eq!(rotated.area(), area, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bounds_shift_under_translation() {
        let poly = l_shape();
        let before = poly.bounds();
        let after = poly.translate(12.5, -7.0).bounds();
        assert_relative_eq!(after.min.x - before.min.x, 12.5);
        assert_relative_eq!(after.max.x - before.max.x, 12.5);
        assert_relative_eq!(after.min.y - before.min.y, -7.0);
        assert_relative_eq!(after.max.y - before.max.y, -7.0);
    }

    #[test]
    fn test_world_bounds_use_offset() {
        let poly = Polygon::rectangle(10.0, 5.0).with_offset(Point::new(3.0, 4.0));
        let bounds = poly.world_bounds();
        assert_eq!(bounds.min, Point::new(3.0, 4.0));
        assert_eq!(bounds.max, Point::new(13.0, 9.0));
        assert_eq!(poly.world_point(2), Point::new(13.0, 9.0));
        assert_relative_eq!(poly.area(), -50.0);
    }

    #[test]
    fn test_to_solid_keeps_first_vertex() {
        let ccw_screen = Polygon::rectangle(4.0, 2.0).reversed();
        assert!(!ccw_screen.is_solid());
        let first = ccw_screen.points()[0];

        let solid = ccw_screen.to_solid_keep_first();
        assert!(solid.is_solid());
        assert_eq!(solid.points()[0], first);
        assert_relative_eq!(solid.area(), -8.0);
    }

    #[test]
    fn test_into_solid() {
        let poly = Polygon::rectangle(2.0, 2.0).reversed().into_solid();
        assert!(poly.area() < 0.0);
    }

    #[test]
    fn test_bounding_box_ops() {
        let a = BoundingBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BoundingBox::new(Point::new(5.0, 5.0), Point::new(20.0, 8.0));
        let u = a.union(&b);
        assert_eq!(u.max, Point::new(20.0, 10.0));
        assert_relative_eq!(u.area(), 200.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&a.translate(10.0, 0.0)));
        assert!(u.contains(&a));
        assert!(!a.contains(&b));
        assert!(BoundingBox::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_axis_aligned_rectangle_detection() {
        assert!(Polygon::rectangle(5.0, 3.0).is_axis_aligned_rectangle());
        assert!(!l_shape().is_axis_aligned_rectangle());
        assert!(!Polygon::rectangle(5.0, 3.0)
            .rotate(0.3)
            .is_axis_aligned_rectangle());
    }
}
