//! Parts to be nested and the shape identity used for NFP caching.

use crate::polygon::{Point, Polygon};
use orbitnest_core::{Error, Result, ShapeId};
use std::f64::consts::TAU;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a shape is a container or an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    /// A bin (container).
    Bin,
    /// A part (item).
    Part,
}

/// Identity of a shape in one rotation state.
///
/// Two shapes with the same kind, group and rotation index are assumed to
/// have identical geometry, so their NFPs can be shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    /// Bin or part.
    pub kind: ShapeKind,
    /// Group identity (the shape id unless a group is set).
    pub group: String,
    /// Rotation step index.
    pub rotation: usize,
}

impl ShapeKey {
    /// Creates a new key.
    pub fn new(kind: ShapeKind, group: impl Into<String>, rotation: usize) -> Self {
        Self {
            kind,
            group: group.into(),
            rotation,
        }
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.rotation)
    }
}

/// A polygonal part to be nested.
///
/// The outline is kept unrotated; [`Part::transform`] records a rotation
/// step and [`Part::shape`] materializes the rotated outline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    id: ShapeId,
    group: Option<String>,
    polygon: Polygon,
    rotation_index: usize,
    rotation: f64,
}

impl Part {
    /// Creates a part with an empty outline.
    pub fn new(id: impl Into<ShapeId>) -> Self {
        Self {
            id: id.into(),
            group: None,
            polygon: Polygon::default(),
            rotation_index: 0,
            rotation: 0.0,
        }
    }

    /// Sets the outline from `(x, y)` vertices.
    pub fn with_polygon(mut self, vertices: Vec<(f64, f64)>) -> Self {
        self.polygon = Polygon::from_coords(&vertices);
        self
    }

    /// Sets the outline from a polygon (its offset is discarded).
    pub fn with_outline(mut self, polygon: Polygon) -> Self {
        self.polygon = Polygon::new(polygon.into_points());
        self
    }

    /// Creates a rectangular part.
    pub fn rectangle(id: impl Into<ShapeId>, width: f64, height: f64) -> Self {
        Self::new(id).with_outline(Polygon::rectangle(width, height))
    }

    /// Creates an L-shaped part.
    pub fn l_shape(
        id: impl Into<ShapeId>,
        width: f64,
        height: f64,
        notch_width: f64,
        notch_height: f64,
    ) -> Self {
        Self::new(id).with_polygon(vec![
            (0.0, 0.0),
            (width, 0.0),
            (width, notch_height),
            (notch_width, notch_height),
            (notch_width, height),
            (0.0, height),
        ])
    }

    /// Sets the group identity. Parts sharing a group must share geometry.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Applies an initial rotation (radians) to the outline.
    pub fn with_initial_rotation(mut self, angle: f64) -> Self {
        self.polygon = self.polygon.rotate(angle);
        self
    }

    /// Applies an initial translation to the outline.
    pub fn with_initial_offset(mut self, dx: f64, dy: f64) -> Self {
        self.polygon = self.polygon.translate(dx, dy);
        self
    }

    /// Returns the part id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the group identity (the id when no group is set).
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.id)
    }

    /// Returns the unrotated outline.
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Returns the rotation step index.
    pub fn rotation_index(&self) -> usize {
        self.rotation_index
    }

    /// Returns the rotation angle in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Absolute area of the outline.
    pub fn area(&self) -> f64 {
        self.polygon.area().abs()
    }

    /// Returns a copy rotated to step `index` of `steps` (a fraction of a full turn).
    pub fn transform(&self, index: usize, steps: usize) -> Part {
        let steps = steps.max(1);
        let mut part = self.clone();
        part.rotation_index = index;
        part.rotation = index as f64 / steps as f64 * TAU;
        part
    }

    /// The outline rotated by the current rotation angle.
    pub fn shape(&self) -> Polygon {
        self.polygon.rotate(self.rotation)
    }

    /// The outline rotated, then translated by `position`.
    pub fn placed(&self, position: Point) -> Polygon {
        self.shape().translate(position.x, position.y)
    }

    /// Cache identity of this part in its current rotation.
    pub fn key(&self) -> ShapeKey {
        ShapeKey::new(ShapeKind::Part, self.group(), self.rotation_index)
    }

    /// Checks that the outline is a usable polygon.
    pub fn validate(&self) -> Result<()> {
        if self.polygon.len() < 3 {
            return Err(Error::InvalidGeometry(format!(
                "Part '{}' must have at least 3 vertices",
                self.id
            )));
        }

        if self
            .polygon
            .points()
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(Error::InvalidGeometry(format!(
                "Part '{}' has non-finite coordinates",
                self.id
            )));
        }

        if self.area() <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "Part '{}' has zero area",
                self.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_rectangle_part() {
        let part = Part::rectangle("R1", 10.0, 5.0);
        assert_eq!(part.id(), "R1");
        assert_eq!(part.group(), "R1");
        assert_relative_eq!(part.area(), 50.0);
        assert!(part.validate().is_ok());
    }

    #[test]
    fn test_l_shape_area() {
        let part = Part::l_shape("L1", 20.0, 20.0, 10.0, 10.0);
        assert_relative_eq!(part.area(), 300.0);
    }

    #[test]
    fn test_transform_sets_rotation() {
        let part = Part::rectangle("R1", 10.0, 5.0);
        let rotated = part.transform(1, 4);
        assert_eq!(rotated.rotation_index(), 1);
        assert_relative_eq!(rotated.rotation(), PI / 2.0);
        // source outline untouched
        assert_eq!(rotated.polygon(), part.polygon());

        let shape = rotated.shape();
        let bounds = shape.bounds();
        assert_relative_eq!(bounds.width(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.height(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_key_encodes_rotation_and_group() {
        let a = Part::rectangle("A", 1.0, 1.0);
        let b = Part::rectangle("B", 1.0, 1.0).with_group("A");

        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "A:0");
        assert_ne!(a.key(), a.transform(2, 4).key());
        assert_eq!(a.transform(2, 4).key().to_string(), "A:2");
    }

    #[test]
    fn test_initial_transform_is_baked() {
        let part = Part::rectangle("R", 4.0, 2.0)
            .with_initial_rotation(PI / 2.0)
            .with_initial_offset(10.0, 0.0);
        let bounds = part.polygon().bounds();
        assert_relative_eq!(bounds.min.x, 8.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.x, 10.0, epsilon = 1e-9);
        assert_eq!(part.rotation_index(), 0);
    }

    #[test]
    fn test_placed_outline() {
        let part = Part::rectangle("R", 2.0, 2.0);
        let placed = part.placed(Point::new(5.0, 7.0));
        assert_eq!(placed.points()[0], Point::new(5.0, 7.0));
    }

    #[test]
    fn test_validation() {
        assert!(Part::new("P").validate().is_err());
        assert!(Part::new("P")
            .with_polygon(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])
            .validate()
            .is_err());
        assert!(Part::new("P")
            .with_polygon(vec![(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0)])
            .validate()
            .is_err());
    }
}
