//! Rectangular bins (containers).

use crate::geometry::{ShapeKey, ShapeKind};
use crate::polygon::Polygon;
use orbitnest_core::{Error, Result, ShapeId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangular container.
///
/// The outline runs `(0,0) → (w,0) → (w,h) → (0,h)` from the bin origin,
/// which is already the solid orientation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bin {
    id: ShapeId,
    group: Option<String>,
    width: f64,
    height: f64,
    polygon: Polygon,
}

impl Bin {
    /// Creates a `width × height` bin anchored at the origin.
    pub fn new(id: impl Into<ShapeId>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            group: None,
            width,
            height,
            polygon: Polygon::rectangle(width, height),
        }
    }

    /// Moves the bin origin; placements are reported in the same frame.
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.polygon = Polygon::rectangle(self.width, self.height).translate(x, y);
        self
    }

    /// Sets the group identity. Bins sharing a group must share dimensions.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Returns the bin id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the group identity (the id when no group is set).
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.id)
    }

    /// Returns the width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the height.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Capacity (`width × height`).
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns the outline.
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Cache identity; bins are never rotated.
    pub fn key(&self) -> ShapeKey {
        ShapeKey::new(ShapeKind::Bin, self.group(), 0)
    }

    /// Checks the dimensions.
    pub fn validate(&self) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(Error::InvalidBoundary(format!(
                "Bin '{}' must have positive finite dimensions, got {} x {}",
                self.id, self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Part;
    use approx::assert_relative_eq;

    #[test]
    fn test_bin_rectangle() {
        let bin = Bin::new("sheet", 100.0, 50.0);
        assert_relative_eq!(bin.area(), 5000.0);
        assert_relative_eq!(bin.polygon().area(), -5000.0);
        assert!(bin.polygon().is_solid());
        assert!(bin.validate().is_ok());
    }

    #[test]
    fn test_bin_origin() {
        let bin = Bin::new("sheet", 10.0, 10.0).with_origin(5.0, -5.0);
        let bounds = bin.polygon().bounds();
        assert_relative_eq!(bounds.min.x, 5.0);
        assert_relative_eq!(bounds.max.y, 5.0);
        assert_relative_eq!(bin.area(), 100.0);
    }

    #[test]
    fn test_bin_key_never_collides_with_part() {
        let bin = Bin::new("X", 10.0, 10.0);
        let part = Part::rectangle("X", 10.0, 10.0);
        assert_eq!(bin.key().to_string(), part.key().to_string());
        assert_ne!(bin.key(), part.key());
    }

    #[test]
    fn test_bin_validation() {
        assert!(Bin::new("b", 0.0, 10.0).validate().is_err());
        assert!(Bin::new("b", 10.0, f64::INFINITY).validate().is_err());
        assert!(Bin::new("b", -1.0, 10.0).validate().is_err());
    }
}
