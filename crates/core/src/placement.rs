//! Placement representation for positioned parts.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a part or bin supplied by the caller.
pub type ShapeId = String;

/// Final position of one part inside one bin.
///
/// The part is rotated about the origin by `rotation` radians first and
/// then translated by `position`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// The bin holding the part.
    pub bin_id: ShapeId,
    /// The placed part.
    pub part_id: ShapeId,
    /// Translation applied after rotation.
    pub position: [f64; 2],
    /// Rotation angle in radians.
    pub rotation: f64,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(
        bin_id: impl Into<ShapeId>,
        part_id: impl Into<ShapeId>,
        x: f64,
        y: f64,
        rotation: f64,
    ) -> Self {
        Self {
            bin_id: bin_id.into(),
            part_id: part_id.into(),
            position: [x, y],
            rotation,
        }
    }

    /// Returns the x translation.
    pub fn x(&self) -> f64 {
        self.position[0]
    }

    /// Returns the y translation.
    pub fn y(&self) -> f64 {
        self.position[1]
    }

    /// Returns the rotation in degrees.
    pub fn rotation_degrees(&self) -> f64 {
        self.rotation.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_placement_accessors() {
        let p = Placement::new("sheet", "bracket", 12.5, -3.0, std::f64::consts::FRAC_PI_2);
        assert_eq!(p.bin_id, "sheet");
        assert_eq!(p.part_id, "bracket");
        assert_relative_eq!(p.x(), 12.5);
        assert_relative_eq!(p.y(), -3.0);
        assert_relative_eq!(p.rotation_degrees(), 90.0, epsilon = 1e-12);
    }
}
