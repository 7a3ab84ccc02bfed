//! Solve result representation.

use crate::placement::{Placement, ShapeId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveResult {
    /// Placements of the incumbent candidate.
    pub placements: Vec<Placement>,

    /// IDs of parts that could not be placed.
    pub unplaced: Vec<ShapeId>,

    /// Cost of the incumbent (lower is better).
    pub cost: f64,

    /// Number of populations evaluated.
    pub generations: u32,

    /// Computation time in milliseconds.
    pub computation_time_ms: u64,

    /// Incumbent cost after each evaluated generation.
    pub cost_history: Vec<f64>,

    /// Whether the run was cancelled early.
    pub cancelled: bool,
}

impl SolveResult {
    /// Creates a new empty result.
    pub fn new() -> Self {
        Self {
            placements: Vec::new(),
            unplaced: Vec::new(),
            cost: 0.0,
            generations: 0,
            computation_time_ms: 0,
            cost_history: Vec::new(),
            cancelled: false,
        }
    }

    /// Returns true if every part found a place.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Returns the number of placed parts.
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// Returns the number of unplaced parts.
    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Returns the distinct bins holding at least one part, in placement order.
    pub fn bins_used(&self) -> Vec<&str> {
        let mut bins: Vec<&str> = Vec::new();
        for placement in &self.placements {
            if !bins.contains(&placement.bin_id.as_str()) {
                bins.push(&placement.bin_id);
            }
        }
        bins
    }

    /// Returns the placements inside one bin.
    pub fn placements_in<'a>(&'a self, bin_id: &'a str) -> impl Iterator<Item = &'a Placement> {
        self.placements.iter().filter(move |p| p.bin_id == bin_id)
    }

    /// Returns the placement of a part, if it was placed.
    pub fn placement_of(&self, part_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.part_id == part_id)
    }
}

impl Default for SolveResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_complete() {
        let result = SolveResult::default();
        assert!(result.is_complete());
        assert!(!result.cancelled);
        assert!(result.bins_used().is_empty());
    }

    #[test]
    fn test_bins_used_in_placement_order() {
        let mut result = SolveResult::new();
        result.placements.push(Placement::new("sheet-2", "flange", 0.0, 0.0, 0.0));
        result.placements.push(Placement::new("sheet-1", "bracket", 1.0, 0.0, 0.0));
        result.placements.push(Placement::new("sheet-2", "gusset", 5.0, 0.0, 0.0));

        assert_eq!(result.placed_count(), 3);
        assert_eq!(result.bins_used(), vec!["sheet-2", "sheet-1"]);
        assert_eq!(result.placements_in("sheet-2").count(), 2);
        assert_eq!(result.placement_of("bracket").map(|p| p.x()), Some(1.0));
        assert!(result.placement_of("rib").is_none());
    }

    #[test]
    fn test_unplaced_parts_make_result_incomplete() {
        let mut result = SolveResult::new();
        result.unplaced.push("rib".to_string());

        assert!(!result.is_complete());
        assert_eq!(result.unplaced_count(), 1);
    }
}
