//! Error types for orbitnest.

use thiserror::Error;

/// Result type alias for orbitnest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during nesting.
///
/// Inside a packing run the geometric variants are recovered locally: a
/// missing NFP leaves a part unplaced, a failed boolean operation skips a
/// candidate, and an exhausted bin ends the bin loop. They still carry
/// enough context to be logged or surfaced by lower-level APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// A containment or coincidence test could not decide (point on boundary).
    #[error("Geometry indeterminate: {0}")]
    GeometryIndeterminate(String),

    /// No NFP could be computed for a polygon pair.
    #[error("NFP unavailable: {0}")]
    NfpUnavailable(String),

    /// The clip engine failed on a union, difference or offset.
    #[error("Boolean operation failed: {0}")]
    BooleanOpFailure(String),

    /// A bin accepted no placements.
    #[error("Bin exhausted: {bin}")]
    BinExhausted {
        /// Identifier of the bin.
        bin: String,
    },

    /// Invalid geometry provided.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Invalid bin provided.
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Computation cancelled.
    #[error("Computation cancelled")]
    Cancelled,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for errors a packing run recovers from on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::GeometryIndeterminate(_)
                | Error::NfpUnavailable(_)
                | Error::BooleanOpFailure(_)
                | Error::BinExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NfpUnavailable("bin:0 / a:1".into());
        assert_eq!(err.to_string(), "NFP unavailable: bin:0 / a:1");

        let err = Error::BinExhausted { bin: "sheet".into() };
        assert_eq!(err.to_string(), "Bin exhausted: sheet");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::GeometryIndeterminate("on edge".into()).is_recoverable());
        assert!(Error::BooleanOpFailure("union".into()).is_recoverable());
        assert!(!Error::ConfigError("population".into()).is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
    }
}
