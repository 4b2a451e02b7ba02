//! Error types for the scheduling core.
//!
//! Configuration problems are fatal and reported before any solve is
//! attempted; degenerate segments abort the affected iteration; a singular
//! stitch is recoverable and handled by the scheduler itself.

use thiserror::Error;

use crate::optimizer::OptimizerError;

/// Errors raised by corridor construction and the scheduler loop.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Corridor margins derive from a scalar tool radius, so only a disk
    /// collision shape can be scheduled.
    #[error("tool collision shape must be a disk, got {shape}")]
    UnsupportedToolShape { shape: String },

    /// A motion block describes geometry that cannot form a corridor.
    #[error("motion block {index} has malformed geometry: {reason}")]
    MalformedBlock { index: usize, reason: String },

    /// A configuration parameter failed validation.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The program contains no motion blocks to schedule.
    #[error("G-code program contains no motion blocks")]
    EmptyProgram,

    /// Entry and exit of a segment coincide on every axis, so no
    /// arc-length parameterization exists to seed a guess.
    #[error("segment {index} is degenerate: entry coincides with exit")]
    DegenerateSegment { index: usize },

    /// The collocation system for re-basing a stitched spline is singular.
    #[error("basis projection for segment {index} is singular")]
    StitchSingularity { index: usize },

    /// The external optimizer reported a failure; surfaced unchanged.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_segment() {
        let err = SchedulerError::DegenerateSegment { index: 4 };
        assert_eq!(
            err.to_string(),
            "segment 4 is degenerate: entry coincides with exit"
        );

        let err = SchedulerError::StitchSingularity { index: 2 };
        assert_eq!(err.to_string(), "basis projection for segment 2 is singular");
    }

    #[test]
    fn optimizer_failure_is_surfaced_unchanged() {
        let err: SchedulerError = OptimizerError::new("infeasible window").into();
        assert_eq!(err.to_string(), "infeasible window");
    }
}
