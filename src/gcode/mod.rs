//! Typed G-code motion blocks.
//!
//! Parsing raw G-code text into these records happens upstream; the
//! scheduler only consumes the typed sequence, in program order.

use crate::common::types::Point3;

/// Rotational direction of an arc block (G02 is clockwise, G03
/// counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Cw,
    Ccw,
}

/// A single G-code motion block.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionBlock {
    /// Straight move (G00/G01)
    Line { start: Point3, end: Point3 },
    /// Circular arc in the XY plane (G02/G03)
    Arc {
        start: Point3,
        end: Point3,
        center: Point3,
        radius: f64,
        direction: ArcDirection,
    },
}

impl MotionBlock {
    /// Start point of the block
    pub fn start(&self) -> Point3 {
        match self {
            MotionBlock::Line { start, .. } => *start,
            MotionBlock::Arc { start, .. } => *start,
        }
    }

    /// End point of the block
    pub fn end(&self) -> Point3 {
        match self {
            MotionBlock::Line { end, .. } => *end,
            MotionBlock::Arc { end, .. } => *end,
        }
    }
}
