//! Corridor geometry for G-code motion blocks.
//!
//! Each motion block maps to a corridor the tool reference point must stay
//! inside while the optimizer shapes the trajectory through it: an oriented
//! rectangle for straight moves, an annular ring for arcs.

use std::collections::HashMap;

use crate::common::distance_between_points;
use crate::common::types::Point3;
use crate::error::{SchedulerError, SchedulerResult};
use crate::gcode::{ArcDirection, MotionBlock};

/// Collision shape of the tool
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolShape {
    /// Disk with the given radius; the only shape the scheduler supports
    Disk { radius: f64 },
    /// Rectangular footprint, kept for completeness of the tool
    /// description; rejected by the corridor builder
    Rectangle { width: f64, height: f64 },
}

/// Description of the tool: collision shape, kinematic limit and the
/// tolerance band its reference point may deviate from the programmed path.
#[derive(Debug, Clone)]
pub struct Tool {
    shape: ToolShape,
    /// Maximum speed of the tool reference point
    pub max_speed: f64,
    /// Half-width of the allowed deviation band around the programmed path
    pub tolerance: f64,
    /// Margin factor keeping the tool a little further from the border
    pub safety_scale: f64,
}

impl Tool {
    /// Create a tool description with the default safety scale
    pub fn new(shape: ToolShape, max_speed: f64, tolerance: f64) -> Self {
        Tool {
            shape,
            max_speed,
            tolerance,
            safety_scale: 1.2,
        }
    }

    /// Radius of the disk collision shape.
    ///
    /// Corridor margins are computed purely from this scalar, so any other
    /// shape is a configuration error.
    pub fn disk_radius(&self) -> SchedulerResult<f64> {
        match self.shape {
            ToolShape::Disk { radius } => Ok(radius),
            ToolShape::Rectangle { .. } => Err(SchedulerError::UnsupportedToolShape {
                shape: "rectangle".to_string(),
            }),
        }
    }

    /// Distance the tool reference point must keep from a corridor border
    pub fn margin(&self) -> SchedulerResult<f64> {
        Ok(self.disk_radius()? * self.safety_scale)
    }

    /// Configure the tool with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> SchedulerResult<()> {
        if let Some(&max_speed) = params.get("max_speed") {
            if max_speed <= 0.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "max_speed".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            self.max_speed = max_speed;
        }

        if let Some(&tolerance) = params.get("tolerance") {
            if tolerance <= 0.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "tolerance".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            self.tolerance = tolerance;
        }

        if let Some(&safety_scale) = params.get("safety_scale") {
            if safety_scale < 1.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "safety_scale".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            self.safety_scale = safety_scale;
        }

        Ok(())
    }
}

/// Oriented rectangle border for a straight move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Length of the move
    pub width: f64,
    /// Tolerance band across the move
    pub height: f64,
    /// Rotation of the long axis in the XY plane
    pub orientation: f64,
}

/// Annular ring border for an arc move; start and end are expressed
/// relative to the arc center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub radius_in: f64,
    pub radius_out: f64,
    pub start: Point3,
    pub end: Point3,
    pub direction: ArcDirection,
}

/// Border shape of a corridor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorridorShape {
    Rect(Rectangle),
    Ring(Ring),
}

/// Position and in-plane orientation of a corridor border
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3,
    pub orientation: f64,
}

/// Geometric region a single motion block maps to.
///
/// Corridors are created once per block, in program order, and are
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Corridor {
    pub shape: CorridorShape,
    pub pose: Pose,
    pub entry: Point3,
    pub exit: Point3,
    /// Position of the source block in the program
    pub block_index: usize,
}

/// Convert a program of motion blocks into the ordered corridor sequence.
///
/// Fails fast when the tool shape cannot be scheduled or a block's
/// geometry is inconsistent.
pub fn build_corridors(blocks: &[MotionBlock], tool: &Tool) -> SchedulerResult<Vec<Corridor>> {
    // margins only make sense for a disk shaped tool
    tool.disk_radius()?;

    if blocks.is_empty() {
        return Err(SchedulerError::EmptyProgram);
    }

    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| build_corridor(index, block, tool.tolerance))
        .collect()
}

fn build_corridor(index: usize, block: &MotionBlock, tolerance: f64) -> SchedulerResult<Corridor> {
    match block {
        MotionBlock::Line { start, end } => {
            let width = distance_between_points(start, end);
            let orientation = (end.y - start.y).atan2(end.x - start.x);
            let shape = CorridorShape::Rect(Rectangle {
                width,
                height: tolerance,
                orientation,
            });
            let pose = Pose {
                position: start + (end - start) * 0.5,
                orientation,
            };
            Ok(Corridor {
                shape,
                pose,
                entry: *start,
                exit: *end,
                block_index: index,
            })
        }
        MotionBlock::Arc {
            start,
            end,
            center,
            radius,
            direction,
        } => {
            if *radius <= tolerance {
                return Err(SchedulerError::MalformedBlock {
                    index,
                    reason: format!(
                        "arc radius {radius} does not exceed the tolerance band {tolerance}"
                    ),
                });
            }
            for (label, point) in [("start", start), ("end", end)] {
                let r = distance_between_points(point, center);
                if (r - radius).abs() > tolerance {
                    return Err(SchedulerError::MalformedBlock {
                        index,
                        reason: format!(
                            "arc {label} point lies at radius {r}, expected {radius}"
                        ),
                    });
                }
            }
            let shape = CorridorShape::Ring(Ring {
                radius_in: radius - tolerance,
                radius_out: radius + tolerance,
                start: start - center,
                end: end - center,
                direction: *direction,
            });
            Ok(Corridor {
                shape,
                pose: Pose {
                    position: *center,
                    orientation: 0.0,
                },
                entry: *start,
                exit: *end,
                block_index: index,
            })
        }
    }
}
