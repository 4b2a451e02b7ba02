//! Receding-horizon toolpath scheduling core for the Vulcan CNC tool.
//!
//! A parsed G-code program is converted into a sequence of geometric
//! corridors, a bounded window of which is repeatedly handed to an external
//! trajectory optimizer. The scheduler advances the window as the tool
//! clears each corridor and warm-starts every new window by stitching the
//! previous solution.

pub mod common;
pub mod error;
pub mod gcode;
pub mod geometry;
pub mod optimizer;
pub mod scheduler;
pub mod spline;

pub use crate::common::ToolState;
pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::gcode::{ArcDirection, MotionBlock};
pub use crate::geometry::{Corridor, Tool, ToolShape};
pub use crate::optimizer::{PassthroughOptimizer, TrajectoryOptimizer};
pub use crate::scheduler::{
    RunSummary, SchedulerConfig, SchedulerPhase, StepOutcome, WindowScheduler,
};
