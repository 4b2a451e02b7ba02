//! Trajectory optimizer collaborator contract.
//!
//! The scheduler hands a window of segments plus an initial guess to an
//! optimizer through this trait and treats the returned splines and motion
//! times as read-only until the next window change. `build` is called
//! exactly once per window change, `solve` once per control tick.

use thiserror::Error;

use crate::common::types::Point3;
use crate::common::ToolState;
use crate::geometry::Tool;
use crate::scheduler::Segment;
use crate::spline::Spline;

pub mod passthrough;

pub use passthrough::PassthroughOptimizer;

/// Failure reported by the external optimizer; the scheduler surfaces it
/// unchanged and does not retry.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct OptimizerError(String);

impl OptimizerError {
    pub fn new(message: impl Into<String>) -> Self {
        OptimizerError(message.into())
    }
}

/// Result type alias for optimizer calls.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Initial guess for one windowed segment: spline coefficients per axis in
/// the canonical unit-time basis, plus a motion-time estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGuess {
    pub coeffs: [Vec<f64>; 3],
    pub motion_time: f64,
}

/// Initial guess for a whole window, with the boundary conditions the
/// optimizer must respect.
#[derive(Debug, Clone)]
pub struct WindowGuess {
    pub segments: Vec<SegmentGuess>,
    /// Live tool state at the window entry; carries the last commanded
    /// velocity so continuity survives re-planning
    pub initial: ToolState,
    /// Exit point of the last windowed segment
    pub terminal: Point3,
}

/// Solved trajectory for one windowed segment.
#[derive(Debug, Clone)]
pub struct SegmentSolution {
    /// One spline per axis (x, y, z) in the canonical unit-time basis
    pub splines: [Spline; 3],
    /// Solved duration of the segment
    pub motion_time: f64,
}

/// Output of one solve call.
#[derive(Debug, Clone)]
pub struct Solution {
    pub segments: Vec<SegmentSolution>,
    /// States executed during this tick, in order
    pub trace: Vec<ToolState>,
}

/// The external trajectory optimizer.
///
/// Implementations own the spline coefficients and per-segment time
/// variables behind the typed `Handle`.
pub trait TrajectoryOptimizer {
    type Handle;

    /// Set up a sub-problem for the given window and seed it with `guess`.
    fn build(
        &mut self,
        window: &[Segment],
        guess: &WindowGuess,
        tool: &Tool,
    ) -> OptimizerResult<Self::Handle>;

    /// Reset the internal clock. The scheduler passes zero after every
    /// window change so velocity continuity uses the last commanded input
    /// instead of restarting from rest.
    fn initialize(&mut self, handle: &mut Self::Handle, current_time: f64);

    /// Run one receding-horizon solve and execute a step of the result.
    fn solve(
        &mut self,
        handle: &mut Self::Handle,
        current_time: f64,
        update_time: f64,
    ) -> OptimizerResult<Solution>;

    /// Whether the optimizer considers the current window finished.
    fn stop_criterion(&self, handle: &Self::Handle) -> bool;

    /// Latest internal value of the motion-time variable for a window slot.
    fn motion_time(&self, handle: &Self::Handle, slot: usize) -> f64;
}
