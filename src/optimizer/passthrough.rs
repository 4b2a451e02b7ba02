//! Idealized optimizer that adopts the initial guess as its solution.
//!
//! Stands in for a real solver in the demo binary and in tests: each solve
//! call walks the tool along the first windowed segment's guess spline and
//! finishes on the segment exit. Real deployments provide their own
//! `TrajectoryOptimizer` implementation.

use crate::common::types::{Point3, Velocity3};
use crate::common::ToolState;
use crate::geometry::Tool;
use crate::scheduler::Segment;
use crate::spline::{BSplineBasis, Spline};

use super::{
    OptimizerError, OptimizerResult, SegmentSolution, Solution, TrajectoryOptimizer, WindowGuess,
};

/// Reference optimizer: no cost shaping, no constraint handling, just the
/// guess trajectory executed one segment per tick.
#[derive(Debug)]
pub struct PassthroughOptimizer {
    basis: BSplineBasis,
    samples_per_segment: usize,
}

/// Problem state for the window most recently built.
#[derive(Debug)]
pub struct PassthroughHandle {
    segments: Vec<SegmentSolution>,
    exits: Vec<Point3>,
    terminal: Point3,
    state: ToolState,
}

impl PassthroughOptimizer {
    pub fn new(basis: BSplineBasis) -> Self {
        PassthroughOptimizer {
            basis,
            samples_per_segment: 10,
        }
    }
}

impl TrajectoryOptimizer for PassthroughOptimizer {
    type Handle = PassthroughHandle;

    fn build(
        &mut self,
        window: &[Segment],
        guess: &WindowGuess,
        _tool: &Tool,
    ) -> OptimizerResult<Self::Handle> {
        if window.is_empty() {
            return Err(OptimizerError::new("cannot build an empty window"));
        }
        if window.len() != guess.segments.len() {
            return Err(OptimizerError::new("guess does not cover the window"));
        }
        let segments = guess
            .segments
            .iter()
            .map(|seg| {
                let [x, y, z] = seg.coeffs.clone();
                SegmentSolution {
                    splines: [
                        Spline::new(self.basis.clone(), x),
                        Spline::new(self.basis.clone(), y),
                        Spline::new(self.basis.clone(), z),
                    ],
                    motion_time: seg.motion_time,
                }
            })
            .collect();
        Ok(PassthroughHandle {
            segments,
            exits: window.iter().map(|seg| seg.exit()).collect(),
            terminal: guess.terminal,
            state: guess.initial,
        })
    }

    fn initialize(&mut self, _handle: &mut Self::Handle, _current_time: f64) {
        // the handle already carries the entry state, velocity included
    }

    fn solve(
        &mut self,
        handle: &mut Self::Handle,
        _current_time: f64,
        _update_time: f64,
    ) -> OptimizerResult<Solution> {
        let seg = &handle.segments[0];
        let steps = self.samples_per_segment;
        let dt = seg.motion_time / steps as f64;
        let mut trace = Vec::with_capacity(steps);
        let mut prev = handle.state.position;
        for i in 1..=steps {
            let u = i as f64 / steps as f64;
            // the scheduler's advance test compares positions exactly, so
            // the final sample must coincide with the exit waypoint
            let position = if i == steps {
                handle.exits[0]
            } else {
                Point3::new(
                    seg.splines[0].eval(u),
                    seg.splines[1].eval(u),
                    seg.splines[2].eval(u),
                )
            };
            let velocity = if i == steps {
                Velocity3::zeros()
            } else {
                (position - prev) / dt
            };
            trace.push(ToolState { position, velocity });
            prev = position;
        }
        if let Some(last) = trace.last() {
            handle.state = *last;
        }
        Ok(Solution {
            segments: handle.segments.clone(),
            trace,
        })
    }

    fn stop_criterion(&self, handle: &Self::Handle) -> bool {
        handle.state.position == handle.terminal
    }

    fn motion_time(&self, handle: &Self::Handle, slot: usize) -> f64 {
        handle.segments[slot].motion_time
    }
}
