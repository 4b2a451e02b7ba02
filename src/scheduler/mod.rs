//! Sliding-window scheduling of corridor segments.
//!
//! A full G-code program is too large to optimize at once, so the scheduler
//! keeps a bounded window of upcoming corridors, hands it to the external
//! optimizer every control tick, and moves the window up one corridor each
//! time the tool clears the first segment. Warm starts for the new window
//! are stitched from the previous solution.

pub mod guess;
pub mod stitch;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::common::types::Point3;
use crate::common::ToolState;
use crate::error::{SchedulerError, SchedulerResult};
use crate::gcode::MotionBlock;
use crate::geometry::{build_corridors, Corridor, CorridorShape, Tool};
use crate::optimizer::{SegmentGuess, SegmentSolution, TrajectoryOptimizer, WindowGuess};
use crate::spline::BSplineBasis;

use self::guess::centerline_guess;
use self::stitch::stitch_solutions;

/// A corridor wrapped for the window: border geometry plus the waypoints
/// and global program index the scheduler works with.
#[derive(Debug, Clone)]
pub struct Segment {
    corridor: Corridor,
    limits: Option<[f64; 4]>,
}

impl Segment {
    pub fn from_corridor(corridor: Corridor) -> Self {
        // simple bounds exist only for rectangular borders; a ring has no
        // useful axis-aligned box
        let limits = match corridor.shape {
            CorridorShape::Rect(rect) => {
                let p = corridor.pose.position;
                Some([
                    p.x - rect.width * 0.5,
                    p.y - rect.height * 0.5,
                    p.x + rect.width * 0.5,
                    p.y + rect.height * 0.5,
                ])
            }
            CorridorShape::Ring(_) => None,
        };
        Segment { corridor, limits }
    }

    /// Position of the source block in the program
    pub fn index(&self) -> usize {
        self.corridor.block_index
    }

    pub fn entry(&self) -> Point3 {
        self.corridor.entry
    }

    pub fn exit(&self) -> Point3 {
        self.corridor.exit
    }

    pub fn corridor(&self) -> &Corridor {
        &self.corridor
    }

    /// Axis-aligned `[xmin, ymin, xmax, ymax]` for rectangular borders
    pub fn limits(&self) -> Option<[f64; 4]> {
        self.limits
    }
}

/// The contiguous run of segments currently handed to the optimizer.
#[derive(Debug, Clone)]
pub struct SegmentWindow {
    segments: Vec<Segment>,
}

impl SegmentWindow {
    fn fill(corridors: &[Corridor], start: usize, lookahead: usize) -> Self {
        let end = (start + lookahead).min(corridors.len());
        SegmentWindow {
            segments: corridors[start..end]
                .iter()
                .cloned()
                .map(Segment::from_corridor)
                .collect(),
        }
    }

    /// Drop the first segment and append the next corridor, if any remains.
    fn advance(&mut self, next: Option<Corridor>) {
        self.segments.remove(0);
        if let Some(corridor) = next {
            self.segments.push(Segment::from_corridor(corridor));
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    // the scheduler keeps the window non-empty until the terminal state
    fn first_segment(&self) -> &Segment {
        &self.segments[0]
    }

    fn last_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }
}

/// Scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of corridors optimized together (the look-ahead width)
    pub lookahead: usize,
    /// Degree of the trajectory basis
    pub basis_degree: usize,
    /// Number of knot intervals of the trajectory basis
    pub basis_intervals: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            lookahead: 1,
            basis_degree: 3,
            basis_intervals: 10,
        }
    }
}

impl SchedulerConfig {
    /// Configure with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> SchedulerResult<()> {
        if let Some(&lookahead) = params.get("lookahead") {
            if lookahead < 1.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "lookahead".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            self.lookahead = lookahead as usize;
        }

        if let Some(&degree) = params.get("basis_degree") {
            if degree < 2.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "basis_degree".to_string(),
                    reason: "must be at least 2".to_string(),
                });
            }
            self.basis_degree = degree as usize;
        }

        if let Some(&intervals) = params.get("basis_intervals") {
            if intervals < 1.0 {
                return Err(SchedulerError::InvalidParameter {
                    name: "basis_intervals".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            self.basis_intervals = intervals as usize;
        }

        Ok(())
    }

    fn basis(&self) -> BSplineBasis {
        BSplineBasis::clamped(self.basis_degree, self.basis_intervals)
    }
}

/// Phase of the current scheduler iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// The tool is still travelling the first windowed segment
    AtSegmentStart,
    /// The first segment was cleared and the window moved up
    Advancing,
    /// The goal was reached on the final segment
    Terminal,
}

/// Whether a previous window solve is available for warm starting
#[derive(Debug)]
enum WarmStart {
    Cold,
    Solved(Vec<SegmentSolution>),
}

/// Result of one scheduler tick
#[derive(Debug)]
pub enum StepOutcome {
    Continue,
    Finished(RunSummary),
}

/// Statistics reported on normal termination.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Total corridors in the executed program
    pub blocks_executed: usize,
    /// Control ticks taken
    pub ticks: usize,
    /// Windows handed to the optimizer (initial build plus advances)
    pub windows_built: usize,
    pub max_solve_time: Duration,
    pub mean_solve_time: Duration,
}

/// The receding-horizon scheduler loop.
///
/// Owns the corridor sequence, the sliding window and the guess buffers;
/// the optimizer owns spline coefficients and motion times behind its
/// handle. Single-threaded: one `step` equals one solve call.
pub struct WindowScheduler<O: TrajectoryOptimizer> {
    optimizer: O,
    tool: Tool,
    corridors: Vec<Corridor>,
    window: SegmentWindow,
    basis: BSplineBasis,
    /// Global index of the first windowed corridor
    next_block: usize,
    current_state: ToolState,
    goal_state: Point3,
    handle: Option<O::Handle>,
    warm_start: WarmStart,
    last_trace: Vec<ToolState>,
    motion_times: Vec<f64>,
    solve_times: Vec<Duration>,
    ticks: usize,
    windows_built: usize,
    phase: SchedulerPhase,
}

impl<O: TrajectoryOptimizer> WindowScheduler<O> {
    /// Build the corridor sequence for `blocks` and set up the first
    /// window. `initial_state` is the tool's predicted state at the entry
    /// of the first corridor.
    pub fn new(
        blocks: &[MotionBlock],
        tool: Tool,
        config: &SchedulerConfig,
        optimizer: O,
        initial_state: ToolState,
    ) -> SchedulerResult<Self> {
        if config.lookahead == 0 {
            return Err(SchedulerError::InvalidParameter {
                name: "lookahead".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if config.basis_degree < 2 {
            return Err(SchedulerError::InvalidParameter {
                name: "basis_degree".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        let corridors = build_corridors(blocks, &tool)?;
        let goal_state = corridors[corridors.len() - 1].exit;
        let window = SegmentWindow::fill(&corridors, 0, config.lookahead);
        Ok(WindowScheduler {
            optimizer,
            tool,
            corridors,
            window,
            basis: config.basis(),
            next_block: 0,
            current_state: initial_state,
            goal_state,
            handle: None,
            warm_start: WarmStart::Cold,
            last_trace: Vec::new(),
            motion_times: Vec::new(),
            solve_times: Vec::new(),
            ticks: 0,
            windows_built: 0,
            phase: SchedulerPhase::AtSegmentStart,
        })
    }

    /// One receding-horizon iteration: advance the window if the first
    /// segment is cleared, regenerate guesses, then run one solve.
    pub fn step(&mut self, current_time: f64, update_time: f64) -> SchedulerResult<StepOutcome> {
        if self.phase == SchedulerPhase::Terminal {
            return Ok(StepOutcome::Finished(self.summary()));
        }

        if self.handle.is_none() {
            let guess = self.window_guess(Vec::new())?;
            self.rebuild(&guess)?;
        } else if self.segment_cleared() {
            if self.can_advance() {
                self.phase = SchedulerPhase::Advancing;
                let append_index = self.next_block + self.window.len();
                self.next_block += 1;
                let next = self.corridors.get(append_index).cloned();
                self.window.advance(next);
                debug!(
                    "window advanced to block {} ({} segments)",
                    self.next_block,
                    self.window.len()
                );
                let previous = match std::mem::replace(&mut self.warm_start, WarmStart::Cold) {
                    WarmStart::Solved(previous) => previous,
                    WarmStart::Cold => Vec::new(),
                };
                let guess = self.window_guess(previous)?;
                self.rebuild(&guess)?;
            } else {
                // the final segment sits on its exit; keep solving until
                // the optimizer reports its stop criterion
                self.refresh_motion_times();
            }
        } else {
            self.phase = SchedulerPhase::AtSegmentStart;
            self.refresh_motion_times();
        }

        let solution = match self.handle.as_mut() {
            Some(handle) => {
                let started = Instant::now();
                let solution = self.optimizer.solve(handle, current_time, update_time)?;
                self.solve_times.push(started.elapsed());
                solution
            }
            None => {
                return Err(SchedulerError::Optimizer(crate::optimizer::OptimizerError::new(
                    "solve requested before a window was built",
                )))
            }
        };

        self.ticks += 1;
        self.motion_times = solution.segments.iter().map(|s| s.motion_time).collect();
        if let Some(last) = solution.trace.last() {
            self.current_state = *last;
        }
        self.last_trace = solution.trace;
        self.warm_start = WarmStart::Solved(solution.segments);

        let at_goal = self.window.last_segment().exit() == self.goal_state;
        let stopped = match self.handle.as_ref() {
            Some(handle) => self.optimizer.stop_criterion(handle),
            None => false,
        };
        if at_goal && stopped {
            self.phase = SchedulerPhase::Terminal;
            let summary = self.summary();
            info!(
                "tool reached its goal: {} G-code blocks executed",
                summary.blocks_executed
            );
            return Ok(StepOutcome::Finished(summary));
        }
        Ok(StepOutcome::Continue)
    }

    /// Drive `step` until the terminal state.
    pub fn run(&mut self, update_time: f64) -> SchedulerResult<RunSummary> {
        let mut current_time = 0.0;
        loop {
            match self.step(current_time, update_time)? {
                StepOutcome::Finished(summary) => return Ok(summary),
                StepOutcome::Continue => current_time += update_time,
            }
        }
    }

    /// The first segment counts as cleared once the live position sits
    /// exactly on its exit waypoint. Exact comparison is brittle under
    /// floating-point simulation, but a tolerance would shift termination
    /// timing; the check runs every tick even though each tick executes
    /// only a small step.
    fn segment_cleared(&self) -> bool {
        self.current_state.position == self.window.first_segment().exit()
    }

    fn can_advance(&self) -> bool {
        self.window.len() > 1
            || self
                .corridors
                .get(self.next_block + self.window.len())
                .is_some()
    }

    /// Assemble guesses for every window slot. `previous` holds the last
    /// solve's per-slot solutions, empty on the first build: slot 0 is
    /// stitched from the two leading solutions where possible, unchanged
    /// slots shift up by one, and fresh corridors fall back to the
    /// centerline.
    fn window_guess(&self, previous: Vec<SegmentSolution>) -> SchedulerResult<WindowGuess> {
        let mut segments = Vec::with_capacity(self.window.len());
        for (slot, segment) in self.window.segments().iter().enumerate() {
            let guess = if slot == 0 && previous.len() >= 2 {
                match stitch_solutions(&previous[0], &previous[1], &self.basis, segment.index()) {
                    Ok(stitched) => stitched,
                    Err(SchedulerError::StitchSingularity { index }) => {
                        warn!(
                            "stitched guess for segment {index} is singular, \
                             substituting the centerline"
                        );
                        centerline_guess(segment, &self.basis, &self.tool)?
                    }
                    Err(other) => return Err(other),
                }
            } else if slot > 0 && slot + 1 < previous.len() {
                let prior = &previous[slot + 1];
                SegmentGuess {
                    coeffs: [
                        prior.splines[0].coeffs().to_vec(),
                        prior.splines[1].coeffs().to_vec(),
                        prior.splines[2].coeffs().to_vec(),
                    ],
                    motion_time: prior.motion_time,
                }
            } else {
                centerline_guess(segment, &self.basis, &self.tool)?
            };
            segments.push(guess);
        }
        Ok(WindowGuess {
            segments,
            initial: self.current_state,
            terminal: self.window.last_segment().exit(),
        })
    }

    /// Hand the current window to the optimizer. Called exactly once per
    /// window change; the zero baseline keeps velocity continuity anchored
    /// to the last commanded input instead of restarting from rest.
    fn rebuild(&mut self, guess: &WindowGuess) -> SchedulerResult<()> {
        let mut handle = self
            .optimizer
            .build(self.window.segments(), guess, &self.tool)?;
        self.optimizer.initialize(&mut handle, 0.0);
        self.handle = Some(handle);
        self.windows_built += 1;
        self.motion_times = guess.segments.iter().map(|g| g.motion_time).collect();
        Ok(())
    }

    /// Re-read the optimizer's time variables; they shrink over the
    /// horizon as solve calls consume motion time.
    fn refresh_motion_times(&mut self) {
        if let Some(handle) = self.handle.as_ref() {
            for slot in 0..self.window.len() {
                self.motion_times[slot] = self.optimizer.motion_time(handle, slot);
            }
        }
    }

    fn summary(&self) -> RunSummary {
        let max_solve_time = self.solve_times.iter().max().copied().unwrap_or_default();
        let total: Duration = self.solve_times.iter().sum();
        let mean_solve_time = if self.solve_times.is_empty() {
            Duration::default()
        } else {
            total / self.solve_times.len() as u32
        };
        RunSummary {
            blocks_executed: self.corridors.len(),
            ticks: self.ticks,
            windows_built: self.windows_built,
            max_solve_time,
            mean_solve_time,
        }
    }

    pub fn current_state(&self) -> ToolState {
        self.current_state
    }

    pub fn goal_state(&self) -> Point3 {
        self.goal_state
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn window(&self) -> &SegmentWindow {
        &self.window
    }

    /// Latest motion-time estimates for the windowed segments
    pub fn motion_times(&self) -> &[f64] {
        &self.motion_times
    }

    /// Trajectory samples executed during the most recent tick
    pub fn executed_trace(&self) -> &[ToolState] {
        &self.last_trace
    }
}
