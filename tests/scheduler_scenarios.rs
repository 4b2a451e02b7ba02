//! End-to-end scheduling scenarios.

use vulcan_core::common::types::Point3;
use vulcan_core::common::ToolState;
use vulcan_core::optimizer::{
    OptimizerResult, SegmentSolution, Solution, TrajectoryOptimizer, WindowGuess,
};
use vulcan_core::scheduler::{SchedulerConfig, Segment};
use vulcan_core::spline::{BSplineBasis, Spline};
use vulcan_core::{
    MotionBlock, PassthroughOptimizer, SchedulerError, SchedulerPhase, Tool, ToolShape,
    WindowScheduler,
};

fn tool() -> Tool {
    Tool::new(ToolShape::Disk { radius: 0.05 }, 2.0, 0.2)
}

fn config(lookahead: usize) -> SchedulerConfig {
    SchedulerConfig {
        lookahead,
        ..SchedulerConfig::default()
    }
}

fn basis_for(config: &SchedulerConfig) -> BSplineBasis {
    BSplineBasis::clamped(config.basis_degree, config.basis_intervals)
}

fn line(start: [f64; 3], end: [f64; 3]) -> MotionBlock {
    MotionBlock::Line {
        start: Point3::from(start),
        end: Point3::from(end),
    }
}

#[test]
fn two_block_program_terminates_at_the_corner_goal() {
    let program = vec![
        line([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]),
        line([10.0, 0.0, 0.0], [10.0, 10.0, 0.0]),
    ];
    let config = config(1);
    let optimizer = PassthroughOptimizer::new(basis_for(&config));
    let mut scheduler = WindowScheduler::new(
        &program,
        tool(),
        &config,
        optimizer,
        ToolState::at_rest(Point3::zeros()),
    )
    .unwrap();

    let summary = scheduler.run(0.1).unwrap();
    assert_eq!(summary.blocks_executed, 2);
    assert_eq!(summary.windows_built, 2);
    assert_eq!(
        scheduler.current_state().position,
        Point3::new(10.0, 10.0, 0.0)
    );
    assert_eq!(scheduler.phase(), SchedulerPhase::Terminal);
}

#[test]
fn lookahead_two_stitches_through_a_three_block_contour() {
    let program = vec![
        line([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]),
        line([10.0, 0.0, 0.0], [10.0, 10.0, 0.0]),
        line([10.0, 10.0, 0.0], [0.0, 10.0, 0.0]),
    ];
    let config = config(2);
    let optimizer = PassthroughOptimizer::new(basis_for(&config));
    let mut scheduler = WindowScheduler::new(
        &program,
        tool(),
        &config,
        optimizer,
        ToolState::at_rest(Point3::zeros()),
    )
    .unwrap();

    let summary = scheduler.run(0.1).unwrap();
    assert_eq!(summary.blocks_executed, 3);
    // initial build plus one advance per remaining block
    assert_eq!(summary.windows_built, 3);
    assert_eq!(
        scheduler.current_state().position,
        Point3::new(0.0, 10.0, 0.0)
    );
}

#[test]
fn zero_length_block_fails_with_a_degenerate_segment() {
    let program = vec![line([1.0, 1.0, 0.0], [1.0, 1.0, 0.0])];
    let config = config(1);
    let optimizer = PassthroughOptimizer::new(basis_for(&config));
    let mut scheduler = WindowScheduler::new(
        &program,
        tool(),
        &config,
        optimizer,
        ToolState::at_rest(Point3::new(1.0, 1.0, 0.0)),
    )
    .unwrap();

    let err = scheduler.step(0.0, 0.1).unwrap_err();
    assert!(matches!(err, SchedulerError::DegenerateSegment { index: 0 }));
}

/// Optimizer that needs several ticks per segment, so the scheduler's
/// no-advance path (motion-time refresh without a window change) runs.
struct CrawlOptimizer {
    basis: BSplineBasis,
    ticks_per_segment: usize,
}

struct CrawlHandle {
    segments: Vec<SegmentSolution>,
    exits: Vec<Point3>,
    terminal: Point3,
    state: ToolState,
    progress: usize,
}

impl TrajectoryOptimizer for CrawlOptimizer {
    type Handle = CrawlHandle;

    fn build(
        &mut self,
        window: &[Segment],
        guess: &WindowGuess,
        _tool: &Tool,
    ) -> OptimizerResult<Self::Handle> {
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
        Ok(CrawlHandle {
            segments,
            exits: window.iter().map(|seg| seg.exit()).collect(),
            terminal: guess.terminal,
            state: guess.initial,
            progress: 0,
        })
    }

    fn initialize(&mut self, handle: &mut Self::Handle, _current_time: f64) {
        handle.progress = 0;
    }

    fn solve(
        &mut self,
        handle: &mut Self::Handle,
        _current_time: f64,
        _update_time: f64,
    ) -> OptimizerResult<Solution> {
        handle.progress += 1;
        let seg = &handle.segments[0];
        let position = if handle.progress >= self.ticks_per_segment {
            handle.exits[0]
        } else {
            let u = handle.progress as f64 / self.ticks_per_segment as f64;
            Point3::new(
                seg.splines[0].eval(u),
                seg.splines[1].eval(u),
                seg.splines[2].eval(u),
            )
        };
        handle.state = ToolState::at_rest(position);
        Ok(Solution {
            segments: handle.segments.clone(),
            trace: vec![handle.state],
        })
    }

    fn stop_criterion(&self, handle: &Self::Handle) -> bool {
        handle.state.position == handle.terminal
    }

    fn motion_time(&self, handle: &Self::Handle, slot: usize) -> f64 {
        let remaining = if slot == 0 {
            1.0 - handle.progress as f64 / self.ticks_per_segment as f64
        } else {
            1.0
        };
        handle.segments[slot].motion_time * remaining
    }
}

#[test]
fn slow_optimizer_advances_only_on_exact_segment_exits() {
    let program = vec![
        line([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]),
        line([10.0, 0.0, 0.0], [10.0, 10.0, 0.0]),
    ];
    let config = config(1);
    let optimizer = CrawlOptimizer {
        basis: basis_for(&config),
        ticks_per_segment: 4,
    };
    let mut scheduler = WindowScheduler::new(
        &program,
        tool(),
        &config,
        optimizer,
        ToolState::at_rest(Point3::zeros()),
    )
    .unwrap();

    let summary = scheduler.run(0.1).unwrap();
    // four ticks per segment: the in-between ticks keep the window and only
    // refresh the motion-time estimates
    assert_eq!(summary.ticks, 8);
    assert_eq!(summary.windows_built, 2);
    assert_eq!(
        scheduler.current_state().position,
        Point3::new(10.0, 10.0, 0.0)
    );
}
