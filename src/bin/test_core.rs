use std::collections::HashMap;

use anyhow::Result;
use nalgebra::Vector3;

use vulcan_core::scheduler::SchedulerConfig;
use vulcan_core::spline::BSplineBasis;
use vulcan_core::{
    ArcDirection, MotionBlock, PassthroughOptimizer, Tool, ToolShape, ToolState, WindowScheduler,
};

fn main() -> Result<()> {
    println!("Initializing Vulcan scheduling core...");

    // a small milled contour: two straight cuts joined by a quarter arc
    let program = vec![
        MotionBlock::Line {
            start: Vector3::new(0.0, 0.0, 0.0),
            end: Vector3::new(20.0, 0.0, 0.0),
        },
        MotionBlock::Arc {
            start: Vector3::new(20.0, 0.0, 0.0),
            end: Vector3::new(25.0, 5.0, 0.0),
            center: Vector3::new(20.0, 5.0, 0.0),
            radius: 5.0,
            direction: ArcDirection::Ccw,
        },
        MotionBlock::Line {
            start: Vector3::new(25.0, 5.0, 0.0),
            end: Vector3::new(25.0, 20.0, 0.0),
        },
    ];

    let mut tool = Tool::new(ToolShape::Disk { radius: 0.5 }, 50.0, 0.1);
    let mut params = HashMap::new();
    params.insert("max_speed".to_string(), 40.0);
    tool.configure(&params)?;

    let mut config = SchedulerConfig::default();
    let mut params = HashMap::new();
    params.insert("lookahead".to_string(), 2.0);
    config.configure(&params)?;

    let optimizer =
        PassthroughOptimizer::new(BSplineBasis::clamped(config.basis_degree, config.basis_intervals));
    let initial_state = ToolState::at_rest(program[0].start());

    let mut scheduler = WindowScheduler::new(&program, tool, &config, optimizer, initial_state)?;

    println!("Scheduling {} G-code blocks...", program.len());
    let summary = scheduler.run(0.01)?;

    println!("The tool has reached its goal!");
    println!("{} G-code blocks were executed.", summary.blocks_executed);
    println!(
        "Ticks: {}, windows built: {}",
        summary.ticks, summary.windows_built
    );
    println!(
        "Max solve time: {:.3} ms, mean solve time: {:.3} ms",
        summary.max_solve_time.as_secs_f64() * 1000.0,
        summary.mean_solve_time.as_secs_f64() * 1000.0
    );
    println!(
        "Final state: {:?}",
        scheduler.current_state().position.as_slice()
    );

    Ok(())
}
