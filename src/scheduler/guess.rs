//! Centerline initial guesses for segments without a prior solution.
//!
//! The guess resamples the segment's straight or arc centerline at the
//! trajectory basis's Greville points, using a per-axis arc-length
//! parameterization, and pairs it with a deliberately conservative
//! motion-time estimate to seed the optimizer's free time variable.

use std::f64::consts::TAU;

use crate::common::types::Point3;
use crate::error::{SchedulerError, SchedulerResult};
use crate::gcode::ArcDirection;
use crate::geometry::{CorridorShape, Tool};
use crate::optimizer::SegmentGuess;
use crate::scheduler::Segment;
use crate::spline::BSplineBasis;

/// Samples taken along an arc centerline
const ARC_SAMPLES: usize = 50;

/// Breakpoints this close to 1 are snapped to exactly 1 so interpolation
/// never extrapolates past the domain end
const UNIT_SNAP: f64 = 1e-5;

/// Build the centerline guess for one segment.
///
/// Fails with [`SchedulerError::DegenerateSegment`] when entry and exit
/// coincide on every axis, since no arc-length parameterization exists.
pub fn centerline_guess(
    segment: &Segment,
    basis: &BSplineBasis,
    tool: &Tool,
) -> SchedulerResult<SegmentGuess> {
    let points = centerline_points(segment);
    let values: [Vec<f64>; 3] = [
        points.iter().map(|p| p.x).collect(),
        points.iter().map(|p| p.y).collect(),
        points.iter().map(|p| p.z).collect(),
    ];

    let mut params: [Vec<f64>; 3] = [
        axis_parameter(&values[0]),
        axis_parameter(&values[1]),
        axis_parameter(&values[2]),
    ];
    if params.iter().all(|p| is_constant(p)) {
        return Err(SchedulerError::DegenerateSegment {
            index: segment.index(),
        });
    }
    borrow_parameters(&mut params);

    let greville = basis.greville();
    let mut coeffs: [Vec<f64>; 3] = Default::default();
    for axis in 0..3 {
        let mut c: Vec<f64> = greville
            .iter()
            .map(|&g| interpolate(&params[axis], &values[axis], g))
            .collect();
        // zero terminal velocity and acceleration, matching the boundary
        // condition the optimizer enforces at the segment end
        let n = c.len();
        c[n - 2] = c[n - 1];
        c[n - 3] = c[n - 1];
        coeffs[axis] = c;
    }

    let length: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let motion_time = length / (tool.max_speed * 0.5);

    Ok(SegmentGuess {
        coeffs,
        motion_time,
    })
}

/// Sample the segment centerline: the chord for a straight corridor, a
/// direction-aware sweep at the mean ring radius for an arc corridor.
fn centerline_points(segment: &Segment) -> Vec<Point3> {
    match segment.corridor().shape {
        CorridorShape::Rect(_) => vec![segment.entry(), segment.exit()],
        CorridorShape::Ring(ring) => {
            let center = segment.corridor().pose.position;
            let entry = segment.entry();
            let exit = segment.exit();
            let mut start_angle = (entry.y - center.y).atan2(entry.x - center.x);
            let mut end_angle = (exit.y - center.y).atan2(exit.x - center.x);
            // unwrap so the sweep follows the commanded rotation without
            // wrapping through zero
            match ring.direction {
                ArcDirection::Cw => {
                    if start_angle < end_angle {
                        start_angle += TAU;
                    }
                }
                ArcDirection::Ccw => {
                    if start_angle > end_angle {
                        end_angle += TAU;
                    }
                }
            }
            let radius = (ring.radius_in + ring.radius_out) * 0.5;
            (0..ARC_SAMPLES)
                .map(|i| {
                    let s = start_angle
                        + (end_angle - start_angle) * i as f64 / (ARC_SAMPLES - 1) as f64;
                    Point3::new(
                        center.x + radius * s.cos(),
                        center.y + radius * s.sin(),
                        entry.z,
                    )
                })
                .collect()
        }
    }
}

/// Cumulative signed displacement normalized by the net axis displacement,
/// snapped to exactly 1 near the domain end. All zeros when the axis has no
/// net displacement.
fn axis_parameter(values: &[f64]) -> Vec<f64> {
    let net = values[values.len() - 1] - values[0];
    let mut param = Vec::with_capacity(values.len());
    param.push(0.0);
    for w in values.windows(2) {
        let next = if net != 0.0 {
            param[param.len() - 1] + (w[1] - w[0]) / net
        } else {
            0.0
        };
        param.push(next);
    }
    for t in &mut param {
        if (1.0 - *t).abs() < UNIT_SNAP {
            *t = 1.0;
        }
    }
    param
}

fn is_constant(param: &[f64]) -> bool {
    param.iter().all(|&t| t == 0.0)
}

/// Axes with no net displacement borrow another axis's parameterization so
/// their interpolant keeps a usable domain.
fn borrow_parameters(params: &mut [Vec<f64>; 3]) {
    if is_constant(&params[0]) {
        params[0] = if !is_constant(&params[1]) {
            params[1].clone()
        } else {
            params[2].clone()
        };
    }
    if is_constant(&params[1]) {
        params[1] = if !is_constant(&params[0]) {
            params[0].clone()
        } else {
            params[2].clone()
        };
    }
    if is_constant(&params[2]) {
        params[2] = if !is_constant(&params[0]) {
            params[0].clone()
        } else {
            params[1].clone()
        };
    }
}

/// Piecewise-linear interpolation over the breakpoints `t`, clamped to the
/// first/last value outside their range. The breakpoints of an arc axis are
/// not necessarily monotonic; the first bracketing interval wins.
fn interpolate(t: &[f64], v: &[f64], u: f64) -> f64 {
    let n = t.len();
    if u <= t[0] {
        return v[0];
    }
    if u >= t[n - 1] {
        return v[n - 1];
    }
    for i in 0..n - 1 {
        let (a, b) = (t[i], t[i + 1]);
        if (a <= u && u <= b) || (b <= u && u <= a) {
            if a == b {
                return v[i];
            }
            let w = (u - a) / (b - a);
            return v[i] + w * (v[i + 1] - v[i]);
        }
    }
    v[n - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::MotionBlock;
    use crate::geometry::{build_corridors, ToolShape};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn tool() -> Tool {
        Tool::new(ToolShape::Disk { radius: 0.05 }, 2.0, 0.2)
    }

    fn segment_for(block: MotionBlock) -> Segment {
        let corridors = build_corridors(&[block], &tool()).unwrap();
        Segment::from_corridor(corridors[0].clone())
    }

    #[test]
    fn line_guess_interpolates_entry_to_exit() {
        let segment = segment_for(MotionBlock::Line {
            start: Point3::new(1.0, 2.0, 0.0),
            end: Point3::new(5.0, 4.0, 0.0),
        });
        let basis = BSplineBasis::clamped(3, 10);
        let guess = centerline_guess(&segment, &basis, &tool()).unwrap();

        let n = guess.coeffs[0].len();
        assert_eq!(n, basis.len());
        assert_relative_eq!(guess.coeffs[0][0], 1.0);
        assert_relative_eq!(guess.coeffs[1][0], 2.0);
        assert_relative_eq!(guess.coeffs[0][n - 1], 5.0);
        assert_relative_eq!(guess.coeffs[1][n - 1], 4.0);
        // terminal coefficients forced equal for a zero-acceleration end
        assert_eq!(guess.coeffs[0][n - 2], guess.coeffs[0][n - 1]);
        assert_eq!(guess.coeffs[0][n - 3], guess.coeffs[0][n - 1]);
        // straight length 2*sqrt(5) at half of max speed 2.0
        assert_relative_eq!(guess.motion_time, 2.0 * 5.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn guess_is_deterministic() {
        let segment = segment_for(MotionBlock::Arc {
            start: Point3::new(1.0, 0.0, 0.0),
            end: Point3::new(0.0, 1.0, 0.0),
            center: Point3::zeros(),
            radius: 1.0,
            direction: ArcDirection::Ccw,
        });
        let basis = BSplineBasis::clamped(3, 10);
        let first = centerline_guess(&segment, &basis, &tool()).unwrap();
        let second = centerline_guess(&segment, &basis, &tool()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn degenerate_segment_is_rejected() {
        let segment = segment_for(MotionBlock::Line {
            start: Point3::new(3.0, 3.0, 1.0),
            end: Point3::new(3.0, 3.0, 1.0),
        });
        let basis = BSplineBasis::clamped(3, 10);
        let err = centerline_guess(&segment, &basis, &tool()).unwrap_err();
        assert!(matches!(err, SchedulerError::DegenerateSegment { index: 0 }));
    }

    #[test]
    fn ccw_quarter_arc_sweeps_through_the_diagonal() {
        let segment = segment_for(MotionBlock::Arc {
            start: Point3::new(1.0, 0.0, 0.0),
            end: Point3::new(0.0, 1.0, 0.0),
            center: Point3::zeros(),
            radius: 1.0,
            direction: ArcDirection::Ccw,
        });
        let points = centerline_points(&segment);
        assert_eq!(points.len(), ARC_SAMPLES);
        assert_relative_eq!(points[0].x, 1.0, epsilon = 1e-12);
        let mid = points[ARC_SAMPLES / 2];
        let mid_angle = mid.y.atan2(mid.x);
        assert!(mid_angle > 0.0 && mid_angle < FRAC_PI_2);
        // every sample stays on the mean ring radius
        for p in &points {
            assert_relative_eq!((p.x * p.x + p.y * p.y).sqrt(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn cw_arc_unwraps_instead_of_crossing_zero() {
        // CW from (1,0) to (0,1) must sweep the long way through the third
        // quadrant, not jump straight up
        let segment = segment_for(MotionBlock::Arc {
            start: Point3::new(1.0, 0.0, 0.0),
            end: Point3::new(0.0, 1.0, 0.0),
            center: Point3::zeros(),
            radius: 1.0,
            direction: ArcDirection::Cw,
        });
        let points = centerline_points(&segment);
        let mid = points[ARC_SAMPLES / 2];
        assert!(mid.x < 0.0 && mid.y < 0.0);
    }

    #[test]
    fn arc_motion_time_uses_the_swept_length() {
        let segment = segment_for(MotionBlock::Arc {
            start: Point3::new(1.0, 0.0, 0.0),
            end: Point3::new(-1.0, 0.0, 0.0),
            center: Point3::zeros(),
            radius: 1.0,
            direction: ArcDirection::Ccw,
        });
        let basis = BSplineBasis::clamped(3, 10);
        let guess = centerline_guess(&segment, &basis, &tool()).unwrap();
        // half-circle length is pi, not the chord of 2; sampled polyline is
        // marginally shorter than the true arc
        assert_relative_eq!(guess.motion_time, PI, epsilon = 2e-3);
    }
}
