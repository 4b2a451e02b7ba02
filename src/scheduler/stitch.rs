//! Warm-start stitching of two solved segments.
//!
//! The previous window's first two solved splines are concatenated on the
//! real time axis and projected back into the canonical basis of a single
//! segment by solving a collocation system at the basis's Greville points.

use nalgebra::DVector;

use crate::error::{SchedulerError, SchedulerResult};
use crate::optimizer::{SegmentGuess, SegmentSolution};
use crate::spline::{BSplineBasis, ConcatTrajectory};

/// Merge two adjacent solved segments into one guess over their combined
/// motion time.
///
/// Fails with [`SchedulerError::StitchSingularity`] when the collocation
/// system cannot be solved (degenerate time scaling or repeated knot
/// placement); the caller substitutes a centerline guess in that case.
pub fn stitch_solutions(
    first: &SegmentSolution,
    second: &SegmentSolution,
    unit_basis: &BSplineBasis,
    merged_index: usize,
) -> SchedulerResult<SegmentGuess> {
    let (t1, t2) = (first.motion_time, second.motion_time);
    if !(t1 > 0.0) || !(t2 > 0.0) {
        return Err(SchedulerError::StitchSingularity {
            index: merged_index,
        });
    }
    let total = t1 + t2;

    // canonical basis on the merged time domain
    let scaled = unit_basis.scaled(total);
    let mut greville = scaled.greville();
    let n = greville.len();
    // the outermost Greville points sit on the domain boundary where
    // evaluation is undefined under rounding; shift them slightly inward
    greville[0] += (greville[1] - greville[0]) * 0.01;
    greville[n - 1] -= (greville[n - 1] - greville[n - 2]) * 0.01;

    let lu = scaled.collocation_matrix(&greville).lu();

    let mut coeffs: [Vec<f64>; 3] = Default::default();
    for axis in 0..3 {
        let curve = ConcatTrajectory::new(&first.splines[axis], &second.splines[axis], t1, t2);
        let rhs = DVector::from_iterator(n, greville.iter().map(|&t| curve.eval(t)));
        let solved = lu.solve(&rhs).ok_or(SchedulerError::StitchSingularity {
            index: merged_index,
        })?;
        if solved.iter().any(|c| !c.is_finite()) {
            return Err(SchedulerError::StitchSingularity {
                index: merged_index,
            });
        }
        coeffs[axis] = solved.iter().copied().collect();
    }

    Ok(SegmentGuess {
        coeffs,
        motion_time: total,
    })
}
