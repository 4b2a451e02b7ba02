//! B-spline machinery for trajectory guesses.
//!
//! The trajectory basis is a clamped B-spline basis over the unit time
//! domain, fixed for a whole run. The optimizer owns the coefficients; this
//! module provides the pieces the scheduler needs to create and re-base
//! initial guesses: Greville abscissae, basis evaluation, collocation
//! matrices and end-to-end concatenation of solved segment splines.

use nalgebra::DMatrix;

/// A clamped B-spline basis described by its knot vector and degree.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    knots: Vec<f64>,
    degree: usize,
}

impl BSplineBasis {
    /// Create a basis from an explicit knot vector.
    pub fn new(knots: Vec<f64>, degree: usize) -> Self {
        assert!(degree >= 1, "basis degree must be at least 1");
        assert!(
            knots.len() > 2 * degree + 1,
            "knot vector too short for degree {degree}"
        );
        assert!(
            knots.windows(2).all(|w| w[0] <= w[1]),
            "knot vector must be non-decreasing"
        );
        BSplineBasis { knots, degree }
    }

    /// Clamped basis over [0, 1] with uniformly spaced interior knots.
    pub fn clamped(degree: usize, intervals: usize) -> Self {
        assert!(intervals >= 1, "basis needs at least one knot interval");
        let mut knots = Vec::with_capacity(2 * (degree + 1) + intervals - 1);
        knots.extend(std::iter::repeat(0.0).take(degree + 1));
        for i in 1..intervals {
            knots.push(i as f64 / intervals as f64);
        }
        knots.extend(std::iter::repeat(1.0).take(degree + 1));
        BSplineBasis::new(knots, degree)
    }

    /// Number of basis functions (= number of spline coefficients)
    pub fn len(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Evaluation domain of the basis
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.len()])
    }

    /// Same basis on a time axis stretched by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        BSplineBasis {
            knots: self.knots.iter().map(|k| k * factor).collect(),
            degree: self.degree,
        }
    }

    /// Greville abscissae: the characteristic point of each basis function,
    /// the averaging of `degree` consecutive interior knots.
    pub fn greville(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.knots[i + 1..=i + self.degree].iter().sum::<f64>() / self.degree as f64
            })
            .collect()
    }

    /// Index of the knot span containing `u`, clamped into the domain.
    fn find_span(&self, u: f64) -> usize {
        let n = self.len();
        if u >= self.knots[n] {
            // final span: evaluation at the domain end belongs to the last
            // non-empty interval
            let mut k = n - 1;
            while k > self.degree && self.knots[k] >= self.knots[k + 1] {
                k -= 1;
            }
            return k;
        }
        if u <= self.knots[self.degree] {
            return self.degree;
        }
        let (mut low, mut high) = (self.degree, n);
        let mut mid = (low + high) / 2;
        while u < self.knots[mid] || u >= self.knots[mid + 1] {
            if u < self.knots[mid] {
                high = mid;
            } else {
                low = mid;
            }
            mid = (low + high) / 2;
        }
        mid
    }

    /// The `degree + 1` basis functions that are non-zero on `span`,
    /// evaluated at `u` (Cox-de Boor recurrence).
    fn basis_funs(&self, span: usize, u: f64) -> Vec<f64> {
        let d = self.degree;
        let mut values = vec![0.0; d + 1];
        let mut left = vec![0.0; d + 1];
        let mut right = vec![0.0; d + 1];
        values[0] = 1.0;
        for j in 1..=d {
            left[j] = u - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - u;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom != 0.0 { values[r] / denom } else { 0.0 };
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }
        values
    }

    /// Evaluate every basis function at each of `points`: one row per
    /// point, one column per basis function.
    pub fn collocation_matrix(&self, points: &[f64]) -> DMatrix<f64> {
        let n = self.len();
        let mut matrix = DMatrix::zeros(points.len(), n);
        for (row, &u) in points.iter().enumerate() {
            let span = self.find_span(u);
            let funs = self.basis_funs(span, u);
            for (j, value) in funs.iter().enumerate() {
                matrix[(row, span - self.degree + j)] = *value;
            }
        }
        matrix
    }
}

/// A scalar spline: one coefficient per basis function.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    basis: BSplineBasis,
    coeffs: Vec<f64>,
}

impl Spline {
    pub fn new(basis: BSplineBasis, coeffs: Vec<f64>) -> Self {
        assert_eq!(
            coeffs.len(),
            basis.len(),
            "coefficient count must match the basis"
        );
        Spline { basis, coeffs }
    }

    pub fn basis(&self) -> &BSplineBasis {
        &self.basis
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate the spline at `u` (clamped into the basis domain).
    pub fn eval(&self, u: f64) -> f64 {
        let span = self.basis.find_span(u);
        let funs = self.basis.basis_funs(span, u);
        funs.iter()
            .enumerate()
            .map(|(j, value)| value * self.coeffs[span - self.basis.degree + j])
            .sum()
    }
}

/// Two solved segment splines joined end to end on the real time axis.
///
/// Each spline lives in the canonical unit-time basis and is traversed on
/// its own clock; the junction is smooth to `degree - 1` by the boundary
/// conditions the optimizer enforces between adjacent segments.
#[derive(Debug)]
pub struct ConcatTrajectory<'a> {
    first: &'a Spline,
    second: &'a Spline,
    t1: f64,
    t2: f64,
}

impl<'a> ConcatTrajectory<'a> {
    pub fn new(first: &'a Spline, second: &'a Spline, t1: f64, t2: f64) -> Self {
        assert!(t1 > 0.0 && t2 > 0.0, "segment times must be positive");
        ConcatTrajectory {
            first,
            second,
            t1,
            t2,
        }
    }

    /// Total duration of the concatenated trajectory
    pub fn duration(&self) -> f64 {
        self.t1 + self.t2
    }

    /// Evaluate at real time `t` in [0, t1 + t2].
    pub fn eval(&self, t: f64) -> f64 {
        if t <= self.t1 {
            self.first.eval(t / self.t1)
        } else {
            self.second.eval((t - self.t1) / self.t2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clamped_basis_has_expected_size_and_domain() {
        let basis = BSplineBasis::clamped(3, 10);
        assert_eq!(basis.len(), 13);
        assert_eq!(basis.domain(), (0.0, 1.0));
        assert_eq!(basis.knots().len(), 17);
    }

    #[test]
    fn basis_functions_sum_to_one_across_the_domain() {
        let basis = BSplineBasis::clamped(3, 7);
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            let span = basis.find_span(u);
            let total: f64 = basis.basis_funs(span, u).iter().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn greville_points_span_the_unit_domain() {
        let basis = BSplineBasis::clamped(3, 10);
        let greville = basis.greville();
        assert_eq!(greville.len(), basis.len());
        assert_eq!(greville[0], 0.0);
        assert_eq!(*greville.last().unwrap(), 1.0);
        assert!(greville.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn greville_coefficients_reproduce_the_identity() {
        // linear precision: a spline whose coefficients are the Greville
        // abscissae evaluates to u itself
        let basis = BSplineBasis::clamped(3, 8);
        let spline = Spline::new(basis.clone(), basis.greville());
        for i in 0..=16 {
            let u = i as f64 / 16.0;
            assert_relative_eq!(spline.eval(u), u, epsilon = 1e-12);
        }
    }

    #[test]
    fn clamped_spline_interpolates_its_end_coefficients() {
        let basis = BSplineBasis::clamped(3, 5);
        let n = basis.len();
        let mut coeffs = vec![0.25; n];
        coeffs[0] = -1.5;
        coeffs[n - 1] = 4.0;
        let spline = Spline::new(basis, coeffs);
        assert_relative_eq!(spline.eval(0.0), -1.5);
        assert_relative_eq!(spline.eval(1.0), 4.0);
    }

    #[test]
    fn scaled_basis_stretches_the_domain() {
        let basis = BSplineBasis::clamped(3, 4).scaled(2.5);
        assert_eq!(basis.domain(), (0.0, 2.5));
        assert_eq!(basis.len(), BSplineBasis::clamped(3, 4).len());
    }

    #[test]
    fn collocation_solve_recovers_coefficients() {
        let basis = BSplineBasis::clamped(3, 6);
        let coeffs: Vec<f64> = (0..basis.len()).map(|i| (i as f64 * 0.7).sin()).collect();
        let spline = Spline::new(basis.clone(), coeffs.clone());

        let greville = basis.greville();
        let matrix = basis.collocation_matrix(&greville);
        let rhs = nalgebra::DVector::from_iterator(
            greville.len(),
            greville.iter().map(|&u| spline.eval(u)),
        );
        let solved = matrix.lu().solve(&rhs).expect("collocation system solvable");
        for (a, b) in solved.iter().zip(coeffs.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn concat_trajectory_is_continuous_at_the_junction() {
        let basis = BSplineBasis::clamped(3, 5);
        let greville = basis.greville();
        // first segment sweeps 0..10, second 10..15, on clocks of 2s and 3s
        let first = Spline::new(basis.clone(), greville.iter().map(|g| g * 10.0).collect());
        let second = Spline::new(basis, greville.iter().map(|g| 10.0 + g * 5.0).collect());
        let concat = ConcatTrajectory::new(&first, &second, 2.0, 3.0);

        assert_relative_eq!(concat.duration(), 5.0);
        assert_relative_eq!(concat.eval(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(concat.eval(1.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(concat.eval(2.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(concat.eval(2.0 + 1e-9), 10.0, epsilon = 1e-6);
        assert_relative_eq!(concat.eval(5.0), 15.0, epsilon = 1e-12);
    }
}
