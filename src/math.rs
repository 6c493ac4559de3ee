//! Least-squares helpers shared by the preprocessing stages and the
//! classifier.
//!
//! The pipeline repeatedly solves small dense problems: a polynomial
//! baseline fit over the whole axis, a local polynomial fit inside a
//! Savitzky-Golay window, a two-parameter regression for multiplicative
//! scatter correction. All of them reduce to `minimize ||A beta - y||^2`
//! with a handful of columns, so one SVD-based solver covers everything.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SpectraError};

/// Solve a least-squares problem via SVD.
///
/// Tries progressively looser tolerances so that near-collinear design
/// matrices (high polynomial orders on short spectra) still yield a usable
/// solution. Fails with [`SpectraError::IllConditioned`] when no tolerance
/// produces a finite result.
pub fn solve_least_squares(
    a: &DMatrix<f64>,
    y: &DVector<f64>,
    context: &'static str,
) -> Result<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Ok(beta);
            }
        }
    }

    Err(SpectraError::IllConditioned(context))
}

/// Vandermonde design matrix: row i = `[1, x_i, x_i^2, ..., x_i^order]`.
pub fn vandermonde(xs: &[f64], order: usize) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), order + 1, |i, j| xs[i].powi(j as i32))
}

/// Map an axis onto [-1, 1] for conditioning before a polynomial fit.
/// A degenerate (single-point) axis maps to all zeros.
pub fn normalize_axis(xs: &[f64]) -> Vec<f64> {
    let (lo, hi) = (xs[0], xs[xs.len() - 1]);
    let span = hi - lo;
    if span <= 0.0 {
        return vec![0.0; xs.len()];
    }
    xs.iter().map(|x| 2.0 * (x - lo) / span - 1.0).collect()
}

/// Evaluate a polynomial with coefficients in ascending order at `x`.
pub fn polyval(coeffs: &DVector<f64>, x: f64) -> f64 {
    // Horner, highest power first.
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluate the `d`-th derivative of a polynomial at `x`.
pub fn polyval_deriv(coeffs: &DVector<f64>, x: f64, d: usize) -> f64 {
    let mut acc = 0.0;
    for (k, &c) in coeffs.iter().enumerate().skip(d) {
        // d/dx^d of c x^k = c * k!/(k-d)! * x^(k-d)
        let mut factor = 1.0;
        for j in 0..d {
            factor *= (k - j) as f64;
        }
        acc += c * factor * x.powi((k - d) as i32);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&a, &y, "test").unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn vandermonde_fit_recovers_quadratic() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 / 10.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 - 2.0 * x + 0.5 * x * x).collect();
        let a = vandermonde(&xs, 2);
        let y = DVector::from_vec(ys);
        let beta = solve_least_squares(&a, &y, "test").unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-9);
        assert!((beta[1] + 2.0).abs() < 1e-9);
        assert!((beta[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn polyval_deriv_matches_hand_derivative() {
        // p(x) = 1 + 2x + 3x^2, p'(x) = 2 + 6x, p''(x) = 6
        let c = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!((polyval(&c, 2.0) - 17.0).abs() < 1e-12);
        assert!((polyval_deriv(&c, 2.0, 1) - 14.0).abs() < 1e-12);
        assert!((polyval_deriv(&c, 2.0, 2) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn normalized_axis_spans_unit_interval() {
        let xs = normalize_axis(&[900.0, 1000.0, 1700.0]);
        assert!((xs[0] + 1.0).abs() < 1e-12);
        assert!((xs[2] - 1.0).abs() < 1e-12);
    }
}
