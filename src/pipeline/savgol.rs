//! Savitzky-Golay smoothing and differentiation.
//!
//! Fits a local polynomial of a given order over a sliding odd-length
//! window and replaces each sample with the fitted value (or the fitted
//! derivative). Interior samples use precomputed convolution weights; the
//! first and last half-windows evaluate the boundary-window polynomial at
//! their own offsets, so output length always equals input length.
//!
//! Derivatives are scaled by the mean axis spacing, giving per-nm units
//! regardless of sampling density.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SpectraError};
use crate::math::{polyval_deriv, vandermonde};
use crate::spectrum::SpectrumBuffer;

/// `d!` as an f64, for fitted-derivative extraction at the window center.
fn factorial(d: usize) -> f64 {
    (1..=d).map(|k| k as f64).product()
}

/// Apply a Savitzky-Golay filter in place.
///
/// `window` must be odd and at least `order + 2`, and `derivative` at most
/// `order`; those are enforced at stage construction. The remaining runtime
/// requirement is that the spectrum holds at least `window` samples.
pub fn filter(
    buf: &mut SpectrumBuffer,
    window: usize,
    order: usize,
    derivative: usize,
) -> Result<()> {
    let n = buf.intensities.len();
    if n < window {
        return Err(SpectraError::InvalidShape(format!(
            "{n} samples but Savitzky-Golay window is {window}"
        )));
    }

    let m = window / 2;
    // Window offsets in index units, centered on zero.
    let xs: Vec<f64> = (0..window).map(|i| i as f64 - m as f64).collect();
    let a = vandermonde(&xs, order);
    let pinv = a
        .svd(true, true)
        .pseudo_inverse(1e-10)
        .map_err(|_| SpectraError::IllConditioned("savitzky-golay design"))?;

    // Interior convolution weights: fitted d-th derivative at the window
    // center is d! * beta[d].
    let weights: Vec<f64> = pinv.row(derivative).iter().map(|w| w * factorial(derivative)).collect();

    let y = &buf.intensities;
    let mut out = vec![0.0; n];

    for i in m..n - m {
        out[i] = weights
            .iter()
            .zip(&y[i - m..i + m + 1])
            .map(|(w, v)| w * v)
            .sum();
    }

    // Boundary handling: fit the first/last full window once and evaluate
    // its polynomial at each edge offset.
    let beta_first = fit_window(&pinv, &y[..window]);
    for i in 0..m {
        out[i] = polyval_deriv(&beta_first, i as f64 - m as f64, derivative);
    }
    let beta_last = fit_window(&pinv, &y[n - window..]);
    for i in n - m..n {
        let x = i as f64 - (n - 1 - m) as f64;
        out[i] = polyval_deriv(&beta_last, x, derivative);
    }

    // Index-unit derivatives -> per-nm derivatives.
    if derivative > 0 {
        let h = buf.mean_spacing();
        let scale = h.powi(derivative as i32);
        for v in &mut out {
            *v /= scale;
        }
    }

    buf.intensities = out;
    Ok(())
}

fn fit_window(pinv: &DMatrix<f64>, ys: &[f64]) -> DVector<f64> {
    pinv * DVector::from_column_slice(ys)
}
