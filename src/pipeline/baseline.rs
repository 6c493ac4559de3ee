//! Polynomial baseline correction.
//!
//! Estimates the smooth low-frequency background of a spectrum with a
//! least-squares polynomial fit and subtracts it, so absorption features sit
//! on a flat reference. The axis is mapped onto [-1, 1] before fitting to
//! keep the Vandermonde matrix well conditioned at NIR wavelengths
//! (900-1700 nm raised to the 4th power is otherwise a recipe for a
//! singular system).

use nalgebra::DVector;

use crate::error::Result;
use crate::math::{normalize_axis, polyval, solve_least_squares, vandermonde};
use crate::spectrum::SpectrumBuffer;

/// Fit a polynomial of the given order to the whole spectrum and subtract it.
///
/// Baseline-corrected spectra can legitimately dip slightly negative;
/// `clamp_negative` zeroes those samples only when explicitly requested.
pub fn correct(buf: &mut SpectrumBuffer, order: usize, clamp_negative: bool) -> Result<()> {
    let xs = normalize_axis(&buf.wavelengths);
    let a = vandermonde(&xs, order);
    let y = DVector::from_column_slice(&buf.intensities);

    let beta = solve_least_squares(&a, &y, "baseline fit")?;

    for (yi, &x) in buf.intensities.iter_mut().zip(xs.iter()) {
        *yi -= polyval(&beta, x);
        if clamp_negative && *yi < 0.0 {
            *yi = 0.0;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(n: usize, f: impl Fn(f64) -> f64) -> SpectrumBuffer {
        let wl: Vec<f64> = (0..n).map(|i| 900.0 + i as f64 * 5.0).collect();
        let ys: Vec<f64> = wl.iter().map(|&w| f(w)).collect();
        SpectrumBuffer::new(wl, ys).unwrap()
    }

    #[test]
    fn removes_quadratic_background() {
        let mut buf = buffer(161, |w| {
            let t = (w - 900.0) / 800.0;
            3.0 + 2.0 * t - 1.5 * t * t
        });
        correct(&mut buf, 2, false).unwrap();
        for &y in &buf.intensities {
            assert!(y.abs() < 1e-8, "residual {y}");
        }
    }

    #[test]
    fn preserves_peak_above_linear_baseline() {
        let mut buf = buffer(101, |w| {
            let peak = (-(w - 1200.0).powi(2) / (2.0 * 20.0f64.powi(2))).exp();
            0.5 + 0.001 * (w - 900.0) + peak
        });
        correct(&mut buf, 1, false).unwrap();
        // Peak sample index: (1200 - 900) / 5 = 60
        let peak_val = buf.intensities[60];
        assert!(peak_val > 0.8, "peak flattened to {peak_val}");
    }

    #[test]
    fn clamp_zeroes_negative_residuals() {
        let mut buf = buffer(51, |w| 1.0 + ((w - 900.0) / 50.0).sin() * 0.2);
        correct(&mut buf, 0, true).unwrap();
        assert!(buf.intensities.iter().all(|&y| y >= 0.0));
    }
}
