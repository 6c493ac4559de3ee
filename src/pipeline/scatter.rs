//! Scatter correction: SNV and MSC.
//!
//! Particle-size and packing differences between scans show up as
//! multiplicative/additive scatter on top of the chemical signal. SNV
//! removes it per spectrum (zero mean, unit variance across wavelengths);
//! MSC removes it relative to a reference spectrum via a two-parameter
//! regression.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SpectraError};
use crate::math::solve_least_squares;
use crate::spectrum::SpectrumBuffer;

/// Standard Normal Variate: subtract the mean intensity, divide by the
/// standard deviation across wavelengths.
///
/// A flat or saturated scan has (near-)zero variance; dividing through would
/// manufacture NaN/Inf, so it is reported as [`SpectraError::ZeroVariance`]
/// instead.
pub fn snv(buf: &mut SpectrumBuffer, epsilon: f64) -> Result<()> {
    let n = buf.intensities.len() as f64;
    let mean = buf.intensities.iter().sum::<f64>() / n;
    let var = buf
        .intensities
        .iter()
        .map(|y| (y - mean).powi(2))
        .sum::<f64>()
        / n;
    let sigma = var.sqrt();

    if sigma < epsilon {
        return Err(SpectraError::ZeroVariance { sigma, epsilon });
    }

    for y in &mut buf.intensities {
        *y = (*y - mean) / sigma;
    }
    Ok(())
}

/// Multiplicative Scatter Correction against an externally supplied
/// reference spectrum.
///
/// Fits `sample = intercept + slope * reference` by least squares, then
/// corrects each sample value to `(sample - intercept) / slope`. A
/// near-zero slope means the scan carries no signal in common with the
/// reference and is reported as [`SpectraError::ZeroVariance`].
pub fn msc(buf: &mut SpectrumBuffer, reference: &[f64], epsilon: f64) -> Result<()> {
    if reference.len() != buf.intensities.len() {
        return Err(SpectraError::DimensionMismatch {
            expected: buf.intensities.len(),
            actual: reference.len(),
        });
    }

    let n = reference.len();
    let mut a = DMatrix::zeros(n, 2);
    for (i, &r) in reference.iter().enumerate() {
        a[(i, 0)] = 1.0;
        a[(i, 1)] = r;
    }
    let y = DVector::from_column_slice(&buf.intensities);

    let beta = solve_least_squares(&a, &y, "msc regression")?;
    let (intercept, slope) = (beta[0], beta[1]);

    if slope.abs() < epsilon {
        return Err(SpectraError::ZeroVariance {
            sigma: slope.abs(),
            epsilon,
        });
    }

    for yi in &mut buf.intensities {
        *yi = (*yi - intercept) / slope;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(ys: Vec<f64>) -> SpectrumBuffer {
        let wl: Vec<f64> = (0..ys.len()).map(|i| 900.0 + i as f64).collect();
        SpectrumBuffer::new(wl, ys).unwrap()
    }

    #[test]
    fn snv_yields_zero_mean_unit_variance() {
        let mut buf = buffer(vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        snv(&mut buf, 1e-9).unwrap();

        let n = buf.intensities.len() as f64;
        let mean = buf.intensities.iter().sum::<f64>() / n;
        let var = buf.intensities.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn snv_is_idempotent() {
        let mut buf = buffer(vec![0.2, 0.9, 0.4, 1.3, 0.7, 0.1]);
        snv(&mut buf, 1e-9).unwrap();
        let once = buf.intensities.clone();
        snv(&mut buf, 1e-9).unwrap();
        for (a, b) in once.iter().zip(&buf.intensities) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn snv_reports_zero_variance_on_flat_scan() {
        let mut buf = buffer(vec![0.5; 10]);
        let err = snv(&mut buf, 1e-9).unwrap_err();
        assert!(matches!(err, SpectraError::ZeroVariance { .. }));
        // The buffer must not have been NaN-poisoned.
        assert!(buf.intensities.iter().all(|y| y.is_finite()));
    }

    #[test]
    fn msc_undoes_linear_scatter() {
        let reference = vec![0.1, 0.5, 0.9, 0.4, 0.2, 0.7];
        let distorted: Vec<f64> = reference.iter().map(|r| 0.3 + 1.7 * r).collect();
        let mut buf = buffer(distorted);
        msc(&mut buf, &reference, 1e-9).unwrap();
        for (y, r) in buf.intensities.iter().zip(&reference) {
            assert!((y - r).abs() < 1e-9);
        }
    }

    #[test]
    fn msc_rejects_length_mismatch() {
        let mut buf = buffer(vec![1.0, 2.0, 3.0]);
        let err = msc(&mut buf, &[1.0, 2.0], 1e-9).unwrap_err();
        assert!(matches!(err, SpectraError::DimensionMismatch { .. }));
    }
}
