//! Intensity normalization: min-max scaling and unit-area scaling.

use crate::error::{Result, SpectraError};
use crate::spectrum::SpectrumBuffer;

/// Scale intensities linearly onto [0, 1].
///
/// Reports [`SpectraError::ZeroRange`] when max equals min within epsilon
/// (a flat scan), rather than dividing by ~zero.
pub fn min_max(buf: &mut SpectrumBuffer, epsilon: f64) -> Result<()> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &y in &buf.intensities {
        lo = lo.min(y);
        hi = hi.max(y);
    }
    let span = hi - lo;
    if span < epsilon {
        return Err(SpectraError::ZeroRange { span, epsilon });
    }
    for y in &mut buf.intensities {
        *y = (*y - lo) / span;
    }
    Ok(())
}

/// Scale intensities so the absolute area under the curve (trapezoidal rule
/// over the wavelength axis) equals one.
pub fn unit_area(buf: &mut SpectrumBuffer, epsilon: f64) -> Result<()> {
    let wl = &buf.wavelengths;
    let ys = &buf.intensities;
    let mut area = 0.0;
    for i in 1..ys.len() {
        area += 0.5 * (ys[i] + ys[i - 1]).abs() * (wl[i] - wl[i - 1]);
    }
    if area < epsilon {
        return Err(SpectraError::ZeroRange {
            span: area,
            epsilon,
        });
    }
    for y in &mut buf.intensities {
        *y /= area;
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
    fn min_max_maps_onto_unit_interval() {
        let mut buf = buffer(vec![2.0, 6.0, 4.0, 10.0]);
        min_max(&mut buf, 1e-9).unwrap();
        assert_eq!(buf.intensities[0], 0.0);
        assert_eq!(buf.intensities[3], 1.0);
        assert!((buf.intensities[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn min_max_flat_scan_reports_zero_range() {
        let mut buf = buffer(vec![3.0; 8]);
        let err = min_max(&mut buf, 1e-9).unwrap_err();
        assert!(matches!(err, SpectraError::ZeroRange { .. }));
    }

    #[test]
    fn min_max_is_idempotent() {
        let mut buf = buffer(vec![0.1, 0.9, 0.5, 0.3]);
        min_max(&mut buf, 1e-9).unwrap();
        let once = buf.intensities.clone();
        min_max(&mut buf, 1e-9).unwrap();
        assert_eq!(once, buf.intensities);
    }

    #[test]
    fn unit_area_integrates_to_one() {
        let mut buf = buffer(vec![1.0, 2.0, 3.0, 2.0, 1.0]);
        unit_area(&mut buf, 1e-12).unwrap();
        let wl = buf.wavelengths.clone();
        let ys = &buf.intensities;
        let area: f64 = (1..ys.len())
            .map(|i| 0.5 * (ys[i] + ys[i - 1]).abs() * (wl[i] - wl[i - 1]))
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unit_area_zero_signal_reports_zero_range() {
        let mut buf = buffer(vec![0.0; 6]);
        let err = unit_area(&mut buf, 1e-12).unwrap_err();
        assert!(matches!(err, SpectraError::ZeroRange { .. }));
    }
}
