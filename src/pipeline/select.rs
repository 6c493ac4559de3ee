//! Wavelength selection and compression.
//!
//! The only stage family allowed to change array length. Each function
//! installs a fresh wavelength axis of matching length so the
//! `len(intensities) == len(wavelengths)` invariant survives the transform.

use crate::error::{Result, SpectraError};
use crate::spectrum::SpectrumBuffer;

/// Restrict to the samples whose wavelength falls in `[lo_nm, hi_nm]`
/// (inclusive).
pub fn select_range(buf: &mut SpectrumBuffer, lo_nm: f64, hi_nm: f64) -> Result<()> {
    let keep: Vec<usize> = buf
        .wavelengths
        .iter()
        .enumerate()
        .filter(|(_, &w)| w >= lo_nm && w <= hi_nm)
        .map(|(i, _)| i)
        .collect();

    if keep.is_empty() {
        return Err(SpectraError::InvalidShape(format!(
            "no samples inside {lo_nm}-{hi_nm} nm"
        )));
    }

    let ys: Vec<f64> = keep.iter().map(|&i| buf.intensities[i]).collect();
    let wl: Vec<f64> = keep.iter().map(|&i| buf.wavelengths[i]).collect();
    buf.intensities = ys;
    buf.wavelengths = wl.into();
    Ok(())
}

/// Restrict to the half-open index range `[start, end)`.
pub fn select_indices(buf: &mut SpectrumBuffer, start: usize, end: usize) -> Result<()> {
    if end > buf.len() {
        return Err(SpectraError::InvalidShape(format!(
            "index range {start}..{end} exceeds {} samples",
            buf.len()
        )));
    }
    let ys = buf.intensities[start..end].to_vec();
    let wl: Vec<f64> = buf.wavelengths[start..end].to_vec();
    buf.intensities = ys;
    buf.wavelengths = wl.into();
    Ok(())
}

/// Downsample to `bins` blocks by averaging.
///
/// Block boundaries are even index splits; a trailing remainder is folded
/// into the last block. Each output wavelength is the midpoint (mean) of
/// its block's wavelengths.
pub fn block_average(buf: &mut SpectrumBuffer, bins: usize) -> Result<()> {
    let n = buf.len();
    if bins > n {
        return Err(SpectraError::InvalidShape(format!(
            "{bins} bins requested from {n} samples"
        )));
    }

    let mut new_wl = Vec::with_capacity(bins);
    let mut new_ys = Vec::with_capacity(bins);
    for b in 0..bins {
        let start = b * n / bins;
        let end = if b + 1 == bins { n } else { (b + 1) * n / bins };
        let len = (end - start) as f64;
        new_wl.push(buf.wavelengths[start..end].iter().sum::<f64>() / len);
        new_ys.push(buf.intensities[start..end].iter().sum::<f64>() / len);
    }

    buf.wavelengths = new_wl.into();
    buf.intensities = new_ys;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(n: usize) -> SpectrumBuffer {
        let wl: Vec<f64> = (0..n).map(|i| 900.0 + i as f64 * 5.0).collect();
        let ys: Vec<f64> = (0..n).map(|i| i as f64).collect();
        SpectrumBuffer::new(wl, ys).unwrap()
    }

    #[test]
    fn range_selection_keeps_band() {
        let mut buf = buffer(161);
        select_range(&mut buf, 1000.0, 1100.0).unwrap();
        assert_eq!(buf.wavelengths.len(), buf.intensities.len());
        assert!(buf.wavelengths.first().copied().unwrap() >= 1000.0);
        assert!(buf.wavelengths.last().copied().unwrap() <= 1100.0);
        buf.validate().unwrap();
    }

    #[test]
    fn empty_band_rejected() {
        let mut buf = buffer(10);
        let err = select_range(&mut buf, 2000.0, 2100.0).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidShape(_)));
    }

    #[test]
    fn index_selection_is_half_open() {
        let mut buf = buffer(10);
        select_indices(&mut buf, 2, 5).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.wavelengths[0], 910.0);
    }

    #[test]
    fn block_average_midpoint_axis() {
        let mut buf = buffer(8);
        block_average(&mut buf, 4).unwrap();
        assert_eq!(buf.len(), 4);
        // First block covers indices 0,1 -> wavelengths 900, 905.
        assert!((buf.wavelengths[0] - 902.5).abs() < 1e-12);
        assert!((buf.intensities[0] - 0.5).abs() < 1e-12);
        buf.validate().unwrap();
    }

    #[test]
    fn block_average_uneven_remainder_folds_into_last() {
        let mut buf = buffer(10);
        block_average(&mut buf, 3).unwrap();
        assert_eq!(buf.len(), 3);
        buf.validate().unwrap();
    }
}
