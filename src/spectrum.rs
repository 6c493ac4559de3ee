use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// MetadataValue – one provenance cell
// ---------------------------------------------------------------------------

/// A dynamically-typed provenance value (timestamp, device id, scan mode...).
/// Informational only: nothing in the numeric pipeline reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Provenance map: key → value (e.g. `"device_id" → "dlp-nirscan-2"`).
pub type Provenance = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// SpectrumBuffer – one measurement in canonical form
// ---------------------------------------------------------------------------

/// One measurement: a wavelength axis (nm), an equal-length intensity array,
/// and provenance metadata.
///
/// The axis is shared and immutable across the stages of one pipeline run;
/// intensities are copied on transform. The only stages allowed to replace
/// the axis are the wavelength-selection/compression ones, which install a
/// fresh `Arc` of matching length.
#[derive(Debug, Clone)]
pub struct SpectrumBuffer {
    /// Strictly increasing wavelength axis in nm.
    pub wavelengths: Arc<[f64]>,
    /// Intensities in arbitrary units, index-aligned with `wavelengths`.
    pub intensities: Vec<f64>,
    /// Informational metadata; never affects numeric results.
    pub provenance: Provenance,
}

impl SpectrumBuffer {
    /// Build a buffer and validate it in one step.
    pub fn new(wavelengths: Vec<f64>, intensities: Vec<f64>) -> Result<Self> {
        let buf = SpectrumBuffer {
            wavelengths: wavelengths.into(),
            intensities,
            provenance: Provenance::new(),
        };
        buf.validate()?;
        Ok(buf)
    }

    /// Same as [`SpectrumBuffer::new`] with provenance attached.
    pub fn with_provenance(
        wavelengths: Vec<f64>,
        intensities: Vec<f64>,
        provenance: Provenance,
    ) -> Result<Self> {
        let mut buf = Self::new(wavelengths, intensities)?;
        buf.provenance = provenance;
        Ok(buf)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    /// Check the three buffer invariants: non-empty equal-length arrays,
    /// strictly increasing wavelengths, all values finite.
    ///
    /// Every stage calls this on entry so that a malformed buffer fails fast
    /// with a tagged condition instead of silently propagating NaN.
    pub fn validate(&self) -> Result<()> {
        if self.intensities.is_empty() {
            return Err(SpectraError::InvalidShape("empty spectrum".into()));
        }
        if self.wavelengths.len() != self.intensities.len() {
            return Err(SpectraError::InvalidShape(format!(
                "{} wavelengths but {} intensities",
                self.wavelengths.len(),
                self.intensities.len()
            )));
        }
        for (i, w) in self.wavelengths.iter().enumerate() {
            if !w.is_finite() {
                return Err(SpectraError::NonFinite {
                    context: "wavelengths",
                    index: i,
                });
            }
            if i > 0 && *w <= self.wavelengths[i - 1] {
                return Err(SpectraError::InvalidShape(format!(
                    "wavelengths not strictly increasing at index {i} \
                     ({} after {})",
                    w,
                    self.wavelengths[i - 1]
                )));
            }
        }
        for (i, y) in self.intensities.iter().enumerate() {
            if !y.is_finite() {
                return Err(SpectraError::NonFinite {
                    context: "intensities",
                    index: i,
                });
            }
        }
        Ok(())
    }

    /// Mean spacing of the wavelength axis in nm. Used to scale derivatives
    /// into per-nm units.
    pub fn mean_spacing(&self) -> f64 {
        let n = self.wavelengths.len();
        if n < 2 {
            return 1.0;
        }
        (self.wavelengths[n - 1] - self.wavelengths[0]) / (n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| 900.0 + i as f64 * 5.0).collect()
    }

    #[test]
    fn valid_buffer_passes() {
        let buf = SpectrumBuffer::new(axis(4), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(buf.len(), 4);
        assert!((buf.mean_spacing() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_buffer_rejected() {
        let err = SpectrumBuffer::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidShape(_)));
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = SpectrumBuffer::new(axis(3), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidShape(_)));
    }

    #[test]
    fn non_monotonic_axis_rejected() {
        let err = SpectrumBuffer::new(vec![900.0, 910.0, 905.0], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidShape(_)));
    }

    #[test]
    fn nan_intensity_rejected() {
        let err = SpectrumBuffer::new(axis(3), vec![1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            SpectraError::NonFinite {
                context: "intensities",
                index: 1
            }
        ));
    }
}
