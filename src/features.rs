//! Feature extraction: processed spectrum → fixed-length feature vector.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::spectrum::SpectrumBuffer;

/// A fixed-length feature vector consumed by the classifier.
pub type FeatureVector = Vec<f64>;

// ---------------------------------------------------------------------------
// FeatureExtractor
// ---------------------------------------------------------------------------

/// Reduces a preprocessed spectrum to a feature vector of constant length
/// for a fixed configuration, independent of the input's noise content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureExtractor {
    /// The full processed spectrum is the feature vector.
    Identity,
    /// First difference between adjacent samples (N-1 outputs). This is
    /// what the deployed scanner feeds its model.
    Delta,
    /// Fixed pre-fitted linear projection. `matrix` holds one row per
    /// output feature; every row must have `input_len` columns. Persisted
    /// verbatim alongside the classifier.
    Projection {
        input_len: usize,
        matrix: Vec<Vec<f64>>,
    },
}

impl FeatureExtractor {
    /// Validate the configuration. Raised at bundle construction, before
    /// any spectrum is processed.
    pub fn validate(&self) -> Result<()> {
        if let FeatureExtractor::Projection { input_len, matrix } = self {
            if matrix.is_empty() {
                return Err(SpectraError::Configuration(
                    "projection matrix has no rows".into(),
                ));
            }
            for (r, row) in matrix.iter().enumerate() {
                if row.len() != *input_len {
                    return Err(SpectraError::Configuration(format!(
                        "projection row {r} has {} columns, expected {input_len}",
                        row.len()
                    )));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(SpectraError::Configuration(format!(
                        "projection row {r} contains non-finite values"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Output length for a given processed-spectrum length.
    pub fn output_len(&self, input_len: usize) -> usize {
        match self {
            FeatureExtractor::Identity => input_len,
            FeatureExtractor::Delta => input_len.saturating_sub(1),
            FeatureExtractor::Projection { matrix, .. } => matrix.len(),
        }
    }

    /// Extract the feature vector from a processed spectrum.
    pub fn extract(&self, buf: &SpectrumBuffer) -> Result<FeatureVector> {
        buf.validate()?;
        match self {
            FeatureExtractor::Identity => Ok(buf.intensities.clone()),
            FeatureExtractor::Delta => {
                if buf.len() < 2 {
                    return Err(SpectraError::InvalidShape(
                        "delta features need at least 2 samples".into(),
                    ));
                }
                Ok(buf
                    .intensities
                    .windows(2)
                    .map(|w| w[1] - w[0])
                    .collect())
            }
            FeatureExtractor::Projection { input_len, matrix } => {
                if buf.len() != *input_len {
                    return Err(SpectraError::DimensionMismatch {
                        expected: *input_len,
                        actual: buf.len(),
                    });
                }
                Ok(matrix
                    .iter()
                    .map(|row| {
                        row.iter()
                            .zip(&buf.intensities)
                            .map(|(a, b)| a * b)
                            .sum()
                    })
                    .collect())
            }
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        FeatureExtractor::Identity
    }
}
