use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every failure the core pipeline can report.
///
/// All variants are recoverable at the caller's discretion (re-scan and
/// retry) except [`SpectraError::Configuration`], which indicates invalid
/// stage or extractor parameters and is raised at construction time, before
/// any spectrum is accepted.
#[derive(Debug, Error)]
pub enum SpectraError {
    /// Length mismatch, non-monotonic wavelength axis, or empty arrays.
    #[error("invalid spectrum shape: {0}")]
    InvalidShape(String),

    /// NaN or infinity encountered in spectral data.
    #[error("non-finite value in {context} at index {index}")]
    NonFinite { context: &'static str, index: usize },

    /// Degenerate (flat or saturated) scan: standard deviation below epsilon.
    #[error("zero variance: standard deviation {sigma:.3e} below epsilon {epsilon:.3e}")]
    ZeroVariance { sigma: f64, epsilon: f64 },

    /// Degenerate scan for range-based normalization: max equals min.
    #[error("zero range: span {span:.3e} below epsilon {epsilon:.3e}")]
    ZeroRange { span: f64, epsilon: f64 },

    /// Invalid stage/extractor parameters. A deployment error, not a data
    /// error: raised before any spectrum is processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Feature vector length differs from the trained expectation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Fewer than 2 distinct labels, or ragged feature lengths, at fit time.
    #[error("insufficient training data: {0}")]
    InsufficientTrainingData(String),

    /// Pipeline short-circuit wrapper: records which stage failed and why.
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: Box<SpectraError>,
    },

    /// The numeric solver could not produce a finite solution.
    #[error("ill-conditioned system in {0}")]
    IllConditioned(&'static str),
}

impl SpectraError {
    /// Wrap an error with the name of the stage that raised it.
    pub fn in_stage(self, stage: &'static str) -> Self {
        SpectraError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// Whether this error (or the one it wraps) is a configuration error.
    pub fn is_configuration(&self) -> bool {
        match self {
            SpectraError::Configuration(_) => true,
            SpectraError::StageFailed { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SpectraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapper_preserves_cause() {
        let err = SpectraError::ZeroVariance {
            sigma: 1e-12,
            epsilon: 1e-9,
        }
        .in_stage("snv");
        let msg = err.to_string();
        assert!(msg.contains("snv"), "{msg}");
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_detected_through_wrapper() {
        let err = SpectraError::Configuration("window must be odd".into()).in_stage("savgol");
        assert!(err.is_configuration());
    }
}
