//! The deployable model bundle.
//!
//! A bundle is the unit of deployment: the ordered pipeline configuration,
//! the feature-extractor configuration, and the trained classifier, plus
//! the input length the whole chain was trained against. Persisting all of
//! it together is what guarantees that inference always preprocesses
//! exactly the way training did.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::{Result, SpectraError};
use crate::features::FeatureExtractor;
use crate::pipeline::Pipeline;

/// Default acceptance threshold: the winning posterior must reach this for
/// the label to be reported instead of `UNKNOWN`.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

// ---------------------------------------------------------------------------
// ModelBundle
// ---------------------------------------------------------------------------

/// Pipeline + feature extractor + classifier, frozen as one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Raw-spectrum length the bundle accepts. Inference refuses any
    /// spectrum whose wavelength axis differs.
    pub input_len: usize,
    pub pipeline: Pipeline,
    pub extractor: FeatureExtractor,
    pub classifier: Classifier,
    /// Posterior threshold below which results map to `UNKNOWN`.
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

impl ModelBundle {
    /// Assemble and cross-check a bundle.
    ///
    /// Raises [`SpectraError::Configuration`] when the extractor is invalid
    /// or the threshold falls outside [0, 1]. This is the startup gate: a
    /// service should construct its bundle before accepting any spectra.
    pub fn new(
        input_len: usize,
        pipeline: Pipeline,
        extractor: FeatureExtractor,
        classifier: Classifier,
        confidence_threshold: f64,
    ) -> Result<Self> {
        if input_len == 0 {
            return Err(SpectraError::Configuration(
                "bundle input length is zero".into(),
            ));
        }
        pipeline.validate()?;
        extractor.validate()?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(SpectraError::Configuration(format!(
                "confidence threshold {confidence_threshold} outside [0, 1]"
            )));
        }
        Ok(ModelBundle {
            input_len,
            pipeline,
            extractor,
            classifier,
            confidence_threshold,
        })
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SpectraError::Configuration(format!("bundle serialization: {e}")))
    }

    /// Rebuild from [`ModelBundle::to_json`] output, re-running the
    /// construction checks so a hand-edited artifact cannot smuggle an
    /// invalid configuration past startup.
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: ModelBundle = serde_json::from_str(json)
            .map_err(|e| SpectraError::Configuration(format!("bundle deserialization: {e}")))?;
        ModelBundle::new(
            bundle.input_len,
            bundle.pipeline,
            bundle.extractor,
            bundle.classifier,
            bundle.confidence_threshold,
        )
    }

    /// Write the bundle to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing model bundle to {}", path.display()))?;
        log::info!("saved model bundle to {}", path.display());
        Ok(())
    }

    /// Load a bundle from a file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading model bundle from {}", path.display()))?;
        let bundle = Self::from_json(&json)
            .with_context(|| format!("parsing model bundle {}", path.display()))?;
        Ok(bundle)
    }
}
