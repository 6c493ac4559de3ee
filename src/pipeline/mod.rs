//! Preprocessing layer: stage variants and the pipeline that chains them.
//!
//! Architecture:
//! ```text
//!   raw SpectrumBuffer
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Pipeline  │  ordered, frozen stage list
//!   └──────────┘
//!        │  baseline → scatter → smoothing → derivative → ...
//!        ▼
//!   processed SpectrumBuffer
//! ```
//!
//! A pipeline is constructed once, validated once, and then applied to any
//! number of spectra. Its configuration is plain data: serializing it next
//! to a trained classifier is what guarantees train/inference parity.

pub mod baseline;
pub mod normalize;
pub mod savgol;
pub mod scatter;
pub mod select;
pub mod stage;

pub use stage::{Stage, DEFAULT_EPSILON};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::spectrum::SpectrumBuffer;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered sequence of preprocessing stages with frozen parameters.
///
/// Re-running the same pipeline on the same buffer is deterministic.
/// Individual stages are idempotent only where
/// [`Stage::is_idempotent`] says so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline, validating every stage's parameters up front.
    ///
    /// A [`SpectraError::Configuration`] here is a deployment error: the
    /// process should refuse to start accepting spectra.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let pipeline = Pipeline { stages };
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// An empty (identity) pipeline.
    pub fn identity() -> Self {
        Pipeline { stages: Vec::new() }
    }

    /// Read-only view of the stage list.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Re-run the construction checks. Needed after deserializing a
    /// pipeline, which bypasses [`Pipeline::new`].
    pub fn validate(&self) -> Result<()> {
        for stage in &self.stages {
            stage
                .validate()
                .map_err(|e| e.in_stage(stage.name()))?;
        }
        Ok(())
    }

    /// Stage names in execution order, for diagnostics.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Apply all stages in order to a copy of the input buffer.
    ///
    /// Short-circuits on the first failing stage; the returned
    /// [`SpectraError::StageFailed`] names the stage and wraps its cause.
    pub fn apply(&self, input: &SpectrumBuffer) -> Result<SpectrumBuffer> {
        input.validate()?;
        let mut buf = input.clone();
        for stage in &self.stages {
            stage.apply(&mut buf).map_err(|e| {
                log::warn!("pipeline stopped at stage '{}': {e}", stage.name());
                e.in_stage(stage.name())
            })?;
        }
        Ok(buf)
    }
}
