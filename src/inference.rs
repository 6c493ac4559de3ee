//! Inference orchestration.
//!
//! One synchronous, stateless pass per spectrum:
//! ```text
//! AwaitingSpectrum → Validating → Preprocessing → FeatureExtraction
//!                  → Classifying → Done
//! ```
//! with `Error` reachable from every state. Nothing mutable survives one
//! spectrum's transit, so a single service (one frozen bundle) can be
//! shared across threads; `infer_batch` does exactly that with rayon.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::bundle::ModelBundle;
use crate::error::{Result, SpectraError};
use crate::spectrum::SpectrumBuffer;

/// Sentinel label for low-confidence results.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Scan-quality conditions noticed along the way. None of them aborts the
/// run; they are reported so the caller can decide to re-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Raw intensities at or above the configured detector ceiling.
    Saturation,
    /// Signal-to-noise estimate below the configured floor.
    LowSnr,
    /// Winning posterior below the acceptance threshold; label was mapped
    /// to `UNKNOWN`.
    LowConfidence,
}

/// What ran and what was noticed, attached to every successful result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Preprocessing stages executed, in order.
    pub stages_executed: Vec<&'static str>,
    pub flags: Vec<QualityFlag>,
}

/// The labelled outcome of one inference pass.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    /// A vocabulary label, or [`UNKNOWN_LABEL`].
    pub label: String,
    /// Posterior of the winning class, in [0, 1]. Reported even when the
    /// label was mapped to `UNKNOWN`.
    pub confidence: f64,
    pub diagnostics: Diagnostics,
}

// ---------------------------------------------------------------------------
// Quality policy
// ---------------------------------------------------------------------------

/// Optional raw-scan quality checks. Both default to disabled; limits are
/// instrument-specific and come from deployment configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityPolicy {
    /// Raw intensity at or above this value flags [`QualityFlag::Saturation`].
    pub saturation_limit: Option<f64>,
    /// SNR estimate below this value flags [`QualityFlag::LowSnr`].
    pub min_snr: Option<f64>,
}

impl QualityPolicy {
    fn inspect(&self, raw: &SpectrumBuffer, flags: &mut Vec<QualityFlag>) {
        if let Some(limit) = self.saturation_limit {
            if raw.intensities.iter().any(|&y| y >= limit) {
                log::warn!("saturated samples detected (limit {limit})");
                flags.push(QualityFlag::Saturation);
            }
        }
        if let Some(floor) = self.min_snr {
            let snr = estimate_snr(&raw.intensities);
            if snr < floor {
                log::warn!("low SNR estimate {snr:.1} (floor {floor})");
                flags.push(QualityFlag::LowSnr);
            }
        }
    }
}

/// Crude SNR estimate: signal span over the high-frequency noise sigma
/// taken from first differences (divided by sqrt(2) since differencing
/// doubles the noise variance).
fn estimate_snr(ys: &[f64]) -> f64 {
    if ys.len() < 3 {
        return 0.0;
    }
    let lo = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let diffs: Vec<f64> = ys.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64;
    let noise = (var / 2.0).sqrt();
    if noise <= 0.0 {
        return f64::INFINITY;
    }
    (hi - lo) / noise
}

// ---------------------------------------------------------------------------
// InferenceService
// ---------------------------------------------------------------------------

/// States of one spectrum's transit. Sequential and synchronous; the only
/// branching is success/failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSpectrum,
    Validating,
    Preprocessing,
    FeatureExtraction,
    Classifying,
    Done,
    Error,
}

/// Orchestrates raw spectrum → pipeline → features → classifier → result
/// against one frozen [`ModelBundle`].
///
/// The bundle is held behind an `Arc`: retraining builds a new bundle and
/// the owner swaps the handle atomically, so predictions never race a
/// half-updated model.
#[derive(Debug, Clone)]
pub struct InferenceService {
    bundle: Arc<ModelBundle>,
    quality: QualityPolicy,
}

impl InferenceService {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        InferenceService {
            bundle,
            quality: QualityPolicy::default(),
        }
    }

    pub fn with_quality_policy(mut self, quality: QualityPolicy) -> Self {
        self.quality = quality;
        self
    }

    /// The frozen bundle this service runs against.
    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Run one raw spectrum through the full chain.
    ///
    /// A failed inference returns the tagged condition of whichever phase
    /// failed; it never returns a best-guess label and never lets NaN
    /// escape. A successful low-confidence inference returns
    /// [`UNKNOWN_LABEL`] with a [`QualityFlag::LowConfidence`] flag.
    pub fn infer(&self, raw: &SpectrumBuffer) -> Result<InferenceResult> {
        let mut phase = Phase::AwaitingSpectrum;
        let mut diagnostics = Diagnostics::default();

        let result = self.run(raw, &mut phase, &mut diagnostics);
        if result.is_err() {
            phase = Phase::Error;
            log::debug!("inference ended in {phase:?}");
        }
        result
    }

    fn run(
        &self,
        raw: &SpectrumBuffer,
        phase: &mut Phase,
        diagnostics: &mut Diagnostics,
    ) -> Result<InferenceResult> {
        *phase = Phase::Validating;
        raw.validate().map_err(|e| e.in_stage("validating"))?;
        if raw.len() != self.bundle.input_len {
            return Err(SpectraError::DimensionMismatch {
                expected: self.bundle.input_len,
                actual: raw.len(),
            }
            .in_stage("validating"));
        }
        self.quality.inspect(raw, &mut diagnostics.flags);

        *phase = Phase::Preprocessing;
        let processed = self.bundle.pipeline.apply(raw)?;
        diagnostics
            .stages_executed
            .extend(self.bundle.pipeline.stage_names());

        *phase = Phase::FeatureExtraction;
        let feature = self
            .bundle
            .extractor
            .extract(&processed)
            .map_err(|e| e.in_stage("feature_extraction"))?;

        *phase = Phase::Classifying;
        let (label, confidence) = self
            .bundle
            .classifier
            .predict(&feature)
            .map_err(|e| e.in_stage("classifying"))?;

        *phase = Phase::Done;
        let label = if confidence < self.bundle.confidence_threshold {
            log::info!(
                "confidence {confidence:.3} below threshold {:.3}, reporting {UNKNOWN_LABEL}",
                self.bundle.confidence_threshold
            );
            diagnostics.flags.push(QualityFlag::LowConfidence);
            UNKNOWN_LABEL.to_string()
        } else {
            label
        };

        Ok(InferenceResult {
            label,
            confidence,
            diagnostics: std::mem::take(diagnostics),
        })
    }

    /// Classify many spectra in parallel against the shared frozen bundle.
    /// Result order matches input order.
    pub fn infer_batch(&self, spectra: &[SpectrumBuffer]) -> Vec<Result<InferenceResult>> {
        spectra.par_iter().map(|s| self.infer(s)).collect()
    }
}
