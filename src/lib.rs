//! NIR substance identification: spectral preprocessing + classification.
//!
//! Turns a raw near-infrared reflectance spectrum (900-1700 nm, as handed
//! over by the acquisition driver) into a substance label with a
//! calibrated confidence:
//!
//! ```text
//!  raw SpectrumBuffer
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Pipeline  │  baseline / scatter / smoothing / derivative / selection
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────────┐
//!   │ FeatureExtractor│  identity, delta, or fixed projection
//!   └────────────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ Classifier │  softmax posteriors over the label vocabulary
//!   └───────────┘
//!        │
//!        ▼
//!   InferenceResult (label or UNKNOWN, confidence, diagnostics)
//! ```
//!
//! The pipeline configuration, feature-extractor configuration, and trained
//! classifier travel together as a [`bundle::ModelBundle`] so inference
//! always preprocesses exactly the way training did. Everything here is
//! pure and CPU-bound; a frozen bundle can serve many spectra concurrently.

pub mod bundle;
pub mod classifier;
pub mod error;
pub mod features;
pub mod inference;
pub mod io;
pub mod math;
pub mod pipeline;
pub mod spectrum;

pub use bundle::ModelBundle;
pub use classifier::{Classifier, TrainConfig};
pub use error::{Result, SpectraError};
pub use features::{FeatureExtractor, FeatureVector};
pub use inference::{
    Diagnostics, InferenceResult, InferenceService, QualityFlag, QualityPolicy, UNKNOWN_LABEL,
};
pub use pipeline::{Pipeline, Stage};
pub use spectrum::{MetadataValue, Provenance, SpectrumBuffer};
