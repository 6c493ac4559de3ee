//! The closed set of preprocessing stage variants.
//!
//! Each variant carries its own parameter set and maps to one pure
//! transform `SpectrumBuffer -> SpectrumBuffer` (in place, on the
//! pipeline's working copy). The enum is serde-serializable so a pipeline
//! configuration is plain data, persisted verbatim inside a model bundle.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::pipeline::{baseline, normalize, savgol, scatter, select};
use crate::spectrum::SpectrumBuffer;

/// Default degeneracy epsilon for variance/range checks.
pub const DEFAULT_EPSILON: f64 = 1e-9;

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ---------------------------------------------------------------------------
// Stage variants
// ---------------------------------------------------------------------------

/// One preprocessing transform with frozen parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// Subtract a least-squares polynomial baseline of the given order.
    Baseline {
        order: usize,
        #[serde(default, skip_serializing_if = "is_false")]
        clamp_negative: bool,
    },
    /// Standard Normal Variate scatter correction.
    Snv {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// Multiplicative Scatter Correction against a reference spectrum.
    Msc {
        reference: Vec<f64>,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// Savitzky-Golay smoothing (local polynomial fit, odd window).
    SavitzkyGolay { window: usize, order: usize },
    /// Savitzky-Golay derivative; `derivative` 0 is the identity.
    Derivative {
        window: usize,
        order: usize,
        derivative: usize,
    },
    /// Min-max scaling onto [0, 1].
    MinMax {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// Scale to unit absolute area under the curve.
    UnitArea {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// Keep only the `[lo_nm, hi_nm]` wavelength band.
    SelectRange { lo_nm: f64, hi_nm: f64 },
    /// Keep only the `[start, end)` index range.
    SelectIndices { start: usize, end: usize },
    /// Downsample to `bins` blocks by averaging; output wavelengths are
    /// block midpoints.
    BlockAverage { bins: usize },
}

impl Stage {
    /// Stable stage name used in diagnostics and failure reports.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Baseline { .. } => "baseline",
            Stage::Snv { .. } => "snv",
            Stage::Msc { .. } => "msc",
            Stage::SavitzkyGolay { .. } => "savitzky_golay",
            Stage::Derivative { .. } => "derivative",
            Stage::MinMax { .. } => "min_max",
            Stage::UnitArea { .. } => "unit_area",
            Stage::SelectRange { .. } => "select_range",
            Stage::SelectIndices { .. } => "select_indices",
            Stage::BlockAverage { .. } => "block_average",
        }
    }

    /// Whether applying the stage twice equals applying it once.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Stage::Snv { .. } | Stage::MinMax { .. } | Stage::UnitArea { .. }
        )
    }

    /// Check the parameter set. Called once at pipeline construction;
    /// violations are deployment errors, raised before any spectrum is
    /// processed.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SpectraError::Configuration(msg));
        match *self {
            Stage::Baseline { order, .. } => {
                if order > 10 {
                    return fail(format!("baseline order {order} exceeds 10"));
                }
            }
            Stage::Snv { epsilon } | Stage::MinMax { epsilon } | Stage::UnitArea { epsilon } => {
                if !(epsilon > 0.0) {
                    return fail(format!("epsilon must be positive, got {epsilon}"));
                }
            }
            Stage::Msc { ref reference, epsilon } => {
                if reference.is_empty() {
                    return fail("msc reference spectrum is empty".into());
                }
                if reference.iter().any(|r| !r.is_finite()) {
                    return fail("msc reference contains non-finite values".into());
                }
                if !(epsilon > 0.0) {
                    return fail(format!("epsilon must be positive, got {epsilon}"));
                }
            }
            Stage::SavitzkyGolay { window, order } => {
                validate_savgol(window, order, 0)?;
            }
            Stage::Derivative {
                window,
                order,
                derivative,
            } => {
                if derivative > 2 {
                    return fail(format!("derivative order {derivative} exceeds 2"));
                }
                if derivative > 0 {
                    validate_savgol(window, order, derivative)?;
                }
            }
            Stage::SelectRange { lo_nm, hi_nm } => {
                if !(lo_nm < hi_nm) {
                    return fail(format!("empty wavelength band {lo_nm}-{hi_nm} nm"));
                }
            }
            Stage::SelectIndices { start, end } => {
                if start >= end {
                    return fail(format!("empty index range {start}..{end}"));
                }
            }
            Stage::BlockAverage { bins } => {
                if bins == 0 {
                    return fail("block average needs at least one bin".into());
                }
            }
        }
        Ok(())
    }

    /// Run the transform on a validated working buffer.
    ///
    /// The buffer invariants are re-checked on entry so a malformed buffer
    /// fails fast at the stage boundary, never as NaN downstream.
    pub fn apply(&self, buf: &mut SpectrumBuffer) -> Result<()> {
        buf.validate()?;
        log::debug!("applying stage '{}' to {} samples", self.name(), buf.len());

        match *self {
            Stage::Baseline {
                order,
                clamp_negative,
            } => baseline::correct(buf, order, clamp_negative),
            Stage::Snv { epsilon } => scatter::snv(buf, epsilon),
            Stage::Msc { ref reference, epsilon } => scatter::msc(buf, reference, epsilon),
            Stage::SavitzkyGolay { window, order } => savgol::filter(buf, window, order, 0),
            Stage::Derivative {
                window,
                order,
                derivative,
            } => {
                if derivative == 0 {
                    Ok(())
                } else {
                    savgol::filter(buf, window, order, derivative)
                }
            }
            Stage::MinMax { epsilon } => normalize::min_max(buf, epsilon),
            Stage::UnitArea { epsilon } => normalize::unit_area(buf, epsilon),
            Stage::SelectRange { lo_nm, hi_nm } => select::select_range(buf, lo_nm, hi_nm),
            Stage::SelectIndices { start, end } => select::select_indices(buf, start, end),
            Stage::BlockAverage { bins } => select::block_average(buf, bins),
        }
    }
}

/// Savitzky-Golay parameter contract: odd window, window >= order + 2,
/// derivative no higher than the fit order.
fn validate_savgol(window: usize, order: usize, derivative: usize) -> Result<()> {
    if window % 2 == 0 {
        return Err(SpectraError::Configuration(format!(
            "savitzky-golay window must be odd, got {window}"
        )));
    }
    if window < order + 2 {
        return Err(SpectraError::Configuration(format!(
            "savitzky-golay window {window} too short for order {order} \
             (need at least {})",
            order + 2
        )));
    }
    if derivative > order {
        return Err(SpectraError::Configuration(format!(
            "derivative {derivative} exceeds polynomial order {order}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_window_is_a_configuration_error() {
        let err = Stage::SavitzkyGolay { window: 8, order: 2 }
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn window_shorter_than_order_plus_two_rejected() {
        let err = Stage::SavitzkyGolay { window: 3, order: 2 }
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn derivative_above_order_rejected() {
        let err = Stage::Derivative {
            window: 9,
            order: 1,
            derivative: 2,
        }
        .validate()
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn derivative_zero_is_identity() {
        let wl: Vec<f64> = (0..20).map(|i| 900.0 + i as f64).collect();
        let ys: Vec<f64> = (0..20).map(|i| (i as f64).sin()).collect();
        let mut buf = SpectrumBuffer::new(wl, ys.clone()).unwrap();
        Stage::Derivative {
            window: 9,
            order: 2,
            derivative: 0,
        }
        .apply(&mut buf)
        .unwrap();
        assert_eq!(buf.intensities, ys);
    }

    #[test]
    fn idempotency_flags() {
        assert!(Stage::Snv { epsilon: 1e-9 }.is_idempotent());
        assert!(!Stage::SavitzkyGolay { window: 9, order: 2 }.is_idempotent());
        assert!(!Stage::Baseline { order: 2, clamp_negative: false }.is_idempotent());
    }

    #[test]
    fn stage_config_round_trips_through_json() {
        let stage = Stage::Derivative {
            window: 9,
            order: 2,
            derivative: 1,
        };
        let json = serde_json::to_string(&stage).unwrap();
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(stage, back);
    }
}
