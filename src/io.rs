use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::error::SpectraError;
use crate::spectrum::SpectrumBuffer;

// ---------------------------------------------------------------------------
// CSV spectrum files (acquisition-collaborator contract)
// ---------------------------------------------------------------------------

/// Load one spectrum from a CSV file.
///
/// Canonical layout: one header row, then one data row per sample with
/// columns `wavelength,intensity`. Scanner-exported legacy files carry
/// extra columns and name the signal `absorbance`; those are accepted by
/// falling back to the `absorbance` column when `intensity` is absent.
pub fn load_csv(path: &Path) -> Result<SpectrumBuffer> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let wl_idx = headers
        .iter()
        .position(|h| h == "wavelength")
        .context("CSV missing 'wavelength' column")?;
    let y_idx = match headers.iter().position(|h| h == "intensity") {
        Some(i) => i,
        None => headers
            .iter()
            .position(|h| h == "absorbance")
            .context("CSV missing 'intensity' (or legacy 'absorbance') column")?,
    };

    let mut wavelengths = Vec::new();
    let mut intensities = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        wavelengths.push(parse_float(record.get(wl_idx), row_no, "wavelength")?);
        intensities.push(parse_float(record.get(y_idx), row_no, "intensity")?);
    }

    if wavelengths.is_empty() {
        bail!("{} contains no data rows", path.display());
    }

    SpectrumBuffer::new(wavelengths, intensities)
        .with_context(|| format!("validating spectrum from {}", path.display()))
}

fn parse_float(field: Option<&str>, row: usize, col: &str) -> Result<f64> {
    let tok = field.unwrap_or("").trim();
    tok.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{tok}' is not a number"))
}

/// Write a spectrum in the canonical two-column layout.
pub fn save_csv(path: &Path, buf: &SpectrumBuffer) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["wavelength", "intensity"])?;
    for (w, y) in buf.wavelengths.iter().zip(&buf.intensities) {
        writer.write_record([w.to_string(), y.to_string()])?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Absorbance
// ---------------------------------------------------------------------------

/// Convert raw intensities to absorbance against a reference scan:
/// `A = -log10(I / I0)`.
///
/// A non-positive intensity or reference would produce NaN/Inf, so it is
/// reported as a tagged condition instead.
pub fn absorbance(
    intensities: &[f64],
    references: &[f64],
) -> std::result::Result<Vec<f64>, SpectraError> {
    if intensities.len() != references.len() {
        return Err(SpectraError::InvalidShape(format!(
            "{} intensities but {} reference values",
            intensities.len(),
            references.len()
        )));
    }
    intensities
        .iter()
        .zip(references)
        .enumerate()
        .map(|(i, (&y, &r))| {
            if !(y > 0.0 && r > 0.0) {
                return Err(SpectraError::NonFinite {
                    context: "absorbance",
                    index: i,
                });
            }
            Ok(-(y / r).log10())
        })
        .collect()
}
