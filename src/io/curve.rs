//! Tab-separated two-column text files
//!
//! Layout: one `# ` header line, then `frequency<TAB>value` rows with six
//! decimals. Readers skip the first line whatever it contains.

use crate::calibration::CalibrationCurve;
use crate::config::constants::files::{CURVE_HEADER, DECIMALS, HEADER_PREFIX, SPECTRUM_HEADER};
use crate::error::{ProcessingStage, StitchError, StitchResult};
use std::fmt::Write as _;
use std::path::Path;

/// Read a calibration curve file
pub fn read_curve<P: AsRef<Path>>(path: P) -> StitchResult<CalibrationCurve> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let (frequencies, ratios) = parse_columns(&content, &path.display().to_string())?;
    CalibrationCurve::new(frequencies, ratios)
}

/// Write a gain-difference curve
pub fn write_curve<P: AsRef<Path>>(path: P, curve: &CalibrationCurve) -> StitchResult<()> {
    let points: Vec<(f64, f64)> = curve
        .frequencies()
        .iter()
        .copied()
        .zip(curve.ratios().iter().copied())
        .collect();
    std::fs::write(path, render_columns(CURVE_HEADER, &points))?;
    Ok(())
}

/// Write `(frequency, magnitude)` points of a stitched spectrum
pub fn write_spectrum<P: AsRef<Path>>(path: P, points: &[(f64, f64)]) -> StitchResult<()> {
    std::fs::write(path, render_columns(SPECTRUM_HEADER, points))?;
    Ok(())
}

fn render_columns(header: &str, points: &[(f64, f64)]) -> String {
    let mut out = String::with_capacity(header.len() + points.len() * 24);
    out.push_str(HEADER_PREFIX);
    out.push_str(header);
    out.push('\n');
    for (x, y) in points {
        // writing to a String cannot fail
        let _ = writeln!(out, "{x:.prec$}\t{y:.prec$}", prec = DECIMALS);
    }
    out
}

fn parse_columns(content: &str, source: &str) -> StitchResult<(Vec<f64>, Vec<f64>)> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for (line_no, line) in content.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(x), Some(y), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(StitchError::invalid_input(
                ProcessingStage::FileInput,
                format!("{source}:{}: expected two columns", line_no + 1),
            ));
        };
        let parse = |field: &str| {
            field.parse::<f64>().map_err(|e| {
                StitchError::invalid_input(
                    ProcessingStage::FileInput,
                    format!("{source}:{}: '{field}': {e}", line_no + 1),
                )
            })
        };
        xs.push(parse(x)?);
        ys.push(parse(y)?);
    }

    Ok((xs, ys))
}
