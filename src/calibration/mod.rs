// src/calibration/mod.rs
//! Distortion-suppression calibration curves
//!
//! Turns a measured frequency→amplitude-ratio curve into a gain-difference
//! curve in four steps:
//! - median filtering of abrupt changes
//! - clamping of remaining outliers to their neighbours
//! - adaptive gain balancing toward the mean ratio, smoothed
//! - division of the balanced curve by the raw one
//!
//! The result shares the frequency-axis conventions of the stitcher and can
//! be applied to a stitched magnitude spectrum.

pub mod gain;
pub mod smoothing;

pub use gain::{adaptive_gain, clamp_outliers, mean_and_std};
pub use smoothing::{median_filter, moving_average_same};

use crate::config::CalibrationConfig;
use crate::error::{ProcessingStage, StitchError, StitchResult};
use tracing::debug;

/// Frequency→ratio pairs sorted by frequency
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCurve {
    frequencies: Vec<f64>,
    ratios: Vec<f64>,
}

impl CalibrationCurve {
    pub fn new(frequencies: Vec<f64>, ratios: Vec<f64>) -> StitchResult<Self> {
        if frequencies.is_empty() {
            return Err(StitchError::invalid_input(
                ProcessingStage::Calibration,
                "calibration curve is empty",
            ));
        }
        if frequencies.len() != ratios.len() {
            return Err(StitchError::invalid_input(
                ProcessingStage::Calibration,
                format!(
                    "{} frequencies but {} ratios",
                    frequencies.len(),
                    ratios.len()
                ),
            ));
        }
        if frequencies.windows(2).any(|w| !(w[0] <= w[1])) {
            return Err(StitchError::invalid_input(
                ProcessingStage::Calibration,
                "curve frequencies must be ascending",
            ));
        }
        Ok(Self { frequencies, ratios })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Linear interpolation, held constant beyond either end
    pub fn ratio_at(&self, frequency_hz: f64) -> f64 {
        let upper = self.frequencies.partition_point(|&f| f < frequency_hz);
        if upper == 0 {
            return self.ratios[0];
        }
        if upper == self.frequencies.len() {
            return self.ratios[upper - 1];
        }

        let (f0, f1) = (self.frequencies[upper - 1], self.frequencies[upper]);
        let (r0, r1) = (self.ratios[upper - 1], self.ratios[upper]);
        if f1 == f0 {
            return r1;
        }
        r0 + (r1 - r0) * (frequency_hz - f0) / (f1 - f0)
    }
}

/// Every intermediate curve of one calibration pass
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub filtered: Vec<f64>,
    pub clamped: Vec<f64>,
    pub gain: Vec<f64>,
    pub balanced: Vec<f64>,
    /// Balanced / raw, one point per input frequency
    pub difference: CalibrationCurve,
}

/// Configured calibration pass
#[derive(Debug, Clone)]
pub struct CalibrationPipeline {
    config: CalibrationConfig,
}

impl CalibrationPipeline {
    pub fn new(config: CalibrationConfig) -> StitchResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn process(&self, measured: &CalibrationCurve) -> StitchResult<CalibrationResult> {
        let raw = measured.ratios();

        let filtered = median_filter(raw, self.config.median_kernel)?;
        let clamped = clamp_outliers(raw, &filtered, self.config.outlier_sigma)?;

        let gain = moving_average_same(
            &adaptive_gain(&clamped, self.config.gain_floor),
            self.config.smoothing_window,
        )?;
        let balanced: Vec<f64> = clamped.iter().zip(&gain).map(|(c, g)| c * g).collect();

        let difference_ratios = balanced
            .iter()
            .zip(raw)
            .map(|(&b, &r)| if r == 0.0 { 1.0 } else { b / r })
            .collect();
        let difference = CalibrationCurve::new(measured.frequencies().to_vec(), difference_ratios)?;

        debug!(points = raw.len(), "calibration curve computed");

        Ok(CalibrationResult {
            filtered,
            clamped,
            gain,
            balanced,
            difference,
        })
    }
}
