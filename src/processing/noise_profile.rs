//! Noise reference magnitude profile and the gate consulted by band selection

use crate::config::constants::selection::DEFAULT_NOISE_MULTIPLIER;
use crate::error::{ProcessingStage, StitchError, StitchResult};
use crate::processing::transform::HalfSpectrum;
use std::ops::Range;
use tracing::debug;

/// Decides whether a run of half-spectrum bins carries noise energy.
///
/// The band selector only talks to this trait, so a per-band threshold can
/// replace the single global scalar without touching selection.
pub trait NoiseGate {
    /// Transform size the gate's bins were computed at
    fn fft_size(&self) -> usize;

    /// Number of half-spectrum bins the gate knows about
    fn bin_count(&self) -> usize;

    /// True if any bin in `bins` is above the noise threshold
    fn is_noisy(&self, bins: Range<usize>) -> bool;
}

/// Per-bin noise magnitude and a single global threshold
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    fft_size: usize,
    per_bin_magnitude: Vec<f64>,
    threshold: f64,
}

impl NoiseProfile {
    /// Threshold = mean magnitude of the reference × `multiplier`
    pub fn estimate(reference: &HalfSpectrum, multiplier: f64) -> StitchResult<Self> {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(StitchError::invalid_config(
                "selection.noise_multiplier",
                format!("must be finite and non-negative, got {multiplier}"),
            ));
        }
        if reference.is_empty() {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                "noise reference spectrum is empty",
            ));
        }

        let per_bin_magnitude = reference.magnitudes();
        let mean = per_bin_magnitude.iter().sum::<f64>() / per_bin_magnitude.len() as f64;
        let threshold = mean * multiplier;

        debug!(
            fft_size = reference.fft_size(),
            mean_magnitude = mean,
            threshold,
            "estimated noise profile"
        );

        Ok(Self {
            fft_size: reference.fft_size(),
            per_bin_magnitude,
            threshold,
        })
    }

    /// Estimate with the default multiplier of 1.5
    pub fn estimate_default(reference: &HalfSpectrum) -> StitchResult<Self> {
        Self::estimate(reference, DEFAULT_NOISE_MULTIPLIER)
    }

    /// Build a profile from explicit values, e.g. a synthetic reference
    pub fn from_parts(fft_size: usize, per_bin_magnitude: Vec<f64>, threshold: f64) -> StitchResult<Self> {
        if per_bin_magnitude.len() != fft_size / 2 + 1 {
            return Err(StitchError::MismatchedTransformSize {
                what: "noise profile".to_string(),
                expected: fft_size / 2 + 1,
                actual: per_bin_magnitude.len(),
            });
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                format!("threshold must be finite and non-negative, got {threshold}"),
            ));
        }
        if per_bin_magnitude.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                "per-bin magnitudes must be finite and non-negative",
            ));
        }
        Ok(Self {
            fft_size,
            per_bin_magnitude,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn per_bin_magnitude(&self) -> &[f64] {
        &self.per_bin_magnitude
    }

    /// Indices of every bin above the threshold
    pub fn noisy_bins(&self) -> Vec<usize> {
        self.per_bin_magnitude
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m > self.threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl NoiseGate for NoiseProfile {
    fn fft_size(&self) -> usize {
        self.fft_size
    }

    fn bin_count(&self) -> usize {
        self.per_bin_magnitude.len()
    }

    fn is_noisy(&self, bins: Range<usize>) -> bool {
        let end = bins.end.min(self.per_bin_magnitude.len());
        let start = bins.start.min(end);
        self.per_bin_magnitude[start..end]
            .iter()
            .any(|&m| m > self.threshold)
    }
}
