// src/error.rs
//! Unified error handling for the spectrum stitcher
//!
//! Every fallible operation in the crate returns [`StitchResult`]. All kinds are
//! fatal to the run that produced them: the computation is pure and
//! deterministic, so the fix is always in the configuration or the input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Unified error type for the spectrum stitcher
#[derive(Debug, Error)]
pub enum StitchError {
    /// Malformed or empty signal, non-positive sample rate
    #[error("[INPUT] {stage} stage rejected input: {reason}")]
    InvalidInput {
        stage: ProcessingStage,
        reason: String,
    },

    /// A spectrum was produced at a different transform size than the run's
    #[error("[TRANSFORM] {what} has transform size {actual}, expected {expected}")]
    MismatchedTransformSize {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Gaps, overlaps or non-monotonic bands in the band table
    #[error("[BANDS] Band coverage violation at band {band_index}: {reason}")]
    BandCoverageViolation {
        band_index: usize,
        reason: String,
    },

    /// Reassembly could not produce a gap-free, duplicate-free half spectrum
    #[error("[REASSEMBLY] Incomplete spectrum: covered {covered} of {expected} bins (missing {missing:?}, duplicated {duplicated:?})")]
    IncompleteSpectrum {
        expected: usize,
        covered: usize,
        missing: Vec<Range<usize>>,
        duplicated: Vec<Range<usize>>,
    },

    /// Zero divisor, empty band table and other unusable settings
    #[error("[CONFIG] Invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    /// Configuration text could not be parsed or deserialized
    #[error("[CONFIG] Failed to parse configuration from {source_name}: {reason}")]
    ConfigParse {
        source_name: String,
        reason: String,
    },

    /// WAV decoding failure
    #[error("[IO] WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Filesystem failure
    #[error("[IO] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Run report serialization failure
    #[error("[IO] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Signal processing stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Transform,
    NoiseEstimation,
    BandSelection,
    Reassembly,
    Notch,
    Calibration,
    FileInput,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStage::Transform => "transform",
            ProcessingStage::NoiseEstimation => "noise-estimation",
            ProcessingStage::BandSelection => "band-selection",
            ProcessingStage::Reassembly => "reassembly",
            ProcessingStage::Notch => "notch",
            ProcessingStage::Calibration => "calibration",
            ProcessingStage::FileInput => "file-input",
        };
        f.write_str(name)
    }
}

/// Result type alias for stitcher operations
pub type StitchResult<T> = Result<T, StitchError>;

impl StitchError {
    pub(crate) fn invalid_input(stage: ProcessingStage, reason: impl Into<String>) -> Self {
        StitchError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StitchError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn coverage(band_index: usize, reason: impl Into<String>) -> Self {
        StitchError::BandCoverageViolation {
            band_index,
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            StitchError::InvalidInput { .. } => "InvalidInput",
            StitchError::MismatchedTransformSize { .. } => "MismatchedTransformSize",
            StitchError::BandCoverageViolation { .. } => "BandCoverageViolation",
            StitchError::IncompleteSpectrum { .. } => "IncompleteSpectrum",
            StitchError::InvalidConfig { .. } => "InvalidConfig",
            StitchError::ConfigParse { .. } => "ConfigParse",
            StitchError::Wav(_) => "Wav",
            StitchError::Io(_) => "Io",
            StitchError::Json(_) => "Json",
        }
    }
}
