// src/config/mod.rs
//! Stitcher configuration: band table, notches, selection and calibration settings

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::error::{StitchError, StitchResult};
use crate::processing::band_table::{Band, BandTable};
use crate::processing::notch::TargetNotch;
use serde::{Deserialize, Serialize};

/// Complete stitcher configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct StitchConfig {
    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub bands: Vec<BandConfig>,

    #[serde(default)]
    pub notches: Vec<NotchConfig>,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Band selection settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SelectionConfig {
    #[serde(default = "defaults::noise_multiplier")]
    pub noise_multiplier: f64,

    #[serde(default)]
    pub mode: SelectionMode,

    #[serde(default)]
    pub amplitude_scaling: AmplitudeScaling,
}

/// How dropped bands are treated at reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any missing bin fails the run with `IncompleteSpectrum`
    #[default]
    Strict,
    /// Missing bins are zeroed and reported as diagnostics
    Lenient,
}

/// Scaling applied to every spectrum after the forward transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeScaling {
    /// Divide by the recorded length before zero padding
    #[default]
    SignalLength,
    /// Raw transform output
    None,
}

/// One band/channel assignment as written in configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BandConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    pub channel: usize,
}

/// One target notch as written in configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotchConfig {
    pub frequency_hz: f64,
    pub divisor: f64,
}

/// Calibration curve pipeline settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default = "defaults::median_kernel")]
    pub median_kernel: usize,

    #[serde(default = "defaults::outlier_sigma")]
    pub outlier_sigma: f64,

    #[serde(default = "defaults::gain_floor")]
    pub gain_floor: f64,

    #[serde(default = "defaults::smoothing_window")]
    pub smoothing_window: usize,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn noise_multiplier() -> f64 { selection::DEFAULT_NOISE_MULTIPLIER }

    pub fn median_kernel() -> usize { calibration::DEFAULT_MEDIAN_KERNEL }
    pub fn outlier_sigma() -> f64 { calibration::DEFAULT_OUTLIER_SIGMA }
    pub fn gain_floor() -> f64 { calibration::DEFAULT_GAIN_FLOOR }
    pub fn smoothing_window() -> usize { calibration::DEFAULT_SMOOTHING_WINDOW }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            noise_multiplier: defaults::noise_multiplier(),
            mode: SelectionMode::default(),
            amplitude_scaling: AmplitudeScaling::default(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            median_kernel: defaults::median_kernel(),
            outlier_sigma: defaults::outlier_sigma(),
            gain_floor: defaults::gain_floor(),
            smoothing_window: defaults::smoothing_window(),
        }
    }
}

impl StitchConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> StitchResult<Self> {
        toml::from_str(content).map_err(|e| StitchError::ConfigParse {
            source_name: "inline TOML".to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> StitchResult<String> {
        toml::to_string_pretty(self).map_err(|e| StitchError::ConfigParse {
            source_name: "StitchConfig".to_string(),
            reason: e.to_string(),
        })
    }

    /// Validate every section; the band table is checked structurally here,
    /// coverage against a concrete frequency axis happens per run
    pub fn validate(&self) -> StitchResult<()> {
        self.selection.validate()?;
        self.band_table()?;
        self.target_notches()?;
        self.calibration.validate()
    }

    /// Build the validated band table
    pub fn band_table(&self) -> StitchResult<BandTable> {
        let bands = self
            .bands
            .iter()
            .map(|b| Band::new(b.low_hz, b.high_hz, b.channel))
            .collect();
        BandTable::new(bands)
    }

    /// Build the validated notch list
    pub fn target_notches(&self) -> StitchResult<Vec<TargetNotch>> {
        self.notches
            .iter()
            .enumerate()
            .map(|(i, n)| {
                TargetNotch::new(n.frequency_hz, n.divisor).map_err(|e| match e {
                    StitchError::InvalidConfig { field, reason } => {
                        StitchError::invalid_config(format!("notches[{i}].{field}"), reason)
                    }
                    other => other,
                })
            })
            .collect()
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> StitchResult<()> {
        if !self.noise_multiplier.is_finite()
            || self.noise_multiplier < selection::MIN_NOISE_MULTIPLIER
        {
            return Err(StitchError::invalid_config(
                "selection.noise_multiplier",
                format!("must be finite and non-negative, got {}", self.noise_multiplier),
            ));
        }
        Ok(())
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> StitchResult<()> {
        if self.median_kernel == 0 || self.median_kernel % 2 == 0 {
            return Err(StitchError::invalid_config(
                "calibration.median_kernel",
                format!("must be a positive odd number, got {}", self.median_kernel),
            ));
        }
        if self.smoothing_window == 0 {
            return Err(StitchError::invalid_config(
                "calibration.smoothing_window",
                "must be at least 1",
            ));
        }
        if !self.outlier_sigma.is_finite() || self.outlier_sigma < 0.0 {
            return Err(StitchError::invalid_config(
                "calibration.outlier_sigma",
                format!("must be finite and non-negative, got {}", self.outlier_sigma),
            ));
        }
        if !self.gain_floor.is_finite() {
            return Err(StitchError::invalid_config(
                "calibration.gain_floor",
                "must be finite",
            ));
        }
        Ok(())
    }
}
