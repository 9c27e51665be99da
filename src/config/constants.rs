// src/config/constants.rs
//! Configuration defaults and fixed limits

/// Band selection constants
pub mod selection {
    /// Noise threshold = mean noise magnitude × this multiplier
    pub const DEFAULT_NOISE_MULTIPLIER: f64 = 1.5;
    pub const MIN_NOISE_MULTIPLIER: f64 = 0.0;
}

/// Spectral transform constants
pub mod transform {
    /// Largest accepted transform size (2^26 bins)
    pub const MAX_TRANSFORM_SIZE: usize = 1 << 26;
}

/// Calibration curve (distortion suppression) constants
pub mod calibration {
    pub const DEFAULT_MEDIAN_KERNEL: usize = 3;
    pub const DEFAULT_OUTLIER_SIGMA: f64 = 3.0;
    /// Ratios at or below this are excluded from the gain threshold mean
    pub const DEFAULT_GAIN_FLOOR: f64 = 5.0;
    pub const DEFAULT_SMOOTHING_WINDOW: usize = 2;
}

/// File layout constants
pub mod files {
    pub const CURVE_HEADER: &str = "Frequency (Hz)\tGain Difference Ratio";
    pub const SPECTRUM_HEADER: &str = "Frequency (Hz)\tMagnitude";
    pub const HEADER_PREFIX: &str = "# ";
    pub const DECIMALS: usize = 6;
}

/// Environment override prefix for [`crate::config::ConfigLoader`]
pub const ENV_PREFIX: &str = "STITCH_";

/// Separator between section and key in environment overrides
pub const ENV_SECTION_SEPARATOR: &str = "__";
