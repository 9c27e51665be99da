//! Spectrum-Stitch: band-wise multi-channel spectrum stitching
//!
//! A multi-channel recording of one phenomenon is turned into a single
//! magnitude spectrum. Each frequency band is taken from the channel that
//! measures it best, with noisy bands falling back to the last clean
//! channel. The library provides:
//!
//! - Zero-padded FFT of every channel, run in parallel
//! - Noise profile estimation from a separate reference recording
//! - Band selection with fallback and Hermitian reassembly
//! - Target notches for known interference lines
//! - Calibration curve post-processing
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use spectrum_stitch::config::ConfigLoader;
//! use spectrum_stitch::io::read_wav;
//! use spectrum_stitch::processing::SpectralStitcher;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::with_paths(vec!["stitch.toml".into()]).load()?;
//!     let stitcher = SpectralStitcher::from_config(&config)?;
//!
//!     let recording = read_wav("recording.wav")?;
//!     let noise = read_wav("noise.wav")?.signal(0).ok_or("noise file has no channels")?;
//!
//!     let output = stitcher.run(&recording, &noise)?;
//!     println!("{}", output.report_json()?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod io;
pub mod processing;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, SelectionMode, StitchConfig};
pub use error::{ProcessingStage, StitchError, StitchResult};
pub use processing::{
    Band, BandTable, Diagnostic, NoiseProfile, Recording, Signal, SpectralStitcher, StitchOutput,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Band-wise multi-channel spectrum stitching".to_string(),
        features: vec![
            "Parallel per-channel FFT".to_string(),
            "Noise-gated band selection with fallback".to_string(),
            "Hermitian spectrum reassembly".to_string(),
            "Target notch filtering".to_string(),
            "Calibration curve processing".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
