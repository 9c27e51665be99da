// src/processing/mod.rs
//! Spectral processing chain: transform, noise gating, band selection,
//! reassembly and notching

pub mod band_selector;
pub mod band_table;
pub mod noise_profile;
pub mod notch;
pub mod pipeline;
pub mod reassembly;
pub mod transform;

pub use band_selector::{select_bands, BandOutcome, DroppedBand, Segment, Selection, SelectorState};
pub use band_table::{Band, BandTable};
pub use noise_profile::{NoiseGate, NoiseProfile};
pub use notch::{NotchFilter, NotchHit, TargetNotch};
pub use pipeline::{Diagnostic, Recording, Signal, SpectralStitcher, StitchOutput, StitchReport};
pub use reassembly::{mirror_hermitian, reassemble, Reassembled};
pub use transform::{transform_size_for, FrequencyAxis, HalfSpectrum, SpectralTransform, Spectrum};
