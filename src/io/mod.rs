// src/io/mod.rs
//! File input and output
//!
//! - WAV recordings via `hound`, kept at their stored integer scale
//! - tab-separated curve files with a single `#` header line

pub mod curve;
pub mod wav;

pub use curve::{read_curve, write_curve, write_spectrum};
pub use wav::{read_wav, write_wav};
