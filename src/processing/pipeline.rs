// src/processing/pipeline.rs
//! End-to-end stitching pipeline
//!
//! recording → per-channel transform (parallel) → noise profile → band
//! selection → reassembly → target notches → magnitude spectrum.
//! All configuration and band-table checks run before the first transform.

use crate::calibration::CalibrationCurve;
use crate::config::{AmplitudeScaling, SelectionMode, StitchConfig};
use crate::error::{ProcessingStage, StitchError, StitchResult};
use crate::processing::band_selector::{select_bands, BandOutcome};
use crate::processing::band_table::BandTable;
use crate::processing::noise_profile::{NoiseGate, NoiseProfile};
use crate::processing::notch::{NotchFilter, NotchHit};
use crate::processing::reassembly::reassemble;
use crate::processing::transform::{FrequencyAxis, HalfSpectrum, Spectrum, SpectralTransform};
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use tracing::{info, warn};

/// Multi-channel recording, one column per channel
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    sample_rate: f64,
    samples: Array2<f64>,
}

impl Recording {
    /// `samples` is shaped `(frames, channels)`
    pub fn new(sample_rate: f64, samples: Array2<f64>) -> StitchResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("sample rate must be positive, got {sample_rate}"),
            ));
        }
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("recording has shape {:?}, need at least one sample and one channel", samples.dim()),
            ));
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    /// Build from separate channel vectors of equal length
    pub fn from_channels(sample_rate: f64, channels: &[Vec<f64>]) -> StitchResult<Self> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if let Some((i, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != frames) {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("channel {i} has {} samples, channel 0 has {frames}", ch.len()),
            ));
        }
        let samples = Array2::from_shape_fn((frames, channels.len()), |(t, c)| channels[c][t]);
        Self::new(sample_rate, samples)
    }

    /// Build from interleaved frames, as stored in a WAV file
    pub fn from_interleaved(sample_rate: f64, channel_count: usize, interleaved: Vec<f64>) -> StitchResult<Self> {
        if channel_count == 0 || interleaved.len() % channel_count != 0 {
            return Err(StitchError::invalid_input(
                ProcessingStage::FileInput,
                format!(
                    "{} samples do not split into {channel_count} channels",
                    interleaved.len()
                ),
            ));
        }
        let frames = interleaved.len() / channel_count;
        let samples = Array2::from_shape_vec((frames, channel_count), interleaved).map_err(|e| {
            StitchError::invalid_input(ProcessingStage::FileInput, e.to_string())
        })?;
        Self::new(sample_rate, samples)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.samples.ncols()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    pub fn channel(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.channel_count()).then(|| self.samples.column(index).to_vec())
    }

    /// One channel as a standalone signal, e.g. the noise reference
    pub fn signal(&self, index: usize) -> Option<Signal> {
        self.channel(index).map(|samples| Signal {
            sample_rate: self.sample_rate,
            samples,
        })
    }
}

/// Single-channel signal
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    sample_rate: f64,
    samples: Vec<f64>,
}

impl Signal {
    pub fn new(sample_rate: f64, samples: Vec<f64>) -> StitchResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                format!("sample rate must be positive, got {sample_rate}"),
            ));
        }
        if samples.is_empty() {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                "signal is empty",
            ));
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Non-fatal findings of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Noisy band with nothing accepted before it
    BandDropped {
        band_index: usize,
        low_hz: f64,
        high_hz: f64,
        bins: Range<usize>,
    },
    /// Bins left at zero in lenient mode
    MissingBins { bins: Range<usize> },
    /// Band narrower than the bin spacing
    EmptyBand {
        band_index: usize,
        low_hz: f64,
        high_hz: f64,
    },
    NotchAboveNyquist { frequency_hz: f64, nyquist_hz: f64 },
}

/// Stitched spectrum and everything needed to judge it
#[derive(Debug, Clone)]
pub struct StitchOutput {
    pub axis: FrequencyAxis,
    /// Full notched spectrum, conjugate-symmetric
    pub spectrum: Spectrum,
    /// Magnitude of bins `0..=N/2`
    pub magnitude: Vec<f64>,
    pub missing: Vec<Range<usize>>,
    pub outcomes: Vec<BandOutcome>,
    pub notch_hits: Vec<NotchHit>,
    pub diagnostics: Vec<Diagnostic>,
    pub noise_threshold: Option<f64>,
}

/// Serializable summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct StitchReport {
    pub fft_size: usize,
    pub sample_rate: f64,
    pub bins: usize,
    pub coverage: f64,
    pub noise_threshold: Option<f64>,
    pub bands: Vec<BandOutcome>,
    pub notches: Vec<NotchHit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StitchOutput {
    /// Fraction of half-spectrum bins backed by a selected segment
    pub fn coverage(&self) -> f64 {
        let total = self.magnitude.len();
        let missing: usize = self.missing.iter().map(|r| r.len()).sum();
        (total - missing) as f64 / total as f64
    }

    /// `(frequency, magnitude)` for every covered bin
    pub fn covered_points(&self) -> Vec<(f64, f64)> {
        self.axis
            .frequencies()
            .iter()
            .zip(&self.magnitude)
            .enumerate()
            .filter(|(bin, _)| !self.missing.iter().any(|r| r.contains(bin)))
            .map(|(_, (&f, &m))| (f, m))
            .collect()
    }

    /// Scale the magnitude by a calibration curve interpolated onto the axis
    pub fn apply_gain_curve(&mut self, curve: &CalibrationCurve) {
        for (magnitude, &frequency) in self.magnitude.iter_mut().zip(self.axis.frequencies()) {
            *magnitude *= curve.ratio_at(frequency);
        }
    }

    pub fn report(&self) -> StitchReport {
        StitchReport {
            fft_size: self.axis.fft_size(),
            sample_rate: self.axis.sample_rate(),
            bins: self.axis.len(),
            coverage: self.coverage(),
            noise_threshold: self.noise_threshold,
            bands: self.outcomes.clone(),
            notches: self.notch_hits.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn report_json(&self) -> StitchResult<String> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }
}

/// Validated, reusable stitcher
#[derive(Debug, Clone)]
pub struct SpectralStitcher {
    table: BandTable,
    notches: NotchFilter,
    noise_multiplier: f64,
    mode: SelectionMode,
    scaling: AmplitudeScaling,
}

impl SpectralStitcher {
    /// Validate the whole configuration up front
    pub fn from_config(config: &StitchConfig) -> StitchResult<Self> {
        config.validate()?;
        Ok(Self {
            table: config.band_table()?,
            notches: NotchFilter::new(config.target_notches()?),
            noise_multiplier: config.selection.noise_multiplier,
            mode: config.selection.mode,
            scaling: config.selection.amplitude_scaling,
        })
    }

    pub fn new(table: BandTable, notches: NotchFilter, mode: SelectionMode) -> Self {
        Self {
            table,
            notches,
            noise_multiplier: crate::config::selection::DEFAULT_NOISE_MULTIPLIER,
            mode,
            scaling: AmplitudeScaling::default(),
        }
    }

    pub fn with_noise_multiplier(mut self, multiplier: f64) -> Self {
        self.noise_multiplier = multiplier;
        self
    }

    pub fn with_scaling(mut self, scaling: AmplitudeScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn band_table(&self) -> &BandTable {
        &self.table
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Stitch `recording`, deriving the noise profile from `noise`
    pub fn run(&self, recording: &Recording, noise: &Signal) -> StitchResult<StitchOutput> {
        if noise.sample_rate() != recording.sample_rate() {
            return Err(StitchError::invalid_input(
                ProcessingStage::NoiseEstimation,
                format!(
                    "noise reference sampled at {} Hz, recording at {} Hz",
                    noise.sample_rate(),
                    recording.sample_rate()
                ),
            ));
        }

        let (transform, axis, ranges) = self.prepare(recording)?;

        if noise.len() > transform.fft_size() {
            return Err(StitchError::MismatchedTransformSize {
                what: "noise reference".to_string(),
                expected: transform.fft_size(),
                actual: noise.len().next_power_of_two(),
            });
        }

        let spectra = Self::transform_channels(&transform, recording)?;
        let noise_half = transform.forward_half(noise.samples(), noise.sample_rate())?;
        let profile = NoiseProfile::estimate(&noise_half, self.noise_multiplier)?;

        self.finish(axis, &ranges, &spectra, &profile, Some(profile.threshold()))
    }

    /// Stitch `recording` against a prepared gate, e.g. a synthetic profile
    pub fn run_with_gate<G: NoiseGate + ?Sized>(
        &self,
        recording: &Recording,
        gate: &G,
    ) -> StitchResult<StitchOutput> {
        let (transform, axis, ranges) = self.prepare(recording)?;
        if gate.fft_size() != transform.fft_size() {
            return Err(StitchError::MismatchedTransformSize {
                what: "noise reference".to_string(),
                expected: transform.fft_size(),
                actual: gate.fft_size(),
            });
        }
        let spectra = Self::transform_channels(&transform, recording)?;
        self.finish(axis, &ranges, &spectra, gate, None)
    }

    /// Size the transform and check the band table before any FFT work
    fn prepare(&self, recording: &Recording) -> StitchResult<(SpectralTransform, FrequencyAxis, Vec<Range<usize>>)> {
        let transform = SpectralTransform::for_length(recording.len(), self.scaling)?;
        let axis = transform.axis(recording.sample_rate())?;
        let ranges = self.table.validate_coverage(&axis, recording.channel_count())?;

        info!(
            channels = recording.channel_count(),
            samples = recording.len(),
            fft_size = transform.fft_size(),
            bands = self.table.len(),
            "stitching recording"
        );
        Ok((transform, axis, ranges))
    }

    fn transform_channels(transform: &SpectralTransform, recording: &Recording) -> StitchResult<Vec<HalfSpectrum>> {
        (0..recording.channel_count())
            .into_par_iter()
            .map(|c| {
                let samples = recording.samples().column(c).to_vec();
                transform.forward_half(&samples, recording.sample_rate())
            })
            .collect()
    }

    fn finish<G: NoiseGate + ?Sized>(
        &self,
        axis: FrequencyAxis,
        ranges: &[Range<usize>],
        spectra: &[HalfSpectrum],
        gate: &G,
        noise_threshold: Option<f64>,
    ) -> StitchResult<StitchOutput> {
        let mut diagnostics = Vec::new();
        for (band_index, range) in ranges.iter().enumerate() {
            if range.is_empty() {
                let band = &self.table.bands()[band_index];
                warn!(band_index, low_hz = band.low_hz, high_hz = band.high_hz, "band contains no bins");
                diagnostics.push(Diagnostic::EmptyBand {
                    band_index,
                    low_hz: band.low_hz,
                    high_hz: band.high_hz,
                });
            }
        }

        let selection = select_bands(&self.table, &axis, spectra, gate)?;
        diagnostics.extend(selection.dropped.iter().map(|d| Diagnostic::BandDropped {
            band_index: d.band_index,
            low_hz: d.low_hz,
            high_hz: d.high_hz,
            bins: d.bins.clone(),
        }));

        let reassembled = reassemble(&selection, self.mode)?;
        diagnostics.extend(
            reassembled
                .missing
                .iter()
                .map(|bins| Diagnostic::MissingBins { bins: bins.clone() }),
        );

        let mut spectrum = reassembled.spectrum;
        let notch_hits = self.notches.apply(&mut spectrum, &axis)?;
        diagnostics.extend(
            notch_hits
                .iter()
                .filter(|hit| hit.above_nyquist)
                .map(|hit| Diagnostic::NotchAboveNyquist {
                    frequency_hz: hit.frequency_hz,
                    nyquist_hz: axis.nyquist(),
                }),
        );

        let magnitude = spectrum.half_magnitudes();
        let output = StitchOutput {
            axis,
            spectrum,
            magnitude,
            missing: reassembled.missing,
            outcomes: selection.outcomes,
            notch_hits,
            diagnostics,
            noise_threshold,
        };

        info!(
            coverage = output.coverage(),
            diagnostics = output.diagnostics.len(),
            "stitching finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::band_table::Band;

    #[test]
    fn test_from_channels_checks_lengths() {
        let err = Recording::from_channels(1000.0, &[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");

        let recording = Recording::from_channels(1000.0, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(recording.channel_count(), 2);
        assert_eq!(recording.len(), 2);
        assert_eq!(recording.channel(1), Some(vec![3.0, 4.0]));
        assert_eq!(recording.channel(2), None);
    }

    #[test]
    fn test_from_interleaved_splits_frames() {
        let recording = Recording::from_interleaved(8000.0, 2, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]).unwrap();
        assert_eq!(recording.channel(0), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(recording.channel(1), Some(vec![10.0, 20.0, 30.0]));

        assert!(Recording::from_interleaved(8000.0, 2, vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_empty_recording_rejected() {
        assert_eq!(Recording::from_channels(1000.0, &[]).unwrap_err().kind(), "InvalidInput");
        assert_eq!(
            Recording::from_channels(0.0, &[vec![1.0]]).unwrap_err().kind(),
            "InvalidInput"
        );
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let table = BandTable::new(vec![Band::new(0.0, 500.0, 0)]).unwrap();
        let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
        let recording = Recording::from_channels(1000.0, &[vec![1.0; 8]]).unwrap();
        let noise = Signal::new(2000.0, vec![0.1; 8]).unwrap();

        assert_eq!(stitcher.run(&recording, &noise).unwrap_err().kind(), "InvalidInput");
    }

    #[test]
    fn test_long_noise_reference_rejected() {
        let table = BandTable::new(vec![Band::new(0.0, 500.0, 0)]).unwrap();
        let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
        let recording = Recording::from_channels(1000.0, &[vec![1.0; 8]]).unwrap();
        let noise = Signal::new(1000.0, vec![0.1; 9]).unwrap();

        match stitcher.run(&recording, &noise) {
            Err(StitchError::MismatchedTransformSize { expected, actual, .. }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 16);
            }
            other => panic!("Expected MismatchedTransformSize, got {other:?}"),
        }
    }

    #[test]
    fn test_coverage_violation_precedes_transform() {
        let table = BandTable::new(vec![Band::new(0.0, 100.0, 0)]).unwrap();
        let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
        let recording = Recording::from_channels(1000.0, &[vec![1.0; 8]]).unwrap();
        let noise = Signal::new(1000.0, vec![0.1; 8]).unwrap();

        assert_eq!(
            stitcher.run(&recording, &noise).unwrap_err().kind(),
            "BandCoverageViolation"
        );
    }
}
