//! Forward spectral transform of real sample sequences
//!
//! All channels of a run and the noise reference are transformed at one shared
//! size `N` so that bin `k` means the same frequency everywhere.

use crate::config::constants::transform::MAX_TRANSFORM_SIZE;
use crate::config::AmplitudeScaling;
use crate::error::{ProcessingStage, StitchError, StitchResult};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Smallest power of two holding `len` samples
pub fn transform_size_for(len: usize) -> StitchResult<usize> {
    if len == 0 {
        return Err(StitchError::invalid_input(
            ProcessingStage::Transform,
            "cannot size a transform for an empty signal",
        ));
    }
    let size = len.next_power_of_two();
    if size > MAX_TRANSFORM_SIZE {
        return Err(StitchError::invalid_input(
            ProcessingStage::Transform,
            format!("{len} samples exceed the maximum transform size {MAX_TRANSFORM_SIZE}"),
        ));
    }
    Ok(size)
}

fn validate_sample_rate(sample_rate: f64) -> StitchResult<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(StitchError::invalid_input(
            ProcessingStage::Transform,
            format!("sample rate must be positive, got {sample_rate}"),
        ));
    }
    Ok(())
}

/// Bin-center frequencies of a half spectrum, `Fs/2 * k/(N/2)` for `k = 0..=N/2`
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAxis {
    fft_size: usize,
    sample_rate: f64,
    frequencies: Vec<f64>,
}

impl FrequencyAxis {
    pub fn new(fft_size: usize, sample_rate: f64) -> StitchResult<Self> {
        validate_sample_rate(sample_rate)?;
        if !fft_size.is_power_of_two() {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("transform size must be a power of two, got {fft_size}"),
            ));
        }

        let half = fft_size / 2;
        let nyquist = sample_rate / 2.0;
        let frequencies = if half == 0 {
            vec![0.0]
        } else {
            (0..=half)
                .map(|k| nyquist * k as f64 / half as f64)
                .collect()
        };

        Ok(Self {
            fft_size,
            sample_rate,
            frequencies,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Number of half-spectrum bins, `N/2 + 1`
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Nearest bin to `frequency_hz`; ties go to the lower index
    pub fn nearest_bin(&self, frequency_hz: f64) -> usize {
        let upper = self.frequencies.partition_point(|&f| f < frequency_hz);
        if upper == 0 {
            return 0;
        }
        if upper >= self.frequencies.len() {
            return self.frequencies.len() - 1;
        }
        let below = frequency_hz - self.frequencies[upper - 1];
        let above = self.frequencies[upper] - frequency_hz;
        if above < below {
            upper
        } else {
            upper - 1
        }
    }
}

/// Bins `0..=N/2` of a real-signal transform
#[derive(Debug, Clone, PartialEq)]
pub struct HalfSpectrum {
    fft_size: usize,
    bins: Vec<Complex64>,
}

impl HalfSpectrum {
    /// Wrap precomputed bins; `bins.len()` must be `fft_size / 2 + 1`
    pub fn from_bins(fft_size: usize, bins: Vec<Complex64>) -> StitchResult<Self> {
        if bins.len() != fft_size / 2 + 1 {
            return Err(StitchError::MismatchedTransformSize {
                what: "half spectrum".to_string(),
                expected: fft_size / 2 + 1,
                actual: bins.len(),
            });
        }
        Ok(Self { fft_size, bins })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bins(&self) -> &[Complex64] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm()).collect()
    }
}

/// Full `N`-bin complex spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    bins: Vec<Complex64>,
}

impl Spectrum {
    pub(crate) fn from_bins(bins: Vec<Complex64>) -> Self {
        Self { bins }
    }

    pub fn fft_size(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[Complex64] {
        &self.bins
    }

    pub(crate) fn bins_mut(&mut self) -> &mut [Complex64] {
        &mut self.bins
    }

    /// Copy of bins `0..=N/2`
    pub fn half(&self) -> HalfSpectrum {
        let n = self.bins.len();
        HalfSpectrum {
            fft_size: n,
            bins: self.bins[..n / 2 + 1].to_vec(),
        }
    }

    /// Magnitudes of bins `0..=N/2`
    pub fn half_magnitudes(&self) -> Vec<f64> {
        let n = self.bins.len();
        self.bins[..n / 2 + 1].iter().map(|c| c.norm()).collect()
    }
}

/// Planned forward FFT at one fixed size, shareable across threads
#[derive(Clone)]
pub struct SpectralTransform {
    fft_size: usize,
    scaling: AmplitudeScaling,
    fft: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("fft_size", &self.fft_size)
            .field("scaling", &self.scaling)
            .finish()
    }
}

impl SpectralTransform {
    pub fn new(fft_size: usize, scaling: AmplitudeScaling) -> StitchResult<Self> {
        if fft_size == 0 || !fft_size.is_power_of_two() || fft_size > MAX_TRANSFORM_SIZE {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("transform size must be a power of two up to {MAX_TRANSFORM_SIZE}, got {fft_size}"),
            ));
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            scaling,
            fft,
        })
    }

    /// Size the transform from the first channel's length
    pub fn for_length(len: usize, scaling: AmplitudeScaling) -> StitchResult<Self> {
        Self::new(transform_size_for(len)?, scaling)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn axis(&self, sample_rate: f64) -> StitchResult<FrequencyAxis> {
        FrequencyAxis::new(self.fft_size, sample_rate)
    }

    /// Full spectrum of `samples`, zero padded to `N`
    pub fn forward(&self, samples: &[f64], sample_rate: f64) -> StitchResult<Spectrum> {
        if samples.is_empty() {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                "signal is empty",
            ));
        }
        validate_sample_rate(sample_rate)?;
        if samples.len() > self.fft_size {
            return Err(StitchError::MismatchedTransformSize {
                what: "signal".to_string(),
                expected: self.fft_size,
                actual: samples.len().next_power_of_two(),
            });
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(StitchError::invalid_input(
                ProcessingStage::Transform,
                format!("sample {pos} is not finite"),
            ));
        }

        let mut buffer: Vec<Complex64> = Vec::with_capacity(self.fft_size);
        buffer.extend(samples.iter().map(|&s| Complex64::new(s, 0.0)));
        buffer.resize(self.fft_size, Complex64::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        if self.scaling == AmplitudeScaling::SignalLength {
            let scale = 1.0 / samples.len() as f64;
            for bin in &mut buffer {
                *bin *= scale;
            }
        }

        Ok(Spectrum::from_bins(buffer))
    }

    /// Half spectrum of `samples`
    pub fn forward_half(&self, samples: &[f64], sample_rate: f64) -> StitchResult<HalfSpectrum> {
        Ok(self.forward(samples, sample_rate)?.half())
    }
}
