//! Fixed corrective notches at known problem frequencies
//!
//! Each notch divides the single bin nearest its frequency. The mirrored bin
//! `N-k` is divided too so the full spectrum stays conjugate-symmetric.

use crate::error::{StitchError, StitchResult};
use crate::processing::transform::{FrequencyAxis, Spectrum};
use serde::Serialize;
use tracing::{debug, warn};

/// Attenuate the bin nearest `frequency_hz` by `divisor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetNotch {
    frequency_hz: f64,
    divisor: f64,
}

impl TargetNotch {
    pub fn new(frequency_hz: f64, divisor: f64) -> StitchResult<Self> {
        if !frequency_hz.is_finite() || frequency_hz < 0.0 {
            return Err(StitchError::invalid_config(
                "frequency_hz",
                format!("must be finite and non-negative, got {frequency_hz}"),
            ));
        }
        if !divisor.is_finite() || divisor == 0.0 {
            return Err(StitchError::invalid_config(
                "divisor",
                format!("must be finite and non-zero, got {divisor}"),
            ));
        }
        Ok(Self {
            frequency_hz,
            divisor,
        })
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn divisor(&self) -> f64 {
        self.divisor
    }
}

/// Where one notch landed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NotchHit {
    pub frequency_hz: f64,
    pub bin: usize,
    pub bin_frequency_hz: f64,
    pub divisor: f64,
    /// Target lies above Nyquist and was snapped to the last bin
    pub above_nyquist: bool,
}

/// Ordered list of target notches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotchFilter {
    notches: Vec<TargetNotch>,
}

impl NotchFilter {
    pub fn new(notches: Vec<TargetNotch>) -> Self {
        Self { notches }
    }

    pub fn notches(&self) -> &[TargetNotch] {
        &self.notches
    }

    pub fn is_empty(&self) -> bool {
        self.notches.is_empty()
    }

    /// Divide every target bin in place. Two notches hitting the same bin
    /// multiply their divisors.
    pub fn apply(&self, spectrum: &mut Spectrum, axis: &FrequencyAxis) -> StitchResult<Vec<NotchHit>> {
        let n = spectrum.fft_size();
        if n != axis.fft_size() {
            return Err(StitchError::MismatchedTransformSize {
                what: "notched spectrum".to_string(),
                expected: axis.fft_size(),
                actual: n,
            });
        }

        let bins = spectrum.bins_mut();
        let hits = self
            .notches
            .iter()
            .map(|notch| {
                let k = axis.nearest_bin(notch.frequency_hz);
                bins[k] /= notch.divisor;
                if k > 0 && k < n / 2 {
                    bins[n - k] /= notch.divisor;
                }

                let hit = NotchHit {
                    frequency_hz: notch.frequency_hz,
                    bin: k,
                    bin_frequency_hz: axis.frequencies()[k],
                    divisor: notch.divisor,
                    above_nyquist: notch.frequency_hz > axis.nyquist(),
                };
                if hit.above_nyquist {
                    warn!(
                        frequency_hz = notch.frequency_hz,
                        nyquist = axis.nyquist(),
                        "notch target above Nyquist, applied to the last bin"
                    );
                } else {
                    debug!(frequency_hz = notch.frequency_hz, bin = k, divisor = notch.divisor, "notch applied");
                }
                hit
            })
            .collect();

        Ok(hits)
    }
}
