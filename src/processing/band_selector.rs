//! Band-wise channel selection
//!
//! One ascending pass over the band table. Each band either keeps its nominal
//! channel, falls back to the channel that most recently produced an accepted
//! segment, or is dropped when it is noisy and nothing has been accepted yet.
//! The pass is a left fold over bands with [`SelectorState`] as accumulator,
//! so band `i` only ever sees the outcome of bands `0..i`.

use crate::error::{StitchError, StitchResult};
use crate::processing::band_table::BandTable;
use crate::processing::noise_profile::NoiseGate;
use crate::processing::transform::{FrequencyAxis, HalfSpectrum};
use rustfft::num_complex::Complex64;
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, warn};

/// Slice of one channel's half spectrum covering one band
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub band_index: usize,
    /// Channel the band table assigns to this band
    pub nominal_channel: usize,
    /// Channel the values were actually taken from
    pub channel: usize,
    pub bins: Range<usize>,
    pub values: Vec<Complex64>,
    /// Band was noisy and took the last accepted channel's values
    pub fell_back: bool,
}

/// What happened to one band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BandOutcome {
    Accepted { channel: usize },
    FellBack { nominal: usize, used: usize },
    Dropped { nominal: usize },
}

/// A noisy band with no accepted predecessor to fall back to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedBand {
    pub band_index: usize,
    pub low_hz: f64,
    pub high_hz: f64,
    pub bins: Range<usize>,
}

/// Result of one selection pass, segments in ascending band order
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub fft_size: usize,
    pub segments: Vec<Segment>,
    pub dropped: Vec<DroppedBand>,
    pub outcomes: Vec<BandOutcome>,
}

impl Selection {
    fn empty(fft_size: usize) -> Self {
        Self {
            fft_size,
            segments: Vec::new(),
            dropped: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Number of bins carried by all segments
    pub fn covered_bins(&self) -> usize {
        self.segments.iter().map(|s| s.bins.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.dropped.iter().all(|d| d.bins.is_empty())
    }
}

/// Channel that most recently produced an accepted segment
#[derive(Debug, Clone, Copy)]
struct Accepted<'a> {
    channel: usize,
    spectrum: &'a HalfSpectrum,
}

/// Accumulator threaded through the fold over bands
#[derive(Debug)]
pub struct SelectorState<'a> {
    last_accepted: Option<Accepted<'a>>,
    selection: Selection,
}

impl<'a> SelectorState<'a> {
    fn new(fft_size: usize) -> Self {
        Self {
            last_accepted: None,
            selection: Selection::empty(fft_size),
        }
    }

    /// Channel a noisy band would currently fall back to
    pub fn fallback_channel(&self) -> Option<usize> {
        self.last_accepted.map(|a| a.channel)
    }

    fn step<G: NoiseGate + ?Sized>(
        mut self,
        band_index: usize,
        table: &BandTable,
        bins: Range<usize>,
        spectra: &'a [HalfSpectrum],
        gate: &G,
    ) -> Self {
        let band = &table.bands()[band_index];
        let nominal = band.channel;

        if !gate.is_noisy(bins.clone()) {
            let spectrum = &spectra[nominal];
            debug!(band_index, channel = nominal, bins = ?bins, "band accepted");
            self.push_segment(band_index, nominal, nominal, bins, spectrum, false);
            self.selection.outcomes.push(BandOutcome::Accepted { channel: nominal });
            self.last_accepted = Some(Accepted {
                channel: nominal,
                spectrum,
            });
            return self;
        }

        match self.last_accepted {
            Some(previous) => {
                debug!(
                    band_index,
                    nominal,
                    fallback = previous.channel,
                    bins = ?bins,
                    "band noisy, falling back to last accepted channel"
                );
                self.push_segment(band_index, nominal, previous.channel, bins, previous.spectrum, true);
                self.selection.outcomes.push(BandOutcome::FellBack {
                    nominal,
                    used: previous.channel,
                });
            }
            None => {
                warn!(
                    band_index,
                    low_hz = band.low_hz,
                    high_hz = band.high_hz,
                    bins = ?bins,
                    "band noisy with no accepted predecessor, dropping it"
                );
                self.selection.dropped.push(DroppedBand {
                    band_index,
                    low_hz: band.low_hz,
                    high_hz: band.high_hz,
                    bins,
                });
                self.selection.outcomes.push(BandOutcome::Dropped { nominal });
            }
        }
        self
    }

    fn push_segment(
        &mut self,
        band_index: usize,
        nominal_channel: usize,
        channel: usize,
        bins: Range<usize>,
        spectrum: &HalfSpectrum,
        fell_back: bool,
    ) {
        let values = spectrum.bins()[bins.clone()].to_vec();
        self.selection.segments.push(Segment {
            band_index,
            nominal_channel,
            channel,
            bins,
            values,
            fell_back,
        });
    }

    fn finish(self) -> Selection {
        self.selection
    }
}

/// Pick one segment per band from `spectra` (indexed by channel)
pub fn select_bands<G: NoiseGate + ?Sized>(
    table: &BandTable,
    axis: &FrequencyAxis,
    spectra: &[HalfSpectrum],
    gate: &G,
) -> StitchResult<Selection> {
    let fft_size = axis.fft_size();

    for (channel, spectrum) in spectra.iter().enumerate() {
        if spectrum.fft_size() != fft_size || spectrum.len() != axis.len() {
            return Err(StitchError::MismatchedTransformSize {
                what: format!("channel {channel} spectrum"),
                expected: fft_size,
                actual: spectrum.fft_size(),
            });
        }
    }
    if gate.fft_size() != fft_size || gate.bin_count() != axis.len() {
        return Err(StitchError::MismatchedTransformSize {
            what: "noise reference".to_string(),
            expected: fft_size,
            actual: gate.fft_size(),
        });
    }

    let ranges = table.validate_coverage(axis, spectra.len())?;

    let selection = ranges
        .into_iter()
        .enumerate()
        .fold(SelectorState::new(fft_size), |state, (band_index, bins)| {
            state.step(band_index, table, bins, spectra, gate)
        })
        .finish();

    debug!(
        segments = selection.segments.len(),
        dropped = selection.dropped.len(),
        covered_bins = selection.covered_bins(),
        "band selection finished"
    );
    Ok(selection)
}
