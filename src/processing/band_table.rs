//! Ordered band-to-channel assignments and their mapping onto frequency bins
//!
//! Bands are half-open `[low, high)`; the last band is closed so that the
//! Nyquist bin belongs to it. Consecutive bands must share their boundary
//! exactly, which makes every bin land in exactly one band.

use crate::error::{StitchError, StitchResult};
use crate::processing::transform::FrequencyAxis;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One frequency range assigned to a source channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low_hz: f64,
    pub high_hz: f64,
    pub channel: usize,
}

impl Band {
    pub fn new(low_hz: f64, high_hz: f64, channel: usize) -> Self {
        Self {
            low_hz,
            high_hz,
            channel,
        }
    }

    pub fn width_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// Immutable, structurally validated list of bands in ascending frequency order
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    /// Validate ordering, contiguity and the zero-frequency start
    pub fn new(bands: Vec<Band>) -> StitchResult<Self> {
        if bands.is_empty() {
            return Err(StitchError::invalid_config("bands", "band table is empty"));
        }

        for (i, band) in bands.iter().enumerate() {
            if !band.low_hz.is_finite() || !band.high_hz.is_finite() {
                return Err(StitchError::coverage(i, "band edges must be finite"));
            }
            if band.low_hz >= band.high_hz {
                return Err(StitchError::coverage(
                    i,
                    format!("low edge {} Hz is not below high edge {} Hz", band.low_hz, band.high_hz),
                ));
            }
        }

        if bands[0].low_hz != 0.0 {
            return Err(StitchError::coverage(
                0,
                format!("first band starts at {} Hz instead of 0 Hz", bands[0].low_hz),
            ));
        }

        for (i, pair) in bands.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.low_hz < prev.high_hz {
                return Err(StitchError::coverage(
                    i + 1,
                    format!(
                        "overlaps previous band: starts at {} Hz, previous ends at {} Hz",
                        next.low_hz, prev.high_hz
                    ),
                ));
            }
            if next.low_hz > prev.high_hz {
                return Err(StitchError::coverage(
                    i + 1,
                    format!("gap between {} Hz and {} Hz", prev.high_hz, next.low_hz),
                ));
            }
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Highest channel index referenced by any band
    pub fn max_channel(&self) -> usize {
        self.bands.iter().map(|b| b.channel).max().unwrap_or(0)
    }

    /// Bins of `axis` whose frequency falls inside band `index`
    pub fn bin_range(&self, index: usize, axis: &FrequencyAxis) -> Range<usize> {
        let band = &self.bands[index];
        let frequencies = axis.frequencies();
        let start = frequencies.partition_point(|&f| f < band.low_hz);
        let end = if index + 1 == self.bands.len() {
            frequencies.partition_point(|&f| f <= band.high_hz)
        } else {
            frequencies.partition_point(|&f| f < band.high_hz)
        };
        start..end.max(start)
    }

    /// Check the table against a concrete axis and recording, returning the
    /// bin range of every band
    pub fn validate_coverage(
        &self,
        axis: &FrequencyAxis,
        channel_count: usize,
    ) -> StitchResult<Vec<Range<usize>>> {
        if let Some((i, band)) = self
            .bands
            .iter()
            .enumerate()
            .find(|(_, b)| b.channel >= channel_count)
        {
            return Err(StitchError::invalid_config(
                format!("bands[{i}].channel"),
                format!("channel {} does not exist, recording has {channel_count}", band.channel),
            ));
        }

        let last = self.bands.len() - 1;
        if self.bands[last].high_hz < axis.nyquist() {
            return Err(StitchError::coverage(
                last,
                format!(
                    "table ends at {} Hz, below Nyquist {} Hz",
                    self.bands[last].high_hz,
                    axis.nyquist()
                ),
            ));
        }

        let ranges: Vec<Range<usize>> = (0..self.bands.len())
            .map(|i| self.bin_range(i, axis))
            .collect();

        let mut cursor = 0;
        for (i, range) in ranges.iter().enumerate() {
            if range.start != cursor {
                return Err(StitchError::coverage(
                    i,
                    format!("bins {}..{} are not assigned to any band", cursor, range.start),
                ));
            }
            cursor = range.end;
        }
        if cursor != axis.len() {
            return Err(StitchError::coverage(
                last,
                format!("bins {}..{} are not assigned to any band", cursor, axis.len()),
            ));
        }

        Ok(ranges)
    }
}
