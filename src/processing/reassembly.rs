//! Half-spectrum reassembly and Hermitian mirroring
//!
//! Segments are placed by their bin indices, never by append order. Before
//! anything is written the bin ranges are sorted and walked once to find gaps
//! and duplicates.

use crate::config::SelectionMode;
use crate::error::{ProcessingStage, StitchError, StitchResult};
use crate::processing::band_selector::{Segment, Selection};
use crate::processing::transform::Spectrum;
use rustfft::num_complex::Complex64;
use std::ops::Range;
use tracing::{debug, warn};

/// Full spectrum plus the bins no segment supplied
#[derive(Debug, Clone, PartialEq)]
pub struct Reassembled {
    pub spectrum: Spectrum,
    /// Always empty in strict mode
    pub missing: Vec<Range<usize>>,
}

impl Reassembled {
    /// Fraction of half-spectrum bins backed by a segment
    pub fn coverage(&self) -> f64 {
        let total = self.spectrum.fft_size() / 2 + 1;
        let missing: usize = self.missing.iter().map(|r| r.len()).sum();
        (total - missing) as f64 / total as f64
    }

    pub fn is_bin_covered(&self, bin: usize) -> bool {
        !self.missing.iter().any(|r| r.contains(&bin))
    }
}

/// Gaps and overlaps of a set of segments over `0..half_len`
#[derive(Debug, Default, PartialEq)]
struct CoverageReport {
    missing: Vec<Range<usize>>,
    duplicated: Vec<Range<usize>>,
}

fn coverage_report(segments: &[Segment], half_len: usize) -> CoverageReport {
    let mut ordered: Vec<&Range<usize>> = segments
        .iter()
        .map(|s| &s.bins)
        .filter(|bins| !bins.is_empty())
        .collect();
    ordered.sort_by_key(|bins| (bins.start, bins.end));

    let mut report = CoverageReport::default();
    let mut cursor = 0;
    for bins in ordered {
        if bins.start > cursor {
            report.missing.push(cursor..bins.start);
        } else if bins.start < cursor {
            report.duplicated.push(bins.start..cursor.min(bins.end));
        }
        cursor = cursor.max(bins.end);
    }
    if cursor < half_len {
        report.missing.push(cursor..half_len);
    }
    report
}

/// Mirror bins `0..=N/2` into a conjugate-symmetric `N`-bin spectrum
pub fn mirror_hermitian(half: &[Complex64], fft_size: usize) -> StitchResult<Vec<Complex64>> {
    let half_len = fft_size / 2 + 1;
    if fft_size == 0 || half.len() != half_len {
        return Err(StitchError::MismatchedTransformSize {
            what: "half spectrum".to_string(),
            expected: half_len,
            actual: half.len(),
        });
    }

    let mut full = vec![Complex64::new(0.0, 0.0); fft_size];
    let upper = (fft_size / 2).min(fft_size - 1);
    full[..=upper].copy_from_slice(&half[..=upper]);
    for k in 1..fft_size / 2 {
        full[fft_size - k] = half[k].conj();
    }
    Ok(full)
}

/// Concatenate the selected segments by bin index and mirror the result
pub fn reassemble(selection: &Selection, mode: SelectionMode) -> StitchResult<Reassembled> {
    let fft_size = selection.fft_size;
    let half_len = fft_size / 2 + 1;

    for segment in &selection.segments {
        if segment.bins.end > half_len {
            return Err(StitchError::MismatchedTransformSize {
                what: format!("band {} segment", segment.band_index),
                expected: half_len,
                actual: segment.bins.end,
            });
        }
        if segment.values.len() != segment.bins.len() {
            return Err(StitchError::invalid_input(
                ProcessingStage::Reassembly,
                format!(
                    "band {} segment carries {} values for {} bins",
                    segment.band_index,
                    segment.values.len(),
                    segment.bins.len()
                ),
            ));
        }
    }

    let report = coverage_report(&selection.segments, half_len);
    let missing_count: usize = report.missing.iter().map(|r| r.len()).sum();

    if !report.duplicated.is_empty() || (mode == SelectionMode::Strict && !report.missing.is_empty()) {
        return Err(StitchError::IncompleteSpectrum {
            expected: half_len,
            covered: half_len - missing_count,
            missing: report.missing,
            duplicated: report.duplicated,
        });
    }

    for gap in &report.missing {
        warn!(bins = ?gap, "no segment covers these bins, leaving them at zero");
    }

    let mut half = vec![Complex64::new(0.0, 0.0); half_len];
    for segment in &selection.segments {
        half[segment.bins.clone()].copy_from_slice(&segment.values);
    }

    let spectrum = Spectrum::from_bins(mirror_hermitian(&half, fft_size)?);
    debug!(fft_size, missing_bins = missing_count, "spectrum reassembled");

    Ok(Reassembled {
        spectrum,
        missing: report.missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(band_index: usize, bins: Range<usize>, value: f64) -> Segment {
        let values = bins
            .clone()
            .map(|k| Complex64::new(value + k as f64, k as f64))
            .collect();
        Segment {
            band_index,
            nominal_channel: 0,
            channel: 0,
            bins,
            values,
            fell_back: false,
        }
    }

    fn selection(fft_size: usize, segments: Vec<Segment>) -> Selection {
        Selection {
            fft_size,
            segments,
            dropped: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn test_mirror_is_conjugate_symmetric() {
        let half: Vec<Complex64> = (0..5).map(|k| Complex64::new(k as f64, 1.0 + k as f64)).collect();
        let full = mirror_hermitian(&half, 8).unwrap();

        assert_eq!(full.len(), 8);
        assert_eq!(&full[..5], half.as_slice());
        for k in 1..4 {
            assert_eq!(full[8 - k], full[k].conj());
        }
    }

    #[test]
    fn test_mirror_tiny_sizes() {
        let one = mirror_hermitian(&[Complex64::new(2.0, 0.0)], 1).unwrap();
        assert_eq!(one, vec![Complex64::new(2.0, 0.0)]);

        let two = mirror_hermitian(&[Complex64::new(1.0, 0.0), Complex64::new(3.0, 0.0)], 2).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[1], Complex64::new(3.0, 0.0));
    }

    #[test]
    fn test_reassemble_places_by_bin_index() {
        // out of order on purpose
        let sel = selection(8, vec![segment(1, 2..5, 10.0), segment(0, 0..2, 0.0)]);
        let out = reassemble(&sel, SelectionMode::Strict).unwrap();

        let bins = out.spectrum.bins();
        assert_eq!(bins[0], Complex64::new(0.0, 0.0));
        assert_eq!(bins[1], Complex64::new(1.0, 1.0));
        assert_eq!(bins[2], Complex64::new(12.0, 2.0));
        assert_eq!(bins[4], Complex64::new(14.0, 4.0));
        assert_eq!(bins[7], bins[1].conj());
        assert!(out.missing.is_empty());
        assert_eq!(out.coverage(), 1.0);
    }

    #[test]
    fn test_strict_mode_rejects_gap() {
        let sel = selection(8, vec![segment(1, 2..5, 10.0)]);
        match reassemble(&sel, SelectionMode::Strict) {
            Err(StitchError::IncompleteSpectrum { expected, covered, missing, .. }) => {
                assert_eq!(expected, 5);
                assert_eq!(covered, 3);
                assert_eq!(missing, vec![0..2]);
            }
            other => panic!("Expected IncompleteSpectrum, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_mode_zeroes_gap() {
        let sel = selection(8, vec![segment(1, 2..5, 10.0)]);
        let out = reassemble(&sel, SelectionMode::Lenient).unwrap();

        assert_eq!(out.missing, vec![0..2]);
        assert!((out.coverage() - 0.6).abs() < 1e-12);
        assert_eq!(out.spectrum.bins()[0], Complex64::new(0.0, 0.0));
        assert_eq!(out.spectrum.bins()[1], Complex64::new(0.0, 0.0));
        assert_eq!(out.spectrum.bins()[7], Complex64::new(0.0, 0.0));
        assert!(!out.is_bin_covered(1));
        assert!(out.is_bin_covered(2));
    }

    #[test]
    fn test_duplicate_bins_fail_in_every_mode() {
        let sel = selection(8, vec![segment(0, 0..3, 0.0), segment(1, 2..5, 10.0)]);
        for mode in [SelectionMode::Strict, SelectionMode::Lenient] {
            match reassemble(&sel, mode) {
                Err(StitchError::IncompleteSpectrum { duplicated, .. }) => {
                    assert_eq!(duplicated, vec![2..3]);
                }
                other => panic!("Expected IncompleteSpectrum, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_segment_past_nyquist_rejected() {
        let sel = selection(8, vec![segment(0, 0..6, 0.0)]);
        assert_eq!(
            reassemble(&sel, SelectionMode::Lenient).unwrap_err().kind(),
            "MismatchedTransformSize"
        );
    }

    #[test]
    fn test_coverage_report_internal_gap() {
        let segments = vec![segment(0, 0..2, 0.0), segment(2, 4..5, 0.0)];
        let report = coverage_report(&segments, 5);
        assert_eq!(report.missing, vec![2..4]);
        assert!(report.duplicated.is_empty());
    }
}
