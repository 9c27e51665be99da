// tests/stitch_pipeline.rs
//! End-to-end stitching tests
//!
//! All cases use an 8-point transform at 1 kHz, so the half spectrum has
//! bins at 0, 125, 250, 375 and 500 Hz.

use spectrum_stitch::config::{SelectionMode, StitchConfig};
use spectrum_stitch::processing::{
    Band, BandOutcome, BandTable, Diagnostic, NoiseProfile, NotchFilter, Recording, Signal,
    SpectralStitcher, SpectralTransform, TargetNotch,
};
use spectrum_stitch::config::AmplitudeScaling;
use spectrum_stitch::StitchError;
use std::f64::consts::PI;

const FS: f64 = 1000.0;

fn tone(frequency_hz: f64) -> Vec<f64> {
    (0..8).map(|t| (2.0 * PI * frequency_hz * t as f64 / FS).cos()).collect()
}

fn two_channel_recording() -> Recording {
    Recording::from_channels(
        FS,
        &[
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            vec![8.0, -7.0, 6.0, -5.0, 4.0, -3.0, 2.0, -1.0],
        ],
    )
    .unwrap()
}

fn three_channel_recording() -> Recording {
    Recording::from_channels(
        FS,
        &[
            vec![1.0, 0.5, -0.25, 2.0, 0.0, -1.0, 3.0, 0.75],
            vec![0.0, 4.0, 0.0, -4.0, 0.0, 4.0, 0.0, -4.0],
            vec![2.0, 2.0, -2.0, -2.0, 2.0, 2.0, -2.0, -2.0],
        ],
    )
    .unwrap()
}

fn two_band_table() -> BandTable {
    BandTable::new(vec![Band::new(0.0, 250.0, 0), Band::new(250.0, 500.0, 1)]).unwrap()
}

fn three_band_table() -> BandTable {
    BandTable::new(vec![
        Band::new(0.0, 200.0, 0),
        Band::new(200.0, 350.0, 1),
        Band::new(350.0, 500.0, 2),
    ])
    .unwrap()
}

fn channel_half(recording: &Recording, channel: usize) -> Vec<rustfft::num_complex::Complex64> {
    let transform = SpectralTransform::new(8, AmplitudeScaling::SignalLength).unwrap();
    transform
        .forward_half(&recording.channel(channel).unwrap(), FS)
        .unwrap()
        .bins()
        .to_vec()
}

#[test]
fn test_noisy_first_band_fails_strict_mode() {
    let stitcher = SpectralStitcher::new(two_band_table(), NotchFilter::default(), SelectionMode::Strict);
    // 125 Hz tone flags bin 1, which belongs to band 0
    let noise = Signal::new(FS, tone(125.0)).unwrap();

    match stitcher.run(&two_channel_recording(), &noise) {
        Err(StitchError::IncompleteSpectrum {
            expected,
            covered,
            missing,
            duplicated,
        }) => {
            assert_eq!(expected, 5);
            assert_eq!(covered, 3);
            assert_eq!(missing, vec![0..2]);
            assert!(duplicated.is_empty());
        }
        other => panic!("Expected IncompleteSpectrum, got {other:?}"),
    }
}

#[test]
fn test_noisy_first_band_lenient_mode_reports_gap() {
    let recording = two_channel_recording();
    let stitcher = SpectralStitcher::new(two_band_table(), NotchFilter::default(), SelectionMode::Lenient);
    let noise = Signal::new(FS, tone(125.0)).unwrap();

    let output = stitcher.run(&recording, &noise).unwrap();

    assert_eq!(output.missing, vec![0..2]);
    assert!((output.coverage() - 3.0 / 5.0).abs() < 1e-12);
    assert_eq!(output.magnitude[0], 0.0);
    assert_eq!(output.magnitude[1], 0.0);

    let ch1 = channel_half(&recording, 1);
    for bin in 2..5 {
        assert_eq!(output.magnitude[bin], ch1[bin].norm());
    }

    assert_eq!(
        output.outcomes,
        vec![BandOutcome::Dropped { nominal: 0 }, BandOutcome::Accepted { channel: 1 }]
    );
    assert!(output
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::BandDropped { band_index: 0, .. })));
    assert!(output
        .diagnostics
        .contains(&Diagnostic::MissingBins { bins: 0..2 }));

    let points = output.covered_points();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].0, 250.0);
}

#[test]
fn test_clean_reference_takes_nominal_channels() {
    let recording = two_channel_recording();
    let stitcher = SpectralStitcher::new(two_band_table(), NotchFilter::default(), SelectionMode::Strict);
    let noise = Signal::new(FS, vec![0.0; 8]).unwrap();

    let output = stitcher.run(&recording, &noise).unwrap();

    assert_eq!(output.coverage(), 1.0);
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.noise_threshold, Some(0.0));

    let ch0 = channel_half(&recording, 0);
    let ch1 = channel_half(&recording, 1);
    let bins = output.spectrum.bins();
    assert_eq!(bins[0], ch0[0]);
    assert_eq!(bins[1], ch0[1]);
    assert_eq!(bins[2], ch1[2]);
    assert_eq!(bins[4], ch1[4]);
}

#[test]
fn test_noisy_middle_band_falls_back_bit_for_bit() {
    let recording = three_channel_recording();
    let stitcher = SpectralStitcher::new(three_band_table(), NotchFilter::default(), SelectionMode::Strict);
    // 250 Hz tone flags bin 2, the only bin of band 1
    let noise = Signal::new(FS, tone(250.0)).unwrap();

    let output = stitcher.run(&recording, &noise).unwrap();

    let ch0 = channel_half(&recording, 0);
    let ch2 = channel_half(&recording, 2);
    let bins = output.spectrum.bins();
    assert_eq!(bins[2], ch0[2]);
    assert_eq!(bins[6], ch0[2].conj());
    assert_eq!(bins[3], ch2[3]);
    assert_eq!(
        output.outcomes,
        vec![
            BandOutcome::Accepted { channel: 0 },
            BandOutcome::FellBack { nominal: 1, used: 0 },
            BandOutcome::Accepted { channel: 2 },
        ]
    );
}

#[test]
fn test_synthetic_gate_drives_selection() {
    let recording = three_channel_recording();
    let stitcher = SpectralStitcher::new(three_band_table(), NotchFilter::default(), SelectionMode::Lenient);
    let gate = NoiseProfile::from_parts(8, vec![0.0, 0.0, 0.0, 5.0, 0.0], 1.0).unwrap();

    let output = stitcher.run_with_gate(&recording, &gate).unwrap();

    // band 2 falls back to channel 1, the last accepted one
    let ch1 = channel_half(&recording, 1);
    assert_eq!(output.spectrum.bins()[3], ch1[3]);
    assert_eq!(output.spectrum.bins()[4], ch1[4]);
    assert_eq!(output.noise_threshold, None);
}

#[test]
fn test_gate_size_mismatch_rejected() {
    let stitcher = SpectralStitcher::new(three_band_table(), NotchFilter::default(), SelectionMode::Strict);
    let gate = NoiseProfile::from_parts(16, vec![0.0; 9], 1.0).unwrap();

    let err = stitcher.run_with_gate(&three_channel_recording(), &gate).unwrap_err();
    assert_eq!(err.kind(), "MismatchedTransformSize");
}

#[test]
fn test_notch_divides_bin_and_mirror() {
    let recording = two_channel_recording();
    let clean = Signal::new(FS, vec![0.0; 8]).unwrap();
    let plain = SpectralStitcher::new(two_band_table(), NotchFilter::default(), SelectionMode::Strict);
    let notched = SpectralStitcher::new(
        two_band_table(),
        NotchFilter::new(vec![TargetNotch::new(250.0, 2.0).unwrap()]),
        SelectionMode::Strict,
    );

    let before = plain.run(&recording, &clean).unwrap();
    let after = notched.run(&recording, &clean).unwrap();

    assert_eq!(after.spectrum.bins()[2], before.spectrum.bins()[2] / 2.0);
    assert_eq!(after.spectrum.bins()[6], before.spectrum.bins()[6] / 2.0);
    assert_eq!(after.spectrum.bins()[1], before.spectrum.bins()[1]);
    assert_eq!(after.notch_hits.len(), 1);
    assert_eq!(after.notch_hits[0].bin, 2);
}

#[test]
fn test_repeated_notch_divides_by_square() {
    let recording = two_channel_recording();
    let clean = Signal::new(FS, vec![0.0; 8]).unwrap();
    let stitcher = SpectralStitcher::new(two_band_table(), NotchFilter::default(), SelectionMode::Strict);
    let output = stitcher.run(&recording, &clean).unwrap();

    let filter = NotchFilter::new(vec![TargetNotch::new(375.0, 2.0).unwrap()]);
    let mut spectrum = output.spectrum.clone();
    filter.apply(&mut spectrum, &output.axis).unwrap();
    filter.apply(&mut spectrum, &output.axis).unwrap();

    assert_eq!(spectrum.bins()[3], output.spectrum.bins()[3] / 4.0);
    assert_eq!(spectrum.bins()[5], output.spectrum.bins()[5] / 4.0);
}

#[test]
fn test_notch_above_nyquist_is_diagnosed() {
    let stitcher = SpectralStitcher::new(
        two_band_table(),
        NotchFilter::new(vec![TargetNotch::new(1552.45, 10.0).unwrap()]),
        SelectionMode::Strict,
    );
    let clean = Signal::new(FS, vec![0.0; 8]).unwrap();

    let output = stitcher.run(&two_channel_recording(), &clean).unwrap();

    assert_eq!(output.notch_hits[0].bin, 4);
    assert!(output.diagnostics.contains(&Diagnostic::NotchAboveNyquist {
        frequency_hz: 1552.45,
        nyquist_hz: 500.0,
    }));
}

#[test]
fn test_empty_band_is_diagnosed_not_fatal() {
    let table = BandTable::new(vec![
        Band::new(0.0, 240.0, 0),
        Band::new(240.0, 245.0, 1),
        Band::new(245.0, 500.0, 1),
    ])
    .unwrap();
    let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
    let clean = Signal::new(FS, vec![0.0; 8]).unwrap();

    let output = stitcher.run(&two_channel_recording(), &clean).unwrap();

    assert_eq!(output.coverage(), 1.0);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::EmptyBand { band_index: 1, .. })));
}

#[test]
fn test_stitcher_from_config() {
    let config = StitchConfig::from_toml_str(
        r#"
        [selection]
        noise_multiplier = 1.5
        mode = "lenient"

        [[bands]]
        low_hz = 0.0
        high_hz = 250.0
        channel = 0

        [[bands]]
        low_hz = 250.0
        high_hz = 500.0
        channel = 1

        [[notches]]
        frequency_hz = 375.0
        divisor = 4.0
        "#,
    )
    .unwrap();

    let stitcher = SpectralStitcher::from_config(&config).unwrap();
    assert_eq!(stitcher.mode(), SelectionMode::Lenient);
    assert_eq!(stitcher.band_table().len(), 2);

    let noise = Signal::new(FS, tone(125.0)).unwrap();
    let output = stitcher.run(&two_channel_recording(), &noise).unwrap();
    assert_eq!(output.missing, vec![0..2]);

    let json = output.report_json().unwrap();
    assert!(json.contains("\"band_dropped\""));
    assert!(json.contains("\"missing_bins\""));
    assert!(json.contains("\"fft_size\": 8"));
}

#[test]
fn test_invalid_config_fails_before_running() {
    let zero_divisor = StitchConfig::from_toml_str(
        r#"
        [[bands]]
        low_hz = 0.0
        high_hz = 500.0
        channel = 0

        [[notches]]
        frequency_hz = 100.0
        divisor = 0.0
        "#,
    )
    .unwrap();
    match SpectralStitcher::from_config(&zero_divisor) {
        Err(StitchError::InvalidConfig { field, .. }) => assert_eq!(field, "notches[0].divisor"),
        other => panic!("Expected InvalidConfig, got {other:?}"),
    }

    let no_bands = StitchConfig::default();
    assert_eq!(
        SpectralStitcher::from_config(&no_bands).unwrap_err().kind(),
        "InvalidConfig"
    );
}

#[test]
fn test_unknown_channel_rejected() {
    let table = BandTable::new(vec![Band::new(0.0, 250.0, 0), Band::new(250.0, 500.0, 5)]).unwrap();
    let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
    let clean = Signal::new(FS, vec![0.0; 8]).unwrap();

    let err = stitcher.run(&two_channel_recording(), &clean).unwrap_err();
    assert_eq!(err.kind(), "InvalidConfig");
}

#[test]
fn test_short_recording_is_zero_padded() {
    let recording = Recording::from_channels(FS, &[vec![1.0; 5]]).unwrap();
    let table = BandTable::new(vec![Band::new(0.0, 500.0, 0)]).unwrap();
    let stitcher = SpectralStitcher::new(table, NotchFilter::default(), SelectionMode::Strict);
    let clean = Signal::new(FS, vec![0.0; 3]).unwrap();

    let output = stitcher.run(&recording, &clean).unwrap();
    assert_eq!(output.axis.fft_size(), 8);
    // DC of five ones scaled by 1/5
    assert!((output.magnitude[0] - 1.0).abs() < 1e-12);
}
