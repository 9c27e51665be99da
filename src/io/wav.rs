//! WAV recordings

use crate::error::{ProcessingStage, StitchError, StitchResult};
use crate::processing::pipeline::Recording;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::debug;

/// Read every channel of a WAV file.
///
/// Integer samples keep their raw value (a 16-bit sample of 1000 reads as
/// 1000.0), float samples are taken as stored.
pub fn read_wav<P: AsRef<Path>>(path: P) -> StitchResult<Recording> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => reader
            .into_samples::<i32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
    };

    if interleaved.is_empty() {
        return Err(StitchError::invalid_input(
            ProcessingStage::FileInput,
            format!("'{}' contains no samples", path.display()),
        ));
    }

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "wav loaded"
    );

    Recording::from_interleaved(f64::from(spec.sample_rate), usize::from(spec.channels), interleaved)
}

/// Write a recording as 16-bit integer PCM, rounding and saturating each sample
pub fn write_wav<P: AsRef<Path>>(path: P, recording: &Recording) -> StitchResult<()> {
    let sample_rate = recording.sample_rate();
    if sample_rate.fract() != 0.0 || sample_rate > f64::from(u32::MAX) {
        return Err(StitchError::invalid_input(
            ProcessingStage::FileInput,
            format!("sample rate {sample_rate} cannot be stored in a WAV header"),
        ));
    }
    let channels = u16::try_from(recording.channel_count()).map_err(|_| {
        StitchError::invalid_input(
            ProcessingStage::FileInput,
            format!("{} channels do not fit a WAV header", recording.channel_count()),
        )
    })?;

    let spec = WavSpec {
        channels,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in recording.samples().rows() {
        for &sample in frame {
            let clamped = sample.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX));
            writer.write_sample(clamped as i16)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
