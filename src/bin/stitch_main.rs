//! Command-line driver: stitch a WAV recording against a noise reference

use anyhow::{bail, Context, Result};
use spectrum_stitch::config::ConfigLoader;
use spectrum_stitch::io::{read_wav, write_spectrum};
use spectrum_stitch::processing::{Diagnostic, SpectralStitcher};
use std::path::PathBuf;
use tracing::{info, warn};

const USAGE: &str = "usage: spectrum-stitch <config.toml> <recording.wav> <noise.wav> [output.tsv]";
const DEFAULT_OUTPUT: &str = "stitched_spectrum.tsv";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 || args.len() > 4 {
        bail!("{USAGE}");
    }
    let config_path = PathBuf::from(&args[0]);
    let recording_path = PathBuf::from(&args[1]);
    let noise_path = PathBuf::from(&args[2]);
    let output_path = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let config = ConfigLoader::with_paths(vec![config_path.clone()])
        .load()
        .with_context(|| format!("failed to load configuration '{}'", config_path.display()))?;
    let stitcher = SpectralStitcher::from_config(&config).context("invalid stitcher configuration")?;

    let recording = read_wav(&recording_path)
        .with_context(|| format!("failed to read recording '{}'", recording_path.display()))?;
    let noise = read_wav(&noise_path)
        .with_context(|| format!("failed to read noise reference '{}'", noise_path.display()))?
        .signal(0)
        .context("noise reference has no channels")?;

    let output = stitcher
        .run(&recording, &noise)
        .context("spectrum stitching failed")?;

    for diagnostic in &output.diagnostics {
        match diagnostic {
            Diagnostic::BandDropped { band_index, low_hz, high_hz, .. } => {
                warn!(band_index, low_hz, high_hz, "band dropped")
            }
            Diagnostic::MissingBins { bins } => warn!(start = bins.start, end = bins.end, "bins missing"),
            Diagnostic::EmptyBand { band_index, .. } => warn!(band_index, "band has no bins"),
            Diagnostic::NotchAboveNyquist { frequency_hz, .. } => {
                warn!(frequency_hz, "notch target above Nyquist")
            }
        }
    }

    write_spectrum(&output_path, &output.covered_points())
        .with_context(|| format!("failed to write '{}'", output_path.display()))?;
    info!(
        path = %output_path.display(),
        coverage = output.coverage(),
        "stitched spectrum written"
    );

    println!("{}", output.report_json()?);
    Ok(())
}
