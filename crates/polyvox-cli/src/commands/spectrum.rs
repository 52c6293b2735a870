//! Offline spectrum probe.

use clap::Args;
use polyvox_analysis::spectrum::find_peaks;

use super::common::{OfflineRender, ScoreArgs, SynthOverrides, load_config};

#[derive(Args)]
pub struct SpectrumArgs {
    #[command(flatten)]
    score: ScoreArgs,

    #[command(flatten)]
    synth: SynthOverrides,

    /// Time in seconds of the analyzed block
    #[arg(long, default_value = "0.5")]
    at: f64,

    /// Maximum number of peaks to report
    #[arg(long, default_value = "5")]
    peaks: usize,

    /// Minimum magnitude for a peak
    #[arg(long, default_value = "0.01")]
    threshold: f32,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: SpectrumArgs, config_name: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_name)?;
    args.synth.apply(&mut config);
    config.spectrum.enabled = true;
    let score = args.score.load()?;
    let settings = config.to_settings()?;

    if !(args.at.is_finite() && args.at >= 0.0) {
        anyhow::bail!("--at must be >= 0, got {}", args.at);
    }

    let sample_rate = settings.sample_rate;
    let fft_size = settings.block_size;

    let mut offline = OfflineRender::new(settings, &score)?;
    let mut block = vec![0.0_f32; offline.block_len()];
    // Render up to and including the block that contains `at`
    let mut block_time = offline.time();
    offline.render_next(&mut block);
    while offline.time() <= args.at {
        block_time = offline.time();
        offline.render_next(&mut block);
    }

    let mut magnitudes = Vec::new();
    let sequence = offline
        .engine()
        .visualization()
        .copy_spectrum(&mut magnitudes);
    if sequence == 0 {
        anyhow::bail!("No spectrum was produced (block size {fft_size} must be a power of two)");
    }

    let peaks = find_peaks(
        &magnitudes,
        sample_rate as f32,
        fft_size,
        args.threshold,
        args.peaks,
    );
    let bin_hz = sample_rate as f32 / fft_size as f32;

    if args.json {
        let peaks: Vec<_> = peaks
            .iter()
            .map(|&(frequency_hz, magnitude)| {
                serde_json::json!({
                    "frequency_hz": frequency_hz,
                    "magnitude": magnitude,
                })
            })
            .collect();
        let output = serde_json::json!({
            "time": block_time,
            "sample_rate": sample_rate,
            "fft_size": fft_size,
            "bin_hz": bin_hz,
            "bins": magnitudes.len(),
            "peaks": peaks,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Spectrum at {block_time:.3}s");
    println!("====================\n");
    println!("  FFT size:   {fft_size} ({bin_hz:.2} Hz per bin)");
    println!("  Bins shown: {}", magnitudes.len());
    println!();

    if peaks.is_empty() {
        println!("No peaks above {}", args.threshold);
        return Ok(());
    }

    println!("  {:>10}  {:>9}", "Frequency", "Magnitude");
    for (frequency, magnitude) in &peaks {
        println!("  {:>7.1} Hz  {:>9.4}", frequency, magnitude);
    }
    Ok(())
}
