//! Offline render to WAV.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use polyvox_io::write_wav_stereo;

use super::common::{OfflineRender, ScoreArgs, SynthOverrides, load_config, peak};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    output: PathBuf,

    #[command(flatten)]
    score: ScoreArgs,

    #[command(flatten)]
    synth: SynthOverrides,

    /// Seconds rendered after the last note-off (defaults to the release time)
    #[arg(long)]
    tail: Option<f64>,

    /// Sample rate override
    #[arg(long)]
    sample_rate: Option<u32>,
}

pub fn run(args: RenderArgs, config_name: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_name)?;
    args.synth.apply(&mut config);
    config.audio.channels = 2;
    if let Some(rate) = args.sample_rate {
        config.audio.sample_rate = rate;
    }
    let score = args.score.load()?;
    let settings = config.to_settings()?;

    let tail = args
        .tail
        .unwrap_or_else(|| f64::from(settings.amp_envelope.release));
    if !(tail.is_finite() && tail >= 0.0) {
        anyhow::bail!("--tail must be >= 0, got {tail}");
    }

    let sample_rate = settings.sample_rate;
    let duration = score.end_time() + tail;
    let total_frames = (duration * f64::from(sample_rate)).ceil() as usize;
    let block_size = settings.block_size;
    let total_blocks = total_frames.div_ceil(block_size);

    println!("Rendering {} note(s) to {}", score.notes().len(), args.output.display());
    println!(
        "  {} Hz, {}-frame blocks, {:.2}s",
        sample_rate, block_size, duration
    );

    let mut offline = OfflineRender::new(settings, &score)?;
    let mut block = vec![0.0_f32; offline.block_len()];
    let mut samples = Vec::with_capacity(total_blocks * block.len());

    let pb = ProgressBar::new(total_blocks as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    for _ in 0..total_blocks {
        offline.render_next(&mut block);
        samples.extend_from_slice(&block);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    samples.truncate(total_frames * 2);
    write_wav_stereo(&args.output, &samples, sample_rate)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let stats = offline.engine().stats().snapshot();
    let peak_level = peak(&samples);
    let peak_db = if peak_level > 0.0 {
        20.0 * peak_level.log10()
    } else {
        f32::NEG_INFINITY
    };

    println!();
    println!("Wrote {}", args.output.display());
    println!("  Frames:  {total_frames}");
    println!("  Peak:    {peak_level:.4} ({peak_db:.1} dBFS)");
    println!("  Skipped: {} note(s)", stats.skipped_notes);
    Ok(())
}
