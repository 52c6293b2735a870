//! Real-time playback command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use polyvox_io::{AudioBackend, BackendStreamConfig, CpalBackend};
use polyvox_synth::{AddOutcome, Engine};

use super::common::{ScoreArgs, SynthOverrides, load_config};
use crate::score::EventKind;

/// How often the control loop wakes to feed events and prune.
const CONTROL_TICK: Duration = Duration::from_millis(5);

/// Interval between stats log lines.
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    score: ScoreArgs,

    #[command(flatten)]
    synth: SynthOverrides,

    /// Output device (name substring); system default if omitted
    #[arg(short, long)]
    device: Option<String>,

    /// Keep playing after the score ends until Ctrl+C
    #[arg(long)]
    hold: bool,
}

pub fn run(args: PlayArgs, config_name: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_name)?;
    args.synth.apply(&mut config);
    let score = args.score.load()?;

    let backend = CpalBackend::new();
    let device_name = args.device.clone().or_else(|| config.audio.device.clone());
    let device = backend.find_output_device(device_name.as_deref())?;

    // The stream follows the device's layout; extra channels are written as silence
    config.audio.channels = device.channels.max(1);
    if config.audio.sample_rate != device.default_sample_rate {
        tracing::info!(
            configured = config.audio.sample_rate,
            device = device.default_sample_rate,
            "using device sample rate"
        );
        config.audio.sample_rate = device.default_sample_rate;
    }

    let settings = config.to_settings()?;
    let engine = Engine::new(settings.clone())?;
    let mut renderer = engine.renderer()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let failed = Arc::new(AtomicBool::new(false));
    let failed_cb = failed.clone();

    let stream_config = BackendStreamConfig {
        sample_rate: settings.sample_rate,
        buffer_size: config
            .audio
            .buffer_size
            .or_else(|| u32::try_from(settings.block_size).ok()),
        channels: settings.channels,
        device_name: Some(device.name.clone()),
    };

    println!("Polyvox");
    println!("=======");
    println!("  Device:     {}", device.name);
    println!(
        "  Format:     {} Hz, {} channel(s), {}-frame blocks",
        settings.sample_rate, settings.channels, settings.block_size
    );
    println!("  Instrument: {}", settings.context.instrument);
    println!("  Voices:     {}", settings.max_voices);
    println!("  Score:      {} note(s), {:.2}s", score.notes().len(), score.end_time());
    println!();
    println!("Press Ctrl+C to stop");

    let stream = backend.build_output_stream(
        &stream_config,
        Box::new(move |output: &mut [f32]| renderer.render(output)),
        Box::new(move |message: &str| {
            tracing::error!(error = message, "audio stream error");
            failed_cb.store(true, Ordering::SeqCst);
        }),
    )?;

    let events = score.events();
    let finish = score.end_time() + f64::from(settings.amp_envelope.release);
    let start = engine.now();
    let mut next_event = 0;

    let mut last_report = Instant::now();
    let mut last_stats = engine.stats().snapshot();

    while running.load(Ordering::SeqCst) {
        if failed.load(Ordering::SeqCst) {
            anyhow::bail!("Audio stream failed; see log for details");
        }

        let elapsed = engine.now() - start;
        while let Some(event) = events.get(next_event).filter(|e| e.time <= elapsed) {
            match event.kind {
                EventKind::On(velocity) => {
                    let outcome = engine.note_on(event.key, velocity);
                    if outcome == AddOutcome::AtCapacity {
                        tracing::info!(key = event.key, "all voices busy, note dropped");
                    } else {
                        tracing::debug!(key = event.key, ?outcome, "note on");
                    }
                }
                EventKind::Off => {
                    engine.note_off(event.key);
                    tracing::debug!(key = event.key, "note off");
                }
            }
            next_event += 1;
        }
        engine.prune();

        if last_report.elapsed() >= REPORT_INTERVAL {
            report(&engine, &last_stats, last_report.elapsed());
            last_stats = engine.stats().snapshot();
            engine.stats().reset_max();
            last_report = Instant::now();
        }

        let done = next_event >= events.len() && elapsed >= finish;
        if done && !args.hold && engine.registry().is_empty() {
            break;
        }

        std::thread::sleep(CONTROL_TICK);
    }

    engine.registry().release_all(engine.now());
    drop(stream);

    let totals = engine.stats().snapshot();
    println!();
    println!(
        "Stopped after {} block(s): {} lock miss(es), {} skipped note(s)",
        totals.blocks, totals.lock_misses, totals.skipped_notes
    );
    Ok(())
}

fn report(engine: &Engine, last: &polyvox_synth::StatsSnapshot, interval: Duration) {
    let delta = engine.stats().snapshot().since(last);
    let blocks_per_sec = delta.blocks as f64 / interval.as_secs_f64();
    tracing::info!(
        notes = engine.registry().len(),
        blocks_per_sec,
        last_ms = delta.last_block_ms(),
        max_ms = delta.max_block_ms(),
        lock_misses = delta.lock_misses,
        skipped_notes = delta.skipped_notes,
        "render stats"
    );
}
