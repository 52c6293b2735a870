//! Shared CLI helpers used across multiple commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use polyvox_config::{Config, StrategyKind};
use polyvox_synth::{BlockRenderer, Engine, EngineSettings, ManualClock};

use crate::score::{EventKind, Score, ScoreEvent};

/// Where the notes come from.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Score text (`key@start+duration[*velocity]`, comma separated) or a
    /// path to a file containing it
    #[arg(short, long)]
    pub score: Option<String>,

    /// Keyboard characters to play in sequence (y s x d c v g b h n j m ,)
    #[arg(short, long, conflicts_with = "score")]
    pub keys: Option<String>,

    /// Seconds per character with --keys
    #[arg(long, default_value = "0.25")]
    pub step: f64,

    /// Velocity for --keys notes (0.0 to 1.0)
    #[arg(long, default_value = "1.0")]
    pub velocity: f32,
}

impl ScoreArgs {
    /// Parse the score named by the arguments.
    pub fn load(&self) -> anyhow::Result<Score> {
        if let Some(text) = &self.score {
            let path = Path::new(text);
            let text = if path.is_file() {
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading score file {}", path.display()))?
            } else {
                text.clone()
            };
            return Ok(text.parse()?);
        }

        if let Some(keys) = &self.keys {
            if !(self.step.is_finite() && self.step > 0.0) {
                anyhow::bail!("--step must be positive, got {}", self.step);
            }
            return Ok(Score::from_keys(keys, self.step, self.velocity)?);
        }

        anyhow::bail!("Nothing to play: pass --score or --keys")
    }
}

/// Per-run overrides of the config file's synth settings.
#[derive(Args, Debug, Clone, Default)]
pub struct SynthOverrides {
    /// Instrument (sine, square, saw, saw-square)
    #[arg(short, long)]
    pub instrument: Option<String>,

    /// Add white noise to every voice
    #[arg(long)]
    pub dirty: bool,

    /// Master volume (0.0 to 1.0)
    #[arg(long)]
    pub volume: Option<f32>,

    /// Filter cutoff in Hz
    #[arg(long)]
    pub cutoff: Option<f32>,

    /// Maximum simultaneous voices
    #[arg(long)]
    pub voices: Option<usize>,

    /// Render voices on a worker pool of this size
    #[arg(long)]
    pub workers: Option<usize>,
}

impl SynthOverrides {
    /// Write the overrides into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(instrument) = &self.instrument {
            config.synth.instrument.clone_from(instrument);
        }
        if self.dirty {
            config.synth.dirty = true;
        }
        if let Some(volume) = self.volume {
            config.synth.volume = volume;
        }
        if let Some(cutoff) = self.cutoff {
            config.filter.cutoff_hz = cutoff;
        }
        if let Some(voices) = self.voices {
            config.synth.max_voices = voices;
        }
        if let Some(workers) = self.workers {
            config.render.strategy = StrategyKind::Pool;
            config.render.workers = workers;
        }
    }
}

/// Load the config named on the command line, or the default one.
pub fn load_config(name: Option<&str>) -> anyhow::Result<Config> {
    let (config, path) = Config::resolve(name)?;
    match path {
        Some(path) => tracing::debug!(path = %path.display(), "loaded config"),
        None => tracing::debug!("no config file, using defaults"),
    }
    Ok(config)
}

/// Drives an engine from a score on a manual clock, one block at a time.
///
/// Before each block the clock is set to the block's start time and every
/// score event due by then is applied at its own timestamp, so offline
/// output does not depend on wall-clock speed.
pub struct OfflineRender {
    engine: Engine,
    clock: Arc<ManualClock>,
    renderer: BlockRenderer,
    events: Vec<ScoreEvent>,
    next_event: usize,
}

impl OfflineRender {
    /// Build an engine for `settings` and queue the events of `score`.
    pub fn new(settings: EngineSettings, score: &Score) -> anyhow::Result<Self> {
        let clock = Arc::new(ManualClock::new());
        let engine = Engine::with_clock(settings, clock.clone())?;
        let renderer = engine.renderer()?;
        Ok(Self {
            engine,
            clock,
            renderer,
            events: score.events(),
            next_event: 0,
        })
    }

    /// The engine being driven.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Start time of the next block in seconds.
    pub fn time(&self) -> f64 {
        self.renderer.ticks() as f64 / f64::from(self.renderer.sample_rate())
    }

    /// Interleaved samples in one block.
    pub fn block_len(&self) -> usize {
        self.renderer.block_size() * self.renderer.channels()
    }

    /// Render the next block into `output`, which should hold
    /// [`block_len`](Self::block_len) samples.
    pub fn render_next(&mut self, output: &mut [f32]) {
        let now = self.time();
        self.clock.set(now);

        let registry = self.engine.registry();
        while let Some(event) = self.events.get(self.next_event).filter(|e| e.time <= now) {
            match event.kind {
                EventKind::On(velocity) => {
                    let outcome = registry.add_note(event.key, velocity, event.time);
                    tracing::debug!(key = event.key, time = event.time, ?outcome, "note on");
                }
                EventKind::Off => {
                    registry.remove_note(event.key, event.time);
                    tracing::debug!(key = event.key, time = event.time, "note off");
                }
            }
            self.next_event += 1;
        }
        self.engine.prune();

        self.renderer.render(output);
    }
}

/// Peak absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()))
}
