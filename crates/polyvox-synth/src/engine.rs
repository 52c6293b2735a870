//! Engine facade: shared state plus renderer construction.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::registry::{AddOutcome, NoteRegistry};
use crate::renderer::BlockRenderer;
use crate::settings::EngineSettings;
use crate::snapshot::Visualization;
use crate::stats::RenderStats;
use crate::Result;

/// Owns the shared state of one synth instance.
///
/// Input and control code talk to the engine (or to its [`NoteRegistry`]
/// directly); the audio side gets a [`BlockRenderer`] from
/// [`renderer`](Self::renderer). Timestamps for note events come from the
/// engine's [`Clock`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use polyvox_synth::{Engine, EngineSettings, ManualClock};
///
/// let clock = Arc::new(ManualClock::new());
/// let engine = Engine::with_clock(EngineSettings::default(), clock.clone()).unwrap();
/// let mut renderer = engine.renderer().unwrap();
///
/// engine.note_on(49, 1.0);
/// clock.set(0.5);
///
/// let mut block = vec![0.0_f32; 512 * 2];
/// renderer.render(&mut block);
/// assert!(block.iter().any(|&s| s != 0.0));
/// ```
pub struct Engine {
    settings: EngineSettings,
    registry: Arc<NoteRegistry>,
    clock: Arc<dyn Clock>,
    visualization: Arc<Visualization>,
    stats: Arc<RenderStats>,
}

impl Engine {
    /// Build an engine timed by the system clock.
    pub fn new(settings: EngineSettings) -> Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock::new()))
    }

    /// Build an engine timed by `clock`.
    pub fn with_clock(settings: EngineSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        settings.validate()?;

        let registry = Arc::new(NoteRegistry::new(
            settings.max_voices,
            settings.amp_envelope,
            settings.filter_envelope,
            settings.context,
        ));
        let spectrum_bins = settings.spectrum_bins.min(settings.block_size / 2);
        let visualization = Arc::new(Visualization::new(
            settings.block_size * 2,
            spectrum_bins.max(1),
        ));

        tracing::info!(
            sample_rate = settings.sample_rate,
            channels = settings.channels,
            block_size = settings.block_size,
            max_voices = settings.max_voices,
            strategy = ?settings.strategy,
            "engine created"
        );

        Ok(Self {
            settings,
            registry,
            clock,
            visualization,
            stats: Arc::new(RenderStats::default()),
        })
    }

    /// Build a renderer for one output stream.
    pub fn renderer(&self) -> Result<BlockRenderer> {
        BlockRenderer::new(
            &self.settings,
            Arc::clone(&self.registry),
            Arc::clone(&self.clock),
            Arc::clone(&self.visualization),
            Arc::clone(&self.stats),
        )
    }

    /// Note-on for `key` at the current clock time.
    pub fn note_on(&self, key: i32, velocity: f32) -> AddOutcome {
        self.registry.add_note(key, velocity, self.clock.now())
    }

    /// Note-off for `key` at the current clock time.
    pub fn note_off(&self, key: i32) -> bool {
        self.registry.remove_note(key, self.clock.now())
    }

    /// Prune silent notes at the current clock time.
    pub fn prune(&self) -> usize {
        self.registry.prune_released(self.clock.now())
    }

    /// Current clock time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Settings the engine was built with.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Shared note registry.
    pub fn registry(&self) -> &Arc<NoteRegistry> {
        &self.registry
    }

    /// Shared visualization snapshots.
    pub fn visualization(&self) -> &Arc<Visualization> {
        &self.visualization
    }

    /// Shared render counters.
    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
