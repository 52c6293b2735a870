//! Engine configuration file format.

use std::path::{Path, PathBuf};
use std::time::Duration;

use polyvox_analysis::Window;
use polyvox_synth::{
    AdsrParams, DetuneLfo, EngineSettings, HarmonicCounts, Instrument, RenderContext,
    RenderStrategy,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Engine configuration as stored on disk.
///
/// Every section and field is optional; anything missing takes the engine
/// default. [`to_settings`](Self::to_settings) turns the file into
/// validated [`EngineSettings`].
///
/// # TOML Format
///
/// ```toml
/// [audio]
/// sample_rate = 48000
/// channels = 2
/// block_size = 512
/// device = "USB"
///
/// [synth]
/// max_voices = 16
/// volume = 0.1
/// instrument = "saw-square"
/// dirty = false
///
/// [envelope.amp]
/// attack = 0.15
/// release = 0.65
///
/// [filter]
/// cutoff_hz = 8000.0
/// envelope_amount_hz = 4000.0
///
/// [render]
/// strategy = "pool"
/// workers = 4
///
/// [spectrum]
/// enabled = true
/// bins = 256
/// window = "hann"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Device and block layout.
    pub audio: AudioSection,
    /// Voices, instrument, and oscillator settings.
    pub synth: SynthSection,
    /// Amplitude and filter envelopes.
    pub envelope: EnvelopeSection,
    /// Per-voice lowpass.
    pub filter: FilterSection,
    /// Voice rendering strategy and lock bound.
    pub render: RenderSection,
    /// Spectrum analyzer.
    pub spectrum: SpectrumSection,
}

/// `[audio]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSection {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channels. The host may override this with the device's count.
    pub channels: u16,
    /// Frames per render block (power of two).
    pub block_size: usize,
    /// Output device name filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Device buffer size in frames; device default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
}

impl Default for AudioSection {
    fn default() -> Self {
        let s = EngineSettings::default();
        Self {
            sample_rate: s.sample_rate,
            channels: s.channels,
            block_size: s.block_size,
            device: None,
            buffer_size: None,
        }
    }
}

/// `[synth]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthSection {
    /// Polyphony cap.
    pub max_voices: usize,
    /// Master volume (0.0 to 1.0).
    pub volume: f32,
    /// Instrument name or index: `sine`, `square`, `saw`, `saw-square`.
    pub instrument: String,
    /// Start with noise injection on.
    pub dirty: bool,
    /// Amplitude of the injected noise.
    pub noise_amplitude: f32,
    /// Partials in the sine stack.
    pub sine_harmonics: u32,
    /// Partials in the sawtooth.
    pub saw_harmonics: u32,
    /// Partial bound for the square.
    pub square_harmonics: u32,
    /// Detune LFO rate in Hz.
    pub detune_rate_hz: f32,
    /// Left channel detune depth in cents.
    pub detune_left_cents: f32,
    /// Right channel detune depth in cents.
    pub detune_right_cents: f32,
}

impl Default for SynthSection {
    fn default() -> Self {
        let s = EngineSettings::default();
        Self {
            max_voices: s.max_voices,
            volume: s.context.volume,
            instrument: s.context.instrument.name().to_string(),
            dirty: s.context.dirty,
            noise_amplitude: s.noise_amplitude,
            sine_harmonics: s.harmonics.sine,
            saw_harmonics: s.harmonics.saw,
            square_harmonics: s.harmonics.square,
            detune_rate_hz: s.detune.rate_hz,
            detune_left_cents: s.detune.left_cents,
            detune_right_cents: s.detune.right_cents,
        }
    }
}

/// One ADSR table. Missing fields fall back to that envelope's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Peak level at the end of the attack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_level: Option<f32>,
    /// Attack time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<f32>,
    /// Decay time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<f32>,
    /// Sustain level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustain: Option<f32>,
    /// Release time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<f32>,
}

impl EnvelopeConfig {
    /// Every field set from `params`.
    pub fn from_params(params: &AdsrParams) -> Self {
        Self {
            attack_level: Some(params.attack_level),
            attack: Some(params.attack),
            decay: Some(params.decay),
            sustain: Some(params.sustain),
            release: Some(params.release),
        }
    }

    /// Overlay the fields that are set onto `base`.
    pub fn apply(&self, base: AdsrParams) -> AdsrParams {
        AdsrParams {
            attack_level: self.attack_level.unwrap_or(base.attack_level),
            attack: self.attack.unwrap_or(base.attack),
            decay: self.decay.unwrap_or(base.decay),
            sustain: self.sustain.unwrap_or(base.sustain),
            release: self.release.unwrap_or(base.release),
        }
    }
}

/// `[envelope]` section with `amp` and `filter` tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeSection {
    /// `[envelope.amp]`
    pub amp: EnvelopeConfig,
    /// `[envelope.filter]`
    pub filter: EnvelopeConfig,
}

impl Default for EnvelopeSection {
    fn default() -> Self {
        Self {
            amp: EnvelopeConfig::from_params(&AdsrParams::AMPLITUDE),
            filter: EnvelopeConfig::from_params(&AdsrParams::FILTER),
        }
    }
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterSection {
    /// Base cutoff in Hz; at 22000 the filter is open.
    pub cutoff_hz: f32,
    /// Cutoff offset in Hz at full filter-envelope level.
    pub envelope_amount_hz: f32,
}

impl Default for FilterSection {
    fn default() -> Self {
        let c = RenderContext::default();
        Self {
            cutoff_hz: c.cutoff_hz,
            envelope_amount_hz: c.filter_env_amount_hz,
        }
    }
}

/// Voice rendering strategy name.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Render voices inline on the audio thread.
    #[default]
    Sequential,
    /// Render voices on a worker pool.
    Pool,
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSection {
    /// `sequential` or `pool`.
    pub strategy: StrategyKind,
    /// Pool size when `strategy = "pool"`.
    pub workers: usize,
    /// Longest the renderer waits for the registry lock, in microseconds.
    pub lock_timeout_us: u64,
}

impl Default for RenderSection {
    fn default() -> Self {
        let timeout = EngineSettings::default().lock_timeout;
        Self {
            strategy: StrategyKind::Sequential,
            workers: 4,
            lock_timeout_us: u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX),
        }
    }
}

/// Spectrum window name.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// No windowing.
    #[default]
    Rectangular,
    /// Hann window.
    Hann,
}

impl From<WindowKind> for Window {
    fn from(kind: WindowKind) -> Self {
        match kind {
            WindowKind::Rectangular => Window::Rectangular,
            WindowKind::Hann => Window::Hann,
        }
    }
}

/// `[spectrum]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrumSection {
    /// Run the analyzer after every block.
    pub enabled: bool,
    /// Display bins (at most half the block size).
    pub bins: usize,
    /// Analysis window.
    pub window: WindowKind,
}

impl Default for SpectrumSection {
    fn default() -> Self {
        let s = EngineSettings::default();
        Self {
            enabled: s.context.fft_enabled,
            bins: s.spectrum_bins,
            window: WindowKind::Rectangular,
        }
    }
}

impl Config {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the config to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Serialize the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve and load a config.
    ///
    /// An explicit `name` must resolve to a file (see
    /// [`paths::find_config`]). Without one, the default file is loaded if it
    /// exists and built-in defaults are used otherwise. Returns the path that
    /// was loaded, if any.
    pub fn resolve(name: Option<&str>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match paths::find_config(name) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => match name {
                Some(name) => Err(ConfigError::NotFound(name.to_string())),
                None => Ok((Self::default(), None)),
            },
        }
    }

    /// Parsed instrument.
    pub fn instrument(&self) -> Result<Instrument, ConfigError> {
        self.synth
            .instrument
            .parse()
            .map_err(|reason: String| ConfigError::invalid_value("synth.instrument", reason))
    }

    /// Build and validate engine settings.
    pub fn to_settings(&self) -> Result<EngineSettings, ConfigError> {
        let strategy = match self.render.strategy {
            StrategyKind::Sequential => RenderStrategy::Sequential,
            StrategyKind::Pool => RenderStrategy::Pool {
                workers: self.render.workers,
            },
        };

        let settings = EngineSettings {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            block_size: self.audio.block_size,
            max_voices: self.synth.max_voices,
            harmonics: HarmonicCounts {
                sine: self.synth.sine_harmonics,
                saw: self.synth.saw_harmonics,
                square: self.synth.square_harmonics,
            },
            amp_envelope: self.envelope.amp.apply(AdsrParams::AMPLITUDE),
            filter_envelope: self.envelope.filter.apply(AdsrParams::FILTER),
            detune: DetuneLfo {
                rate_hz: self.synth.detune_rate_hz,
                left_cents: self.synth.detune_left_cents,
                right_cents: self.synth.detune_right_cents,
            },
            noise_amplitude: self.synth.noise_amplitude,
            context: RenderContext {
                volume: self.synth.volume,
                instrument: self.instrument()?,
                dirty: self.synth.dirty,
                fft_enabled: self.spectrum.enabled,
                muted: false,
                cutoff_hz: self.filter.cutoff_hz,
                filter_env_amount_hz: self.filter.envelope_amount_hz,
            },
            strategy,
            lock_timeout: Duration::from_micros(self.render.lock_timeout_us),
            spectrum_bins: self.spectrum.bins,
            spectrum_window: self.spectrum.window.into(),
        };
        settings.validate()?;
        Ok(settings)
    }
}
