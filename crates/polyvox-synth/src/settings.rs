//! Construction-time engine settings.

use std::time::Duration;

use polyvox_analysis::Window;

use crate::envelope::AdsrParams;
use crate::instrument::HarmonicCounts;
use crate::oscillator::DetuneLfo;
use crate::pool::RenderStrategy;
use crate::registry::RenderContext;
use crate::{Error, Result};

/// Upper bound on the polyphony cap.
pub const MAX_VOICES_LIMIT: usize = 64;

/// Everything fixed when the engine is built.
///
/// Live toggles (volume, instrument, dirty, FFT, mute, cutoff) start from
/// `context` and are changed afterwards through the
/// [`NoteRegistry`](crate::NoteRegistry).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Output sample rate in Hz (default 48000)
    pub sample_rate: u32,
    /// Device channel count (default 2)
    pub channels: u16,
    /// Frames per render block; a power of two (default 512)
    pub block_size: usize,
    /// Polyphony cap (default 16)
    pub max_voices: usize,
    /// Additive waveform partial counts
    pub harmonics: HarmonicCounts,
    /// Amplitude envelope shape
    pub amp_envelope: AdsrParams,
    /// Filter-modulation envelope shape
    pub filter_envelope: AdsrParams,
    /// Stereo detune LFO
    pub detune: DetuneLfo,
    /// Amplitude of injected noise when dirty (default 0.125)
    pub noise_amplitude: f32,
    /// Initial live parameters
    pub context: RenderContext,
    /// Sequential or pooled voice rendering
    pub strategy: RenderStrategy,
    /// Longest the renderer waits for the registry lock (default 500 µs)
    pub lock_timeout: Duration,
    /// Spectrum display bins (default 256)
    pub spectrum_bins: usize,
    /// Spectrum analysis window
    pub spectrum_window: Window,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            block_size: 512,
            max_voices: 16,
            harmonics: HarmonicCounts::default(),
            amp_envelope: AdsrParams::AMPLITUDE,
            filter_envelope: AdsrParams::FILTER,
            detune: DetuneLfo::default(),
            noise_amplitude: 0.125,
            context: RenderContext::default(),
            strategy: RenderStrategy::Sequential,
            lock_timeout: Duration::from_micros(500),
            spectrum_bins: 256,
            spectrum_window: Window::Rectangular,
        }
    }
}

impl EngineSettings {
    /// Duration of one block in seconds.
    pub fn block_seconds(&self) -> f64 {
        self.block_size as f64 / f64::from(self.sample_rate)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::invalid("sample_rate", "must be greater than 0"));
        }
        if self.channels == 0 {
            return Err(Error::invalid("channels", "must be at least 1"));
        }
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(Error::invalid(
                "block_size",
                format!("must be a nonzero power of two, got {}", self.block_size),
            ));
        }
        if self.max_voices == 0 || self.max_voices > MAX_VOICES_LIMIT {
            return Err(Error::invalid(
                "max_voices",
                format!("must be in 1..={MAX_VOICES_LIMIT}, got {}", self.max_voices),
            ));
        }
        if let RenderStrategy::Pool { workers: 0 } = self.strategy {
            return Err(Error::invalid("workers", "pool needs at least one worker"));
        }
        if !self.noise_amplitude.is_finite() || self.noise_amplitude < 0.0 {
            return Err(Error::invalid(
                "noise_amplitude",
                format!("must be finite and >= 0, got {}", self.noise_amplitude),
            ));
        }
        if !self.detune.rate_hz.is_finite()
            || !self.detune.left_cents.is_finite()
            || !self.detune.right_cents.is_finite()
        {
            return Err(Error::invalid("detune", "rate and depths must be finite"));
        }
        if !(0.0..=1.0).contains(&self.context.volume) {
            return Err(Error::invalid(
                "volume",
                format!("must be in [0, 1], got {}", self.context.volume),
            ));
        }
        self.amp_envelope.validate("amp_envelope")?;
        self.filter_envelope.validate("filter_envelope")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EngineSettings::default();
        settings.validate().unwrap();
        assert!((settings.block_seconds() - 512.0 / 48000.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_block_size() {
        let settings = EngineSettings {
            block_size: 500,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("block_size"));
    }

    #[test]
    fn test_rejects_voice_counts() {
        for max_voices in [0, MAX_VOICES_LIMIT + 1] {
            let settings = EngineSettings {
                max_voices,
                ..Default::default()
            };
            assert!(settings.validate().is_err(), "max_voices = {max_voices}");
        }
    }

    #[test]
    fn test_rejects_empty_pool() {
        let settings = EngineSettings {
            strategy: RenderStrategy::Pool { workers: 0 },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_envelope() {
        let mut settings = EngineSettings::default();
        settings.filter_envelope.release = f32::NAN;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("filter_envelope"));
    }
}
