//! Layered instruments.
//!
//! Each instrument stacks four copies of a waveform per channel. The copies
//! are detuned by the LFO offset times [`LAYER_DETUNE`], so the layers beat
//! against each other and the left/right channels drift apart.

use std::fmt;
use std::str::FromStr;

use crate::oscillator::{self, HarmonicSpacing, SAW_HARMONICS, SQUARE_HARMONICS};

/// Number of detuned layers per channel.
pub const LAYERS: usize = 4;

/// Detune multiplier per layer, applied to the LFO offset.
pub const LAYER_DETUNE: [f32; LAYERS] = [1.0, 1.5, 3.0, 4.5];

/// Harmonic counts for the additive waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonicCounts {
    /// Partials for the sine stack (default 1, a pure sine)
    pub sine: u32,
    /// Partials for the sawtooth (default 32)
    pub saw: u32,
    /// Partial index bound for the square, odd partials only (default 64)
    pub square: u32,
}

impl Default for HarmonicCounts {
    fn default() -> Self {
        Self {
            sine: 1,
            saw: SAW_HARMONICS,
            square: SQUARE_HARMONICS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waveform {
    Sine,
    Saw,
    Square,
}

impl Waveform {
    #[inline]
    fn sample(self, frequency: f32, time: f64, harmonics: &HarmonicCounts) -> f32 {
        match self {
            Waveform::Sine => {
                oscillator::harmonic_sum(frequency, time, harmonics.sine, HarmonicSpacing::Every)
            }
            Waveform::Saw => oscillator::sawtooth(frequency, time, harmonics.saw),
            Waveform::Square => oscillator::square(frequency, time, harmonics.square),
        }
    }
}

/// Selectable instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Instrument {
    /// Stacked sines.
    #[default]
    Sine,
    /// Stacked odd-harmonic squares.
    Square,
    /// Stacked sawtooths.
    Saw,
    /// Sawtooth on the left, square on the right.
    SawSquare,
}

impl Instrument {
    /// All instruments in index order.
    pub const ALL: [Instrument; 4] = [
        Instrument::Sine,
        Instrument::Square,
        Instrument::Saw,
        Instrument::SawSquare,
    ];

    /// Instrument for a zero-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Zero-based index of this instrument.
    pub fn index(self) -> usize {
        match self {
            Instrument::Sine => 0,
            Instrument::Square => 1,
            Instrument::Saw => 2,
            Instrument::SawSquare => 3,
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Sine => "sine",
            Instrument::Square => "square",
            Instrument::Saw => "saw",
            Instrument::SawSquare => "saw-square",
        }
    }

    fn waveforms(self) -> (Waveform, Waveform) {
        match self {
            Instrument::Sine => (Waveform::Sine, Waveform::Sine),
            Instrument::Square => (Waveform::Square, Waveform::Square),
            Instrument::Saw => (Waveform::Saw, Waveform::Saw),
            Instrument::SawSquare => (Waveform::Saw, Waveform::Square),
        }
    }

    /// Per-layer frequencies for `key` given the channel detune in cents.
    ///
    /// Frequencies only change once per block, so callers compute them here
    /// and pass them to [`frame`](Self::frame) for every sample.
    pub fn layer_frequencies(
        key: i32,
        detune_left: f32,
        detune_right: f32,
    ) -> ([f32; LAYERS], [f32; LAYERS]) {
        let mut left = [0.0; LAYERS];
        let mut right = [0.0; LAYERS];
        for (i, &mult) in LAYER_DETUNE.iter().enumerate() {
            left[i] = oscillator::key_to_pitch(key, detune_left * mult);
            right[i] = oscillator::key_to_pitch(key, detune_right * mult);
        }
        (left, right)
    }

    /// One stereo frame of the layer stack at `time` seconds.
    #[inline]
    pub fn frame(
        self,
        left_freqs: &[f32; LAYERS],
        right_freqs: &[f32; LAYERS],
        time: f64,
        harmonics: &HarmonicCounts,
    ) -> (f32, f32) {
        let (left_wave, right_wave) = self.waveforms();
        let left: f32 = left_freqs
            .iter()
            .map(|&f| left_wave.sample(f, time, harmonics))
            .sum();
        let right: f32 = right_freqs
            .iter()
            .map(|&f| right_wave.sample(f, time, harmonics))
            .sum();
        (left, right)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(index) = lower.parse::<usize>() {
            return Self::from_index(index)
                .ok_or_else(|| format!("instrument index {index} out of range (0-3)"));
        }
        Self::ALL
            .into_iter()
            .find(|i| i.name() == lower || (lower == "sawsquare" && *i == Instrument::SawSquare))
            .ok_or_else(|| format!("unknown instrument '{s}' (sine, square, saw, saw-square)"))
    }
}
