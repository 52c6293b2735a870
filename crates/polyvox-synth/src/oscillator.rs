//! Stateless oscillator bank.
//!
//! Every waveform is a pure function of frequency and absolute time, so any
//! voice can be rendered on any thread in any order. Bright waveforms are
//! additive: a sum of sine partials `h = 1, 2, 3, ...` (saw-like) or
//! `h = 1, 3, 5, ...` (square-like) with amplitude `1/h`. Output is not
//! normalized and lands roughly in `[-2, 2]`.
//!
//! Partials are generated with the Chebyshev recurrence
//! `sin((h + s)x) = 2 cos(s x) sin(h x) - sin((h - s)x)`, so a 64-partial
//! square costs two trig calls per sample instead of sixty-four.

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default harmonic count for the sawtooth.
pub const SAW_HARMONICS: u32 = 32;

/// Default harmonic count for the square wave (odd partials only, so half
/// of these sound).
pub const SQUARE_HARMONICS: u32 = 64;

/// Which partials an additive waveform includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicSpacing {
    /// Every integer harmonic (1, 2, 3, ...). Sawtooth-like.
    Every,
    /// Odd harmonics only (1, 3, 5, ...). Square-like.
    Odd,
}

impl HarmonicSpacing {
    fn step(self) -> u32 {
        match self {
            HarmonicSpacing::Every => 1,
            HarmonicSpacing::Odd => 2,
        }
    }
}

/// Sum of sine partials at `frequency` Hz, sampled at `time` seconds.
///
/// Partial indices `i` run from 0 while `i < harmonics`, stepping by 1 or 2
/// per `spacing`; partial `i` sounds at `(1 + i) * frequency` with amplitude
/// `1 / (1 + i)`. `harmonics = 0` is silence.
pub fn harmonic_sum(frequency: f32, time: f64, harmonics: u32, spacing: HarmonicSpacing) -> f32 {
    let step = spacing.step();
    let partials = harmonics.div_ceil(step);
    if partials == 0 {
        return 0.0;
    }

    let x = (TAU * f64::from(frequency) * time).rem_euclid(TAU);
    let (sin_x, cos_x) = x.sin_cos();
    let (k, mut prev) = match spacing {
        // sin(0x) = 0
        HarmonicSpacing::Every => (2.0 * cos_x, 0.0),
        // cos(2x) = 2cos²x - 1, sin(-x) = -sin(x)
        HarmonicSpacing::Odd => (2.0 * (2.0 * cos_x * cos_x - 1.0), -sin_x),
    };

    let mut current = sin_x;
    let mut harmonic = 1.0f64;
    let mut sum = 0.0f64;
    for _ in 0..partials {
        sum += current / harmonic;
        let next = k * current - prev;
        prev = current;
        current = next;
        harmonic += f64::from(step);
    }
    sum as f32
}

/// Pure sine.
#[inline]
pub fn sine(frequency: f32, time: f64) -> f32 {
    (TAU * f64::from(frequency) * time).rem_euclid(TAU).sin() as f32
}

/// Additive sawtooth with every harmonic up to `harmonics`.
#[inline]
pub fn sawtooth(frequency: f32, time: f64, harmonics: u32) -> f32 {
    harmonic_sum(frequency, time, harmonics, HarmonicSpacing::Every)
}

/// Additive square with odd harmonics up to `harmonics`.
#[inline]
pub fn square(frequency: f32, time: f64, harmonics: u32) -> f32 {
    harmonic_sum(frequency, time, harmonics, HarmonicSpacing::Odd)
}

/// Equal-tempered frequency of `key`, with key 49 at 440 Hz.
///
/// `detune` is in cents and is added to the key before exponentiation.
#[inline]
pub fn key_to_pitch(key: i32, detune: f32) -> f32 {
    let semitones = key as f32 + detune * 0.01 - 49.0;
    440.0 * (semitones / 12.0).exp2()
}

static NOISE_SEED: OnceLock<u64> = OnceLock::new();
static NOISE_STREAM: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static NOISE: RefCell<StdRng> = RefCell::new(noise_rng());
}

fn noise_rng() -> StdRng {
    let seed = *NOISE_SEED.get_or_init(rand::random);
    let stream = NOISE_STREAM.fetch_add(1, Ordering::Relaxed);
    StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Uniform white noise in `[0, 1)`.
///
/// The generator is seeded once per process; each thread draws from its own
/// stream so concurrent voices never contend on a lock.
#[inline]
pub fn noise() -> f32 {
    NOISE.with_borrow_mut(|rng| rng.random::<f32>())
}

/// Slow stereo detune LFO.
///
/// Produces a detune in cents per channel:
/// `depth * (0.5 + 0.5 * sin(2π * rate * t))`. Different left and right
/// depths spread the layers across the stereo field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetuneLfo {
    /// LFO rate in Hz (default 0.025)
    pub rate_hz: f32,
    /// Left channel depth in cents (default 20)
    pub left_cents: f32,
    /// Right channel depth in cents (default 10)
    pub right_cents: f32,
}

impl Default for DetuneLfo {
    fn default() -> Self {
        Self {
            rate_hz: 0.025,
            left_cents: 20.0,
            right_cents: 10.0,
        }
    }
}

impl DetuneLfo {
    /// `(left, right)` detune in cents at `time` seconds.
    pub fn offsets(&self, time: f64) -> (f32, f32) {
        let lfo = 0.5 + 0.5 * sine(self.rate_hz, time);
        (self.left_cents * lfo, self.right_cents * lfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_sum(frequency: f32, time: f64, harmonics: u32, step: u32) -> f32 {
        let mut sum = 0.0f64;
        let mut i = 0;
        while i < harmonics {
            let h = f64::from(1 + i);
            sum += (TAU * f64::from(frequency) * h * time).sin() / h;
            i += step;
        }
        sum as f32
    }

    #[test]
    fn test_recurrence_matches_direct_sum() {
        for &(freq, harmonics) in &[(110.0f32, 1u32), (220.0, 7), (440.0, 32), (97.3, 64)] {
            for n in 0..200 {
                let t = n as f64 / 48000.0 + 3.7;
                let every = harmonic_sum(freq, t, harmonics, HarmonicSpacing::Every);
                let odd = harmonic_sum(freq, t, harmonics, HarmonicSpacing::Odd);
                assert!(
                    (every - direct_sum(freq, t, harmonics, 1)).abs() < 1e-4,
                    "every: f={freq} h={harmonics} t={t}"
                );
                assert!(
                    (odd - direct_sum(freq, t, harmonics, 2)).abs() < 1e-4,
                    "odd: f={freq} h={harmonics} t={t}"
                );
            }
        }
    }

    #[test]
    fn test_zero_harmonics_is_silent() {
        assert_eq!(harmonic_sum(440.0, 0.3, 0, HarmonicSpacing::Every), 0.0);
    }

    #[test]
    fn test_single_harmonic_is_sine() {
        let t = 0.00123;
        assert!((harmonic_sum(440.0, t, 1, HarmonicSpacing::Every) - sine(440.0, t)).abs() < 1e-6);
    }

    #[test]
    fn test_output_bounded() {
        for n in 0..4800 {
            let t = n as f64 / 48000.0;
            let saw = sawtooth(261.6, t, SAW_HARMONICS);
            let sq = square(261.6, t, SQUARE_HARMONICS);
            assert!(saw.abs() <= 2.0, "saw out of range: {saw}");
            assert!(sq.abs() <= 2.0, "square out of range: {sq}");
        }
    }

    #[test]
    fn test_key_to_pitch() {
        assert!((key_to_pitch(49, 0.0) - 440.0).abs() < 1e-3);
        assert!((key_to_pitch(61, 0.0) - 880.0).abs() < 1e-2);
        assert!((key_to_pitch(37, 0.0) - 220.0).abs() < 1e-3);
        // 100 cents is one semitone
        assert!((key_to_pitch(48, 100.0) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn test_noise_range() {
        for _ in 0..10_000 {
            let n = noise();
            assert!((0.0..1.0).contains(&n), "noise out of range: {n}");
        }
    }

    #[test]
    fn test_noise_not_constant() {
        let first = noise();
        assert!((0..100).any(|_| noise() != first));
    }

    #[test]
    fn test_detune_lfo_range() {
        let lfo = DetuneLfo::default();
        for n in 0..100 {
            let (l, r) = lfo.offsets(n as f64);
            assert!((0.0..=20.0).contains(&l));
            assert!((0.0..=10.0).contains(&r));
            assert!((l - 2.0 * r).abs() < 1e-4);
        }
        // Quarter period of a 0.025 Hz LFO is 10 s: full depth
        let (l, _) = lfo.offsets(10.0);
        assert!((l - 20.0).abs() < 1e-3);
    }
}
