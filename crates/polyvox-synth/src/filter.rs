//! Per-voice lowpass.
//!
//! Two cascaded one-pole sections per channel (12 dB/octave). Each section
//! runs the difference equation
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n]),    coeff = exp(-2π * fc / fs)
//! ```
//!
//! The cutoff is set once per block from the base cutoff plus the note's
//! filter-envelope level. At or above [`OPEN_RATIO`] of the sample rate the
//! filter is bypassed entirely, which keeps the default configuration
//! bit-transparent.

use std::f32::consts::TAU;

/// Cutoffs at or above `OPEN_RATIO * sample_rate` bypass the filter.
pub const OPEN_RATIO: f32 = 0.45;

#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// One-pole lowpass section.
#[derive(Debug, Clone, Default)]
struct OnePole {
    state: f32,
}

impl OnePole {
    #[inline]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        self.state = flush_denormal(input + coeff * (self.state - input));
        self.state
    }
}

/// Stereo 12 dB/octave lowpass with a per-block cutoff.
#[derive(Debug, Clone)]
pub struct VoiceFilter {
    sample_rate: f32,
    coeff: f32,
    bypass: bool,
    left: [OnePole; 2],
    right: [OnePole; 2],
}

impl VoiceFilter {
    /// Create an open (bypassed) filter.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            coeff: 0.0,
            bypass: true,
            left: Default::default(),
            right: Default::default(),
        }
    }

    /// Set the cutoff in Hz for the coming block.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if cutoff_hz >= OPEN_RATIO * self.sample_rate {
            self.bypass = true;
            return;
        }
        self.bypass = false;
        self.coeff = (-TAU * cutoff_hz.max(1.0) / self.sample_rate).exp();
    }

    /// Whether the filter is currently bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Filter one stereo frame.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.bypass {
            return (left, right);
        }
        let c = self.coeff;
        let l0 = self.left[0].process(left, c);
        let r0 = self.right[0].process(right, c);
        (self.left[1].process(l0, c), self.right[1].process(r0, c))
    }

    /// Clear the filter memory.
    pub fn reset(&mut self) {
        self.left = Default::default();
        self.right = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_filter_is_transparent() {
        let mut f = VoiceFilter::new(48000.0);
        f.set_cutoff(22000.0);
        assert!(f.is_bypassed());
        assert_eq!(f.process(0.3, -0.7), (0.3, -0.7));
    }

    #[test]
    fn test_passes_dc() {
        let mut f = VoiceFilter::new(48000.0);
        f.set_cutoff(1000.0);
        let mut out = (0.0, 0.0);
        for _ in 0..48000 {
            out = f.process(1.0, -1.0);
        }
        assert!((out.0 - 1.0).abs() < 1e-4, "DC should pass, got {}", out.0);
        assert!((out.1 + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_two_stages_settle_slower_than_one() {
        let mut f = VoiceFilter::new(48000.0);
        f.set_cutoff(1000.0);
        let (l, r) = f.process(1.0, 1.0);
        let mut single = OnePole::default();
        let one_stage = single.process(1.0, f.coeff);
        assert!(l < one_stage, "cascade {l} vs single stage {one_stage}");
        assert_eq!(l, r);
    }

    #[test]
    fn test_attenuates_nyquist() {
        let mut f = VoiceFilter::new(48000.0);
        f.set_cutoff(200.0);
        let mut sum = 0.0f32;
        for i in 0..4800 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            sum += f.process(x, x).0.abs();
        }
        assert!(sum / 4800.0 < 0.01, "Nyquist should be crushed, avg {}", sum / 4800.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut f = VoiceFilter::new(48000.0);
        f.set_cutoff(500.0);
        f.process(1.0, 1.0);
        f.reset();
        assert_eq!(f.process(0.0, 0.0), (0.0, 0.0));
    }
}
