//! Timestamp-driven linear ADSR envelope.
//!
//! Unlike a per-sample envelope generator, [`Envelope`] keeps no running
//! level. It records the wall-clock second a note was pressed and released
//! and recomputes the gain from those two timestamps on every query:
//!
//! ```text
//!  level
//!    ^
//!  A |    /\
//!    |   /  \______ S
//!    |  /          \
//!    | /            \
//!  0 +-------------------> t
//!     on  +a  +d   off +r
//! ```
//!
//! All ramps are linear. A level below [`SILENCE_THRESHOLD`] reads as exactly
//! zero and marks the envelope inactive, which is what voice reclamation
//! keys off.

use crate::{Error, Result};

/// Levels below this are treated as silence.
pub const SILENCE_THRESHOLD: f32 = 1e-4;

/// Shape of an ADSR envelope.
///
/// Times are in seconds, levels are linear gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    /// Peak level reached at the end of the attack ramp (0.0 to 1.0, default 1.0)
    pub attack_level: f32,
    /// Attack time in seconds (default 0.15)
    pub attack: f32,
    /// Decay time in seconds (default 0.2)
    pub decay: f32,
    /// Sustain level as a fraction of full scale (0.0 to 1.0, default 0.8)
    pub sustain: f32,
    /// Release time in seconds (default 0.65)
    pub release: f32,
}

impl AdsrParams {
    /// Default amplitude envelope.
    pub const AMPLITUDE: Self = Self {
        attack_level: 1.0,
        attack: 0.15,
        decay: 0.2,
        sustain: 0.8,
        release: 0.65,
    };

    /// Default filter-modulation envelope: fast attack, slower fall to a
    /// lower plateau.
    pub const FILTER: Self = Self {
        attack_level: 1.0,
        attack: 0.01,
        decay: 0.3,
        sustain: 0.5,
        release: 0.65,
    };

    /// Check that times are finite and non-negative and levels lie in `[0, 1]`.
    ///
    /// `name` identifies the envelope in the error.
    pub fn validate(&self, name: &'static str) -> Result<()> {
        for (label, time) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ] {
            if !time.is_finite() || time < 0.0 {
                return Err(Error::invalid(
                    name,
                    format!("{label} time must be finite and >= 0, got {time}"),
                ));
            }
        }
        for (label, level) in [
            ("attack level", self.attack_level),
            ("sustain", self.sustain),
        ] {
            if !(0.0..=1.0).contains(&level) {
                return Err(Error::invalid(
                    name,
                    format!("{label} must be in [0, 1], got {level}"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::AMPLITUDE
    }
}

/// Envelope stage at a given instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopePhase {
    /// Never triggered. Output is zero.
    #[default]
    Idle,
    /// Ramping from zero to the attack level.
    Attack,
    /// Falling from the attack level to the sustain level.
    Decay,
    /// Holding the sustain level while the note is held.
    Sustain,
    /// Falling from the sustain level to zero after note-off.
    Release,
}

/// Linear ADSR envelope evaluated from note-on/note-off timestamps.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{AdsrParams, Envelope};
///
/// let mut env = Envelope::new(AdsrParams::AMPLITUDE);
/// env.note_on(0.0);
/// assert!((env.level(0.075) - 0.5).abs() < 1e-6);
///
/// env.note_off(1.0);
/// assert_eq!(env.level(1.0 + 0.65), 0.0);
/// assert!(env.is_released());
/// ```
#[derive(Debug, Clone)]
pub struct Envelope {
    params: AdsrParams,
    on_time: Option<f64>,
    off_time: Option<f64>,
    active: bool,
    released: bool,
}

impl Envelope {
    /// Create an idle envelope with the given shape.
    pub fn new(params: AdsrParams) -> Self {
        Self {
            params,
            on_time: None,
            off_time: None,
            active: false,
            released: false,
        }
    }

    /// Envelope shape.
    pub fn params(&self) -> &AdsrParams {
        &self.params
    }

    /// Record a note-on at `time` seconds.
    pub fn note_on(&mut self, time: f64) {
        self.on_time = Some(time);
    }

    /// Record a note-off at `time` seconds.
    pub fn note_off(&mut self, time: f64) {
        self.off_time = Some(time);
    }

    /// Restart the attack at `time`, forgetting the previous note-off.
    pub fn retrigger(&mut self, time: f64) {
        self.on_time = Some(time);
        self.off_time = None;
        self.released = false;
    }

    /// Note-on timestamp, if triggered.
    pub fn on_time(&self) -> Option<f64> {
        self.on_time
    }

    /// Note-off timestamp, if released since the last trigger.
    pub fn off_time(&self) -> Option<f64> {
        self.off_time
    }

    /// Whether the last [`level`](Self::level) call produced audible output.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a [`level`](Self::level) call has observed the release regime.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stage the envelope is in at `now`.
    pub fn phase(&self, now: f64) -> EnvelopePhase {
        match self.regime() {
            Regime::Idle => EnvelopePhase::Idle,
            Regime::Release(_) => EnvelopePhase::Release,
            Regime::Held(on) => {
                let elapsed = (now - on).max(0.0) as f32;
                let p = &self.params;
                if p.attack > 0.0 && elapsed <= p.attack {
                    EnvelopePhase::Attack
                } else if p.decay > 0.0 && elapsed <= p.attack + p.decay {
                    EnvelopePhase::Decay
                } else {
                    EnvelopePhase::Sustain
                }
            }
        }
    }

    /// Gain at `now` seconds.
    ///
    /// Updates the `released` flag when the release regime is observed and
    /// the `active` flag from the result. Levels below [`SILENCE_THRESHOLD`]
    /// come back as exactly 0.0.
    pub fn level(&mut self, now: f64) -> f32 {
        let p = self.params;
        let level = match self.regime() {
            Regime::Idle => 0.0,
            Regime::Held(on) => {
                let elapsed = (now - on).max(0.0) as f32;
                if p.attack > 0.0 && elapsed <= p.attack {
                    p.attack_level * elapsed / p.attack
                } else if p.decay > 0.0 && elapsed <= p.attack + p.decay {
                    let progress = (elapsed - p.attack) / p.decay;
                    (1.0 - progress) * (p.attack_level - p.sustain) + p.sustain
                } else {
                    p.sustain
                }
            }
            Regime::Release(off) => {
                self.released = true;
                let elapsed = (now - off).max(0.0) as f32;
                if p.release > 0.0 && elapsed < p.release {
                    (1.0 - elapsed / p.release) * p.sustain
                } else {
                    0.0
                }
            }
        };

        if level < SILENCE_THRESHOLD {
            self.active = false;
            0.0
        } else {
            self.active = true;
            level
        }
    }

    /// True once the envelope has fallen silent after its attack.
    ///
    /// A note at the very start of its attack ramp also reads as silent; it
    /// is not finished, so this only reports `true` outside the attack stage.
    pub fn has_decayed(&mut self, now: f64) -> bool {
        self.level(now) == 0.0 && self.phase(now) != EnvelopePhase::Attack
    }

    fn regime(&self) -> Regime {
        match (self.on_time, self.off_time) {
            (None, _) => Regime::Idle,
            (Some(on), Some(off)) if on <= off => Regime::Release(off),
            (Some(on), _) => Regime::Held(on),
        }
    }
}

#[derive(Clone, Copy)]
enum Regime {
    Idle,
    Held(f64),
    Release(f64),
}
