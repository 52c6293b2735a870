//! A single held or releasing note.

use crate::envelope::{AdsrParams, Envelope};

/// One note in the registry.
///
/// Carries an amplitude envelope and a second envelope that sweeps the voice
/// filter. `generation` changes whenever the note is (re)started on a voice,
/// which tells the renderer to clear that voice's filter state.
#[derive(Debug, Clone)]
pub struct Note {
    key: i32,
    velocity: f32,
    amp: Envelope,
    filter: Envelope,
    voice: Option<usize>,
    generation: u64,
}

impl Note {
    /// Create a note that starts its attack at `time`.
    pub fn new(
        key: i32,
        velocity: f32,
        time: f64,
        amp: AdsrParams,
        filter: AdsrParams,
        voice: Option<usize>,
        generation: u64,
    ) -> Self {
        let mut note = Self {
            key,
            velocity: velocity.clamp(0.0, 1.0),
            amp: Envelope::new(amp),
            filter: Envelope::new(filter),
            voice,
            generation,
        };
        note.amp.note_on(time);
        note.filter.note_on(time);
        note
    }

    /// Key number.
    pub fn key(&self) -> i32 {
        self.key
    }

    /// Velocity (0.0 to 1.0).
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Assigned voice slot, if any.
    pub fn voice(&self) -> Option<usize> {
        self.voice
    }

    /// Restart counter for the assigned voice.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Amplitude envelope.
    pub fn amp(&self) -> &Envelope {
        &self.amp
    }

    /// Filter-modulation envelope.
    pub fn filter(&self) -> &Envelope {
        &self.filter
    }

    pub(crate) fn amp_mut(&mut self) -> &mut Envelope {
        &mut self.amp
    }

    pub(crate) fn filter_mut(&mut self) -> &mut Envelope {
        &mut self.filter
    }

    /// Start the release of both envelopes at `time`.
    pub fn release(&mut self, time: f64) {
        self.amp.note_off(time);
        self.filter.note_off(time);
    }

    /// Restart both envelopes at `time` with a new velocity.
    pub fn retrigger(&mut self, time: f64, velocity: f32, generation: u64) {
        self.velocity = velocity.clamp(0.0, 1.0);
        self.amp.retrigger(time);
        self.filter.retrigger(time);
        self.generation = generation;
    }
}
