//! Shared note registry and render context.
//!
//! [`NoteRegistry`] is the one piece of mutable state shared between the
//! input producer, the control thread, and the audio callback. Notes, the
//! voice allocator, and the render context sit behind a single
//! `parking_lot::Mutex` so every critical section sees them change together.
//! The input and control threads lock normally; the renderer only ever uses a
//! bounded `try_lock_for` and renders silence when it loses the race.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::allocator::VoiceAllocator;
use crate::envelope::AdsrParams;
use crate::instrument::Instrument;
use crate::note::Note;

/// Volume change per [`NoteRegistry::step_volume`] call.
pub const VOLUME_STEP: f32 = 0.05;

/// Stepped volume never leaves `[MIN_STEPPED_VOLUME, MAX_STEPPED_VOLUME]`.
pub const MIN_STEPPED_VOLUME: f32 = 0.05;

/// Upper bound for stepped volume.
pub const MAX_STEPPED_VOLUME: f32 = 0.95;

/// Lowest accepted filter cutoff in Hz.
pub const MIN_CUTOFF_HZ: f32 = 20.0;

/// Highest accepted filter cutoff in Hz. At this value the filter is open.
pub const MAX_CUTOFF_HZ: f32 = 22000.0;

/// Live parameters read by the renderer at the start of every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Master volume (0.0 to 1.0, default 0.1)
    pub volume: f32,
    /// Selected instrument
    pub instrument: Instrument,
    /// Add low-level noise to every voice
    pub dirty: bool,
    /// Run the spectrum analyzer after each block
    pub fft_enabled: bool,
    /// Output silence while still advancing time
    pub muted: bool,
    /// Base voice filter cutoff in Hz (default 22000, filter open)
    pub cutoff_hz: f32,
    /// Cutoff offset in Hz at full filter-envelope level (default 0)
    pub filter_env_amount_hz: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            volume: 0.1,
            instrument: Instrument::default(),
            dirty: false,
            fft_enabled: false,
            muted: false,
            cutoff_hz: MAX_CUTOFF_HZ,
            filter_env_amount_hz: 0.0,
        }
    }
}

/// What [`NoteRegistry::add_note`] did with a note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new note was appended. `voice` is `None` only if the allocator
    /// had no free slot, in which case the renderer skips the note.
    Added {
        /// Assigned voice slot
        voice: Option<usize>,
    },
    /// A released note with the same key restarted its attack.
    Retriggered {
        /// Voice slot the note keeps
        voice: Option<usize>,
    },
    /// The key is already held. Nothing changed.
    AlreadyHeld,
    /// The polyphony cap is reached. The note-on was dropped.
    AtCapacity,
}

pub(crate) struct RegistryState {
    pub(crate) notes: Vec<Note>,
    pub(crate) allocator: VoiceAllocator,
    pub(crate) context: RenderContext,
    generation: u64,
}

/// Insertion-ordered, polyphony-capped collection of sounding notes.
///
/// Shared by `Arc` between threads; all synchronization is internal.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{AddOutcome, AdsrParams, NoteRegistry, RenderContext};
///
/// let registry = NoteRegistry::new(
///     2,
///     AdsrParams::AMPLITUDE,
///     AdsrParams::FILTER,
///     RenderContext::default(),
/// );
/// assert_eq!(registry.add_note(40, 1.0, 0.0), AddOutcome::Added { voice: Some(0) });
/// assert_eq!(registry.add_note(41, 1.0, 0.0), AddOutcome::Added { voice: Some(1) });
/// assert_eq!(registry.add_note(42, 1.0, 0.0), AddOutcome::AtCapacity);
/// assert_eq!(registry.keys(), vec![40, 41]);
/// ```
pub struct NoteRegistry {
    state: Mutex<RegistryState>,
    max_voices: usize,
    amp: AdsrParams,
    filter: AdsrParams,
}

impl NoteRegistry {
    /// Create an empty registry with `max_voices` voice slots.
    pub fn new(
        max_voices: usize,
        amp: AdsrParams,
        filter: AdsrParams,
        context: RenderContext,
    ) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                notes: Vec::with_capacity(max_voices),
                allocator: VoiceAllocator::new(max_voices),
                context,
                generation: 0,
            }),
            max_voices,
            amp,
            filter,
        }
    }

    /// Polyphony cap.
    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Handle a note-on for `key` at `time` seconds.
    ///
    /// Nothing is added once the registry is full, not even a restart of a
    /// released key. Below the cap, a key already in the registry restarts
    /// only if its release has been observed; a repeated note-on for a held
    /// key does nothing.
    ///
    /// Logging happens after the lock is released.
    pub fn add_note(&self, key: i32, velocity: f32, time: f64) -> AddOutcome {
        let outcome = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if state.notes.len() >= self.max_voices {
                AddOutcome::AtCapacity
            } else if let Some(note) = state.notes.iter_mut().find(|n| n.key() == key) {
                note.amp_mut().level(time);
                if note.amp().is_released() {
                    state.generation += 1;
                    note.retrigger(time, velocity, state.generation);
                    AddOutcome::Retriggered {
                        voice: note.voice(),
                    }
                } else {
                    AddOutcome::AlreadyHeld
                }
            } else {
                let voice = state.allocator.allocate().ok();
                state.generation += 1;
                state.notes.push(Note::new(
                    key,
                    velocity,
                    time,
                    self.amp,
                    self.filter,
                    voice,
                    state.generation,
                ));
                AddOutcome::Added { voice }
            }
        };

        match outcome {
            AddOutcome::AtCapacity => {
                tracing::debug!(key, max_voices = self.max_voices, "polyphony cap reached");
            }
            AddOutcome::Retriggered { .. } => {
                tracing::trace!(key, velocity, time, "note retriggered");
            }
            AddOutcome::Added { voice: None } => {
                tracing::warn!(key, "note added without a voice");
            }
            AddOutcome::Added { voice } => {
                tracing::trace!(key, velocity, time, ?voice, "note added");
            }
            AddOutcome::AlreadyHeld => {}
        }
        outcome
    }

    /// Handle a note-off for `key` at `time` seconds.
    ///
    /// The note keeps sounding through its release until pruned. Returns
    /// `false` if the key is not in the registry.
    pub fn remove_note(&self, key: i32, time: f64) -> bool {
        let found = {
            let mut state = self.state.lock();
            state
                .notes
                .iter_mut()
                .find(|n| n.key() == key)
                .map(|note| note.release(time))
                .is_some()
        };
        if found {
            tracing::trace!(key, time, "note released");
        }
        found
    }

    /// Remove every note that has decayed to silence by `now`, freeing its
    /// voice slot. Returns the number of notes removed.
    ///
    /// Notes still at the start of their attack ramp are kept even though
    /// their level reads as zero.
    pub fn prune_released(&self, now: f64) -> usize {
        let mut pruned = Vec::new();
        {
            let mut guard = self.state.lock();
            let RegistryState {
                notes, allocator, ..
            } = &mut *guard;

            notes.retain_mut(|note| {
                if note.amp_mut().has_decayed(now) {
                    if let Some(voice) = note.voice() {
                        allocator.free(voice);
                    }
                    pruned.push(note.key());
                    false
                } else {
                    true
                }
            });
        }

        if !pruned.is_empty() {
            tracing::trace!(?pruned, now, "notes pruned");
        }
        pruned.len()
    }

    /// Release every note at `time`.
    pub fn release_all(&self, time: f64) {
        let mut state = self.state.lock();
        for note in &mut state.notes {
            note.release(time);
        }
    }

    /// Number of notes in the registry.
    pub fn len(&self) -> usize {
        self.state.lock().notes.len()
    }

    /// Whether the registry holds no notes.
    pub fn is_empty(&self) -> bool {
        self.state.lock().notes.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<i32> {
        self.state.lock().notes.iter().map(Note::key).collect()
    }

    /// Voice slot held by `key`, if present and voiced.
    pub fn voice_of(&self, key: i32) -> Option<usize> {
        self.state
            .lock()
            .notes
            .iter()
            .find(|n| n.key() == key)
            .and_then(Note::voice)
    }

    /// Whether voice slot `index` is free.
    pub fn is_voice_free(&self, index: usize) -> bool {
        self.state.lock().allocator.is_free(index)
    }

    /// Number of free voice slots.
    pub fn free_voices(&self) -> usize {
        self.state.lock().allocator.free_count()
    }

    /// Copy of the current render context.
    pub fn context(&self) -> RenderContext {
        self.state.lock().context
    }

    /// Set master volume, clamped to `[0, 1]`.
    pub fn set_volume(&self, volume: f32) {
        self.state.lock().context.volume = volume.clamp(0.0, 1.0);
    }

    /// Nudge the volume up or down by [`VOLUME_STEP`] and return the result.
    pub fn step_volume(&self, up: bool) -> f32 {
        let delta = if up { VOLUME_STEP } else { -VOLUME_STEP };
        let volume = self.update_context(|ctx| {
            ctx.volume = (ctx.volume + delta).clamp(MIN_STEPPED_VOLUME, MAX_STEPPED_VOLUME);
            ctx.volume
        });
        tracing::debug!(volume, "volume");
        volume
    }

    /// Select the instrument.
    pub fn set_instrument(&self, instrument: Instrument) {
        self.state.lock().context.instrument = instrument;
    }

    /// Enable or disable noise injection.
    pub fn set_dirty(&self, dirty: bool) {
        self.state.lock().context.dirty = dirty;
    }

    /// Flip noise injection and return the new state.
    pub fn toggle_dirty(&self) -> bool {
        let mut state = self.state.lock();
        state.context.dirty = !state.context.dirty;
        state.context.dirty
    }

    /// Enable or disable spectrum analysis.
    pub fn set_fft_enabled(&self, enabled: bool) {
        self.state.lock().context.fft_enabled = enabled;
    }

    /// Mute or unmute the output.
    pub fn set_muted(&self, muted: bool) {
        self.state.lock().context.muted = muted;
    }

    /// Flip mute and return the new state.
    pub fn toggle_muted(&self) -> bool {
        let mut state = self.state.lock();
        state.context.muted = !state.context.muted;
        state.context.muted
    }

    /// Set the base filter cutoff, clamped to `[MIN_CUTOFF_HZ, MAX_CUTOFF_HZ]`.
    pub fn set_cutoff_hz(&self, cutoff_hz: f32) {
        self.state.lock().context.cutoff_hz = cutoff_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
    }

    /// Move the base cutoff by `delta_hz` and return the result.
    pub fn step_cutoff(&self, delta_hz: f32) -> f32 {
        let cutoff = self.update_context(|ctx| {
            ctx.cutoff_hz = (ctx.cutoff_hz + delta_hz).clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
            ctx.cutoff_hz
        });
        tracing::debug!(cutoff, "filter cutoff");
        cutoff
    }

    /// Set how far the filter envelope pushes the cutoff, clamped to
    /// `[-MAX_CUTOFF_HZ, MAX_CUTOFF_HZ]`. A non-finite amount disables the
    /// envelope.
    pub fn set_filter_env_amount_hz(&self, amount_hz: f32) {
        let amount_hz = if amount_hz.is_finite() {
            amount_hz.clamp(-MAX_CUTOFF_HZ, MAX_CUTOFF_HZ)
        } else {
            0.0
        };
        self.state.lock().context.filter_env_amount_hz = amount_hz;
    }

    /// Apply several context changes in one critical section.
    ///
    /// The renderer sees either none or all of the changes made by `f`.
    pub fn update_context<R>(&self, f: impl FnOnce(&mut RenderContext) -> R) -> R {
        f(&mut self.state.lock().context)
    }

    pub(crate) fn try_lock_for(
        &self,
        timeout: Duration,
    ) -> Option<MutexGuard<'_, RegistryState>> {
        self.state.try_lock_for(timeout)
    }
}

impl std::fmt::Debug for NoteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteRegistry")
            .field("max_voices", &self.max_voices)
            .field("amp", &self.amp)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
