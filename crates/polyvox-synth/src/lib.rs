//! Polyvox Synth - real-time polyphonic synthesis engine
//!
//! This crate holds everything between a note event and a filled device
//! buffer. The audio thread never allocates, never logs, and never waits on
//! a lock longer than a configured bound.
//!
//! # Core Abstractions
//!
//! ## Notes and Voices
//!
//! - [`NoteRegistry`] - Shared, mutex-guarded set of sounding notes
//! - [`Note`] - Key, velocity, and two envelopes
//! - [`VoiceAllocator`] - Fixed pool of voice slots
//! - [`Envelope`] / [`AdsrParams`] - Timestamp-driven linear ADSR
//!
//! ## Sound Generation
//!
//! - [`oscillator`] - Additive sine, sawtooth, and square, plus noise
//! - [`Instrument`] - Four detuned layers per channel
//! - [`VoiceFilter`] - Per-voice one-pole lowpass
//!
//! ## Rendering
//!
//! - [`Engine`] - Owns the shared state and builds renderers
//! - [`BlockRenderer`] - The audio-callback entry point
//! - [`RenderStrategy`] - Inline or worker-pool voice rendering
//! - [`Visualization`] - Latest waveform and spectrum for a display
//! - [`RenderStats`] - Lock-free render counters
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use polyvox_synth::{Engine, EngineSettings, Instrument, ManualClock};
//!
//! let clock = Arc::new(ManualClock::new());
//! let settings = EngineSettings {
//!     block_size: 256,
//!     ..Default::default()
//! };
//! let engine = Engine::with_clock(settings, clock.clone()).unwrap();
//! engine.registry().set_instrument(Instrument::Saw);
//!
//! let mut renderer = engine.renderer().unwrap();
//! engine.note_on(40, 0.8);
//! engine.note_on(44, 0.8);
//!
//! let mut block = vec![0.0_f32; 256 * 2];
//! for _ in 0..10 {
//!     clock.advance(256.0 / 48000.0);
//!     renderer.render(&mut block);
//! }
//! assert_eq!(renderer.ticks(), 2560);
//! ```

pub mod allocator;
pub mod clock;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod instrument;
pub mod note;
pub mod oscillator;
mod pool;
pub mod registry;
pub mod renderer;
pub mod settings;
pub mod snapshot;
pub mod stats;
pub mod voice;

pub use allocator::VoiceAllocator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Engine;
pub use envelope::{AdsrParams, Envelope, EnvelopePhase, SILENCE_THRESHOLD};
pub use error::{Error, Result};
pub use filter::VoiceFilter;
pub use instrument::{HarmonicCounts, Instrument};
pub use note::Note;
pub use oscillator::DetuneLfo;
pub use pool::RenderStrategy;
pub use registry::{AddOutcome, NoteRegistry, RenderContext};
pub use renderer::BlockRenderer;
pub use settings::{EngineSettings, MAX_VOICES_LIMIT};
pub use snapshot::Visualization;
pub use stats::{RenderStats, StatsSnapshot};
pub use voice::{BlockParams, VoiceJob, VoiceState};
