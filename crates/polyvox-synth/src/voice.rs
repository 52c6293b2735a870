//! Per-voice synthesis kernel.
//!
//! A [`VoiceState`] owns the scratch buffer and filter memory of one voice
//! slot. The renderer fills a [`VoiceJob`] per sounding note under the
//! registry lock, then calls [`VoiceState::render`] (directly or on a pool
//! worker) with the block-wide [`BlockParams`]. Both job types are `Copy`, so
//! handing work to another thread never allocates.

use crate::filter::VoiceFilter;
use crate::instrument::{HarmonicCounts, Instrument};
use crate::oscillator;

/// Block-wide synthesis parameters, identical for every voice.
#[derive(Debug, Clone, Copy)]
pub struct BlockParams {
    /// Frames to render
    pub frames: usize,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Absolute sample position of the first frame
    pub start_tick: u64,
    /// Selected instrument
    pub instrument: Instrument,
    /// Additive waveform partial counts
    pub harmonics: HarmonicCounts,
    /// Detune offset in cents, left channel
    pub detune_left: f32,
    /// Detune offset in cents, right channel
    pub detune_right: f32,
    /// Add noise to every voice
    pub dirty: bool,
    /// Amplitude of the injected noise
    pub noise_amplitude: f32,
    /// Base filter cutoff in Hz
    pub cutoff_hz: f32,
    /// Cutoff offset in Hz at full filter-envelope level
    pub filter_env_amount_hz: f32,
}

/// One sounding note, as captured under the registry lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceJob {
    /// Voice slot to render into
    pub voice: usize,
    /// Note restart counter, used to reset filter memory on a new note
    pub generation: u64,
    /// Key number
    pub key: i32,
    /// Velocity (0.0 to 1.0)
    pub velocity: f32,
    /// Amplitude envelope level for this block
    pub amp_level: f32,
    /// Filter envelope level for this block
    pub filter_level: f32,
}

/// Scratch buffer and filter memory for one voice slot.
#[derive(Debug, Clone)]
pub struct VoiceState {
    buffer: Vec<f32>,
    filter: VoiceFilter,
    generation: u64,
}

impl VoiceState {
    /// Allocate a voice able to render up to `max_frames` stereo frames.
    pub fn new(max_frames: usize, sample_rate: u32) -> Self {
        Self {
            buffer: vec![0.0; max_frames * 2],
            filter: VoiceFilter::new(sample_rate as f32),
            generation: 0,
        }
    }

    /// Interleaved stereo output of the last render.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// Zero the output buffer, keeping filter state.
    pub(crate) fn silence(&mut self) {
        self.buffer.fill(0.0);
    }

    /// Render `params.frames` stereo frames of `job` into the scratch buffer.
    ///
    /// Frames beyond the buffer capacity are dropped.
    pub fn render(&mut self, job: &VoiceJob, params: &BlockParams) {
        if job.generation != self.generation {
            self.filter.reset();
            self.generation = job.generation;
        }

        let frames = params.frames.min(self.buffer.len() / 2);
        let out = &mut self.buffer[..frames * 2];
        let gain = job.amp_level * job.velocity;

        if gain == 0.0 && !params.dirty {
            out.fill(0.0);
            return;
        }

        let (left_freqs, right_freqs) =
            Instrument::layer_frequencies(job.key, params.detune_left, params.detune_right);
        self.filter
            .set_cutoff(params.cutoff_hz + params.filter_env_amount_hz * job.filter_level);

        let sample_rate = f64::from(params.sample_rate);
        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            let time = (params.start_tick + i as u64) as f64 / sample_rate;
            let (left, right) = if gain == 0.0 {
                (0.0, 0.0)
            } else {
                params
                    .instrument
                    .frame(&left_freqs, &right_freqs, time, &params.harmonics)
            };
            let (mut left, mut right) = self.filter.process(left * gain, right * gain);
            if params.dirty {
                left += params.noise_amplitude * oscillator::noise();
                right += params.noise_amplitude * oscillator::noise();
            }
            frame[0] = left;
            frame[1] = right;
        }
    }
}
