//! The audio-callback entry point.
//!
//! [`BlockRenderer::render`] is called from the device thread for every
//! buffer the device wants. Each block goes through the same fixed sequence:
//!
//! 1. `try_lock_for` the registry (bounded); on timeout, output silence
//! 2. evaluate both envelopes of every note once at the block's `now` and
//!    copy a [`VoiceJob`] per voiced note, then release the lock
//! 3. synthesize the jobs, inline or on the worker pool
//! 4. sum the voices, apply master volume, write the device buffer
//! 5. publish the post-mix block to the waveform snapshot
//! 6. advance the tick counter
//! 7. optionally run the spectrum analyzer and publish magnitudes
//!
//! Every buffer is sized at construction. Nothing in this path allocates,
//! logs, or waits without a bound; failures are counted in [`RenderStats`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use polyvox_analysis::SpectrumAnalyzer;

use crate::clock::Clock;
use crate::instrument::HarmonicCounts;
use crate::oscillator::DetuneLfo;
use crate::pool::{RenderStrategy, Task, VoicePool};
use crate::registry::{NoteRegistry, RenderContext};
use crate::settings::EngineSettings;
use crate::snapshot::Visualization;
use crate::stats::RenderStats;
use crate::voice::{BlockParams, VoiceJob, VoiceState};
use crate::Result;

/// Renders interleaved audio blocks from the shared note registry.
///
/// Built by [`Engine::renderer`](crate::Engine::renderer). One renderer per
/// output stream: it owns the tick counter and every voice buffer.
pub struct BlockRenderer {
    registry: Arc<NoteRegistry>,
    clock: Arc<dyn Clock>,
    visualization: Arc<Visualization>,
    stats: Arc<RenderStats>,

    sample_rate: u32,
    channels: usize,
    block_size: usize,
    harmonics: HarmonicCounts,
    detune: DetuneLfo,
    noise_amplitude: f32,
    lock_timeout: Duration,
    strategy: RenderStrategy,

    ticks: u64,
    jobs: Vec<VoiceJob>,
    voices: Vec<Option<VoiceState>>,
    mix: Vec<f32>,
    analysis_input: Vec<f32>,
    magnitudes: Vec<f32>,
    analyzer: SpectrumAnalyzer,
    pool: Option<VoicePool>,
}

impl BlockRenderer {
    pub(crate) fn new(
        settings: &EngineSettings,
        registry: Arc<NoteRegistry>,
        clock: Arc<dyn Clock>,
        visualization: Arc<Visualization>,
        stats: Arc<RenderStats>,
    ) -> Result<Self> {
        let block_size = settings.block_size;
        let max_voices = settings.max_voices;

        let analyzer = SpectrumAnalyzer::new(block_size, settings.spectrum_bins)?
            .with_window(settings.spectrum_window);
        let pool = match settings.strategy {
            RenderStrategy::Sequential => None,
            RenderStrategy::Pool { workers } => Some(VoicePool::new(workers, max_voices)?),
        };

        Ok(Self {
            registry,
            clock,
            visualization,
            stats,
            sample_rate: settings.sample_rate,
            channels: usize::from(settings.channels.max(1)),
            block_size,
            harmonics: settings.harmonics,
            detune: settings.detune,
            noise_amplitude: settings.noise_amplitude,
            lock_timeout: settings.lock_timeout,
            strategy: settings.strategy,
            ticks: 0,
            jobs: Vec::with_capacity(max_voices),
            voices: (0..max_voices)
                .map(|_| Some(VoiceState::new(block_size, settings.sample_rate)))
                .collect(),
            mix: vec![0.0; block_size * 2],
            analysis_input: vec![0.0; block_size],
            magnitudes: vec![0.0; analyzer.bins()],
            analyzer,
            pool,
        })
    }

    /// Fill `output` with as many whole frames as it holds.
    pub fn render(&mut self, output: &mut [f32]) {
        let frames = output.len() / self.channels;
        self.render_block(output, frames);
    }

    /// Render `frames` interleaved frames into the front of `output`.
    ///
    /// Requests larger than the block size are split into consecutive
    /// blocks. Frames that do not fit `output` are not rendered, and any
    /// samples past the rendered frames are zeroed.
    pub fn render_block(&mut self, output: &mut [f32], frames: usize) {
        let frames = frames.min(output.len() / self.channels);
        let (used, rest) = output.split_at_mut(frames * self.channels);
        rest.fill(0.0);

        for chunk in used.chunks_mut(self.block_size * self.channels) {
            let chunk_frames = chunk.len() / self.channels;
            self.render_one(chunk, chunk_frames);
        }
    }

    /// Samples rendered since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved output channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Largest block rendered in one pass, in frames.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Voice rendering strategy.
    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    fn render_one(&mut self, out: &mut [f32], frames: usize) {
        let started = Instant::now();
        let now = self.clock.now();

        let Some(context) = self.capture_jobs(now) else {
            out.fill(0.0);
            self.stats.lock_miss();
            self.ticks += frames as u64;
            self.stats.record_block(frames, started.elapsed());
            return;
        };

        let block_time = self.ticks as f64 / f64::from(self.sample_rate);
        let (detune_left, detune_right) = self.detune.offsets(block_time);
        let params = BlockParams {
            frames,
            sample_rate: self.sample_rate,
            start_tick: self.ticks,
            instrument: context.instrument,
            harmonics: self.harmonics,
            detune_left,
            detune_right,
            dirty: context.dirty,
            noise_amplitude: self.noise_amplitude,
            cutoff_hz: context.cutoff_hz,
            filter_env_amount_hz: context.filter_env_amount_hz,
        };

        self.synthesize(&params);
        self.mix_down(frames, &context);
        self.write_output(out, frames);

        if !self.visualization.try_publish_waveform(&self.mix[..frames * 2]) {
            self.stats.snapshot_skip();
        }

        self.ticks += frames as u64;

        if context.fft_enabled {
            self.analyze(frames);
        }

        self.stats.record_block(frames, started.elapsed());
    }

    /// Step 2: snapshot the registry under a bounded lock.
    fn capture_jobs(&mut self, now: f64) -> Option<RenderContext> {
        let mut guard = self.registry.try_lock_for(self.lock_timeout)?;
        let state = &mut *guard;

        self.jobs.clear();
        for note in &mut state.notes {
            let amp_level = note.amp_mut().level(now);
            let filter_level = note.filter_mut().level(now);
            let Some(voice) = note.voice() else {
                self.stats.skipped_note();
                continue;
            };
            if self.jobs.len() == self.jobs.capacity() {
                self.stats.skipped_note();
                continue;
            }
            self.jobs.push(VoiceJob {
                voice,
                generation: note.generation(),
                key: note.key(),
                velocity: note.velocity(),
                amp_level,
                filter_level,
            });
        }
        Some(state.context)
    }

    /// Step 3: fill each job's voice buffer.
    fn synthesize(&mut self, params: &BlockParams) {
        let Some(pool) = &self.pool else {
            for job in &self.jobs {
                match self.voices.get_mut(job.voice).and_then(Option::as_mut) {
                    Some(voice) => voice.render(job, params),
                    None => self.stats.skipped_note(),
                }
            }
            return;
        };

        // Tasks that missed an earlier block's deadline come home silent
        while let Some(mut task) = pool.try_collect() {
            task.voice.silence();
            self.voices[task.job.voice] = Some(task.voice);
        }

        let mut pending = 0usize;
        for job in &self.jobs {
            let Some(voice) = self.voices.get_mut(job.voice).and_then(Option::take) else {
                self.stats.skipped_note();
                continue;
            };
            let task = Task {
                job: *job,
                params: *params,
                voice,
            };
            match pool.submit(task) {
                Ok(()) => pending += 1,
                Err(mut task) => {
                    task.voice.render(&task.job, &task.params);
                    self.voices[task.job.voice] = Some(task.voice);
                }
            }
        }

        // Wait no longer than the block lasts in real time. A voice that
        // misses the deadline leaves its slot empty and is not mixed.
        let deadline = Instant::now() + block_duration(params.frames, params.sample_rate);
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(mut task) = pool.collect(remaining) else {
                break;
            };
            if task.params.start_tick == params.start_tick {
                pending -= 1;
            } else {
                task.voice.silence();
            }
            self.voices[task.job.voice] = Some(task.voice);
        }
        for _ in 0..pending {
            self.stats.skipped_note();
        }
    }

    /// Step 4: sum voices into the stereo mix buffer and apply volume.
    fn mix_down(&mut self, frames: usize, context: &RenderContext) {
        let mix = &mut self.mix[..frames * 2];
        mix.fill(0.0);

        for job in &self.jobs {
            if let Some(voice) = self.voices.get(job.voice).and_then(Option::as_ref) {
                for (m, &s) in mix.iter_mut().zip(voice.buffer()) {
                    *m += s;
                }
            }
        }

        let gain = if context.muted { 0.0 } else { context.volume };
        for m in mix.iter_mut() {
            *m *= gain;
        }
    }

    fn write_output(&self, out: &mut [f32], frames: usize) {
        let mix = &self.mix[..frames * 2];
        match self.channels {
            1 => {
                for (o, frame) in out.iter_mut().zip(mix.chunks_exact(2)) {
                    *o = 0.5 * (frame[0] + frame[1]);
                }
            }
            2 => out.copy_from_slice(mix),
            n => {
                for (o, frame) in out.chunks_exact_mut(n).zip(mix.chunks_exact(2)) {
                    o[0] = frame[0];
                    o[1] = frame[1];
                    o[2..].fill(0.0);
                }
            }
        }
    }

    /// Step 7: left-channel spectrum of the block just rendered.
    fn analyze(&mut self, frames: usize) {
        for (dst, frame) in self.analysis_input[..frames]
            .iter_mut()
            .zip(self.mix.chunks_exact(2))
        {
            *dst = frame[0];
        }

        match self
            .analyzer
            .analyze(&self.analysis_input[..frames], &mut self.magnitudes)
        {
            Ok(bins) => {
                if !self
                    .visualization
                    .try_publish_spectrum(&self.magnitudes[..bins])
                {
                    self.stats.snapshot_skip();
                }
            }
            Err(_) => self.stats.analysis_error(),
        }
    }
}

impl std::fmt::Debug for BlockRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRenderer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("block_size", &self.block_size)
            .field("strategy", &self.strategy)
            .field("workers", &self.pool.as_ref().map(VoicePool::workers))
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

/// Real-time length of `frames` samples.
fn block_duration(frames: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::envelope::AdsrParams;
    use crate::instrument::Instrument;

    fn renderer(
        settings: &EngineSettings,
        clock: Arc<ManualClock>,
    ) -> (BlockRenderer, Arc<NoteRegistry>) {
        let registry = Arc::new(NoteRegistry::new(
            settings.max_voices,
            settings.amp_envelope,
            settings.filter_envelope,
            settings.context,
        ));
        let vis = Arc::new(Visualization::new(settings.block_size * 2, settings.spectrum_bins));
        let r = BlockRenderer::new(
            settings,
            Arc::clone(&registry),
            clock,
            vis,
            Arc::new(RenderStats::default()),
        )
        .unwrap();
        (r, registry)
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            block_size: 64,
            max_voices: 4,
            context: RenderContext {
                volume: 1.0,
                ..RenderContext::default()
            },
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_silence_without_notes() {
        let (mut r, _) = renderer(&settings(), Arc::new(ManualClock::new()));
        let mut out = vec![1.0; 128];
        r.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(r.ticks(), 64);
    }

    #[test]
    fn test_large_request_is_split() {
        let (mut r, _) = renderer(&settings(), Arc::new(ManualClock::new()));
        let mut out = vec![0.0; 2 * 200];
        r.render(&mut out);
        assert_eq!(r.ticks(), 200);
        assert_eq!(r.stats.snapshot().blocks, 4);
    }

    #[test]
    fn test_short_output_zeroes_tail() {
        let (mut r, _) = renderer(&settings(), Arc::new(ManualClock::new()));
        // Odd sample count: last sample is not a whole frame
        let mut out = vec![1.0; 9];
        r.render(&mut out);
        assert_eq!(r.ticks(), 4);
        assert_eq!(out[8], 0.0);
    }

    #[test]
    fn test_mix_is_sum_of_voices_times_volume() {
        let clock = Arc::new(ManualClock::new());
        let mut s = settings();
        s.detune = DetuneLfo {
            left_cents: 0.0,
            right_cents: 0.0,
            ..DetuneLfo::default()
        };
        s.context.volume = 0.5;
        let (mut r, reg) = renderer(&s, Arc::clone(&clock));

        reg.add_note(49, 1.0, 0.0);
        clock.set(1.0); // sustain: level 0.8
        let mut out = vec![0.0; 128];
        r.render(&mut out);

        for i in 0..64 {
            let t = i as f64 / 48000.0;
            let expected = 0.5 * 0.8 * 4.0 * crate::oscillator::sine(440.0, t);
            assert!((out[2 * i] - expected).abs() < 1e-4, "frame {i}");
        }
    }

    #[test]
    fn test_envelope_sampled_once_per_block() {
        let clock = Arc::new(ManualClock::new());
        let mut s = settings();
        s.detune = DetuneLfo {
            left_cents: 0.0,
            right_cents: 0.0,
            ..DetuneLfo::default()
        };
        let (mut r, reg) = renderer(&s, Arc::clone(&clock));
        reg.add_note(49, 1.0, 0.0);
        clock.set(0.075);

        let mut out = vec![0.0; 128];
        r.render(&mut out);
        // Constant gain across the block: ratio to the raw oscillator is flat
        let mut ratios = Vec::new();
        for i in 0..64 {
            let raw = 4.0 * crate::oscillator::sine(440.0, i as f64 / 48000.0);
            if raw.abs() > 0.5 {
                ratios.push(out[2 * i] / raw);
            }
        }
        assert!(!ratios.is_empty());
        for ratio in &ratios {
            assert!((ratio - 0.5).abs() < 1e-3, "gain should be 0.5, got {ratio}");
        }
    }

    #[test]
    fn test_muted_outputs_silence_and_advances() {
        let clock = Arc::new(ManualClock::new());
        let (mut r, reg) = renderer(&settings(), Arc::clone(&clock));
        reg.add_note(40, 1.0, 0.0);
        reg.set_muted(true);
        clock.set(1.0);
        let mut out = vec![1.0; 128];
        r.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(r.ticks(), 64);
    }

    #[test]
    fn test_lock_miss_renders_silence() {
        let clock = Arc::new(ManualClock::new());
        let mut s = settings();
        s.lock_timeout = Duration::from_micros(10);
        let (mut r, reg) = renderer(&s, Arc::clone(&clock));
        reg.add_note(40, 1.0, 0.0);
        clock.set(1.0);

        let guard = reg.try_lock_for(Duration::from_millis(10)).unwrap();
        let mut out = vec![1.0; 128];
        r.render(&mut out);
        drop(guard);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(r.ticks(), 64);
        assert_eq!(r.stats.snapshot().lock_misses, 1);
    }

    #[test]
    fn test_mono_and_multichannel_layouts() {
        let clock = Arc::new(ManualClock::new());
        let mut stereo_settings = settings();
        stereo_settings.context.instrument = Instrument::SawSquare;
        let (mut stereo, reg_a) = renderer(&stereo_settings, Arc::clone(&clock));
        let (mut mono, reg_b) = renderer(
            &EngineSettings {
                channels: 1,
                ..stereo_settings.clone()
            },
            Arc::clone(&clock),
        );
        let (mut quad, reg_c) = renderer(
            &EngineSettings {
                channels: 4,
                ..stereo_settings.clone()
            },
            Arc::clone(&clock),
        );
        for reg in [&reg_a, &reg_b, &reg_c] {
            reg.add_note(45, 1.0, 0.0);
        }
        clock.set(1.0);

        let mut s_out = vec![0.0; 128];
        let mut m_out = vec![0.0; 64];
        let mut q_out = vec![0.0; 256];
        stereo.render(&mut s_out);
        mono.render(&mut m_out);
        quad.render(&mut q_out);

        for i in 0..64 {
            let (l, r) = (s_out[2 * i], s_out[2 * i + 1]);
            assert!((m_out[i] - 0.5 * (l + r)).abs() < 1e-6);
            assert_eq!(q_out[4 * i], l);
            assert_eq!(q_out[4 * i + 1], r);
            assert_eq!(q_out[4 * i + 2], 0.0);
            assert_eq!(q_out[4 * i + 3], 0.0);
        }
    }

    #[test]
    fn test_pool_matches_sequential() {
        let clock = Arc::new(ManualClock::new());
        let mut seq_settings = settings();
        seq_settings.context.instrument = Instrument::Saw;
        seq_settings.block_size = 2048;
        let pool_settings = EngineSettings {
            strategy: RenderStrategy::Pool { workers: 2 },
            ..seq_settings.clone()
        };
        let (mut seq, reg_a) = renderer(&seq_settings, Arc::clone(&clock));
        let (mut pooled, reg_b) = renderer(&pool_settings, Arc::clone(&clock));
        for key in [40, 44, 47] {
            reg_a.add_note(key, 0.9, 0.0);
            reg_b.add_note(key, 0.9, 0.0);
        }

        let mut a = vec![0.0; 4096];
        let mut b = vec![0.0; 4096];
        for block in 0..5 {
            clock.set(0.05 * block as f64);
            seq.render(&mut a);
            pooled.render(&mut b);
            assert_eq!(a, b, "block {block}");
        }
    }

    #[test]
    fn test_late_pool_task_is_reclaimed_silent() {
        let clock = Arc::new(ManualClock::new());
        let s = EngineSettings {
            block_size: 2048,
            strategy: RenderStrategy::Pool { workers: 1 },
            ..settings()
        };
        let (mut r, reg) = renderer(&s, Arc::clone(&clock));
        reg.add_note(40, 1.0, 0.0);
        clock.set(1.0);

        // Voice 0 is still out on a worker from a block that stopped waiting
        let voice = r.voices[0].take().unwrap();
        let task = Task {
            job: VoiceJob {
                voice: 0,
                generation: 1,
                key: 40,
                velocity: 1.0,
                amp_level: 1.0,
                filter_level: 0.0,
            },
            params: BlockParams {
                frames: 2048,
                sample_rate: 48000,
                start_tick: u64::MAX,
                instrument: Instrument::Sine,
                harmonics: HarmonicCounts::default(),
                detune_left: 0.0,
                detune_right: 0.0,
                dirty: false,
                noise_amplitude: 0.0,
                cutoff_hz: 22000.0,
                filter_env_amount_hz: 0.0,
            },
            voice,
        };
        let pool = r.pool.as_ref().unwrap();
        assert!(pool.submit(task).is_ok());
        let waited = Instant::now();
        while pool.finished() == 0 {
            assert!(waited.elapsed() < Duration::from_secs(5), "worker never finished");
            std::thread::yield_now();
        }

        let mut out = vec![0.0; 4096];
        r.render(&mut out);
        assert!(r.voices[0].is_some());
        assert_eq!(r.stats.snapshot().skipped_notes, 0);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_spectrum_published_when_enabled() {
        let clock = Arc::new(ManualClock::new());
        let mut s = settings();
        s.block_size = 256;
        s.spectrum_bins = 128;
        s.detune = DetuneLfo {
            left_cents: 0.0,
            right_cents: 0.0,
            ..DetuneLfo::default()
        };
        s.context.fft_enabled = true;
        let (mut r, reg) = renderer(&s, Arc::clone(&clock));

        // Key 49 is 440 Hz: bin 440 / (48000 / 256) = 2.35, nearest bin 2
        reg.add_note(49, 1.0, 0.0);
        clock.set(1.0);
        let mut out = vec![0.0; 512];
        r.render(&mut out);

        let mut mags = Vec::new();
        assert_eq!(r.visualization.copy_spectrum(&mut mags), 1);
        assert_eq!(mags.len(), 128);
        assert_eq!(polyvox_analysis::spectrum::peak_bin(&mags), Some(2));
    }

    #[test]
    fn test_spectrum_not_run_when_disabled() {
        let (mut r, _) = renderer(&settings(), Arc::new(ManualClock::new()));
        let mut out = vec![0.0; 128];
        r.render(&mut out);
        assert_eq!(r.visualization.spectrum_sequence(), 0);
        assert_eq!(r.visualization.waveform_sequence(), 1);
    }

    #[test]
    fn test_partial_block_counts_analysis_error() {
        let mut s = settings();
        s.context.fft_enabled = true;
        let (mut r, _) = renderer(&s, Arc::new(ManualClock::new()));
        let mut out = vec![0.0; 2 * 100];
        r.render(&mut out);
        // 64-frame block analyzed, trailing 36-frame block is not a power of two
        let stats = r.stats.snapshot();
        assert_eq!(stats.analysis_errors, 1);
        assert_eq!(r.visualization.spectrum_sequence(), 1);
    }

    #[test]
    fn test_unvoiced_note_is_skipped() {
        let clock = Arc::new(ManualClock::new());
        let (mut r, reg) = renderer(&settings(), Arc::clone(&clock));
        reg.add_note(40, 1.0, 0.0);
        {
            let mut state = reg.try_lock_for(Duration::from_millis(10)).unwrap();
            state.notes.push(crate::note::Note::new(
                41,
                1.0,
                0.0,
                AdsrParams::AMPLITUDE,
                AdsrParams::FILTER,
                None,
                99,
            ));
        }
        clock.set(1.0);
        let mut out = vec![0.0; 128];
        r.render(&mut out);
        assert_eq!(r.stats.snapshot().skipped_notes, 1);
        assert!(out.iter().any(|&s| s != 0.0), "voiced note still sounds");
    }
}
