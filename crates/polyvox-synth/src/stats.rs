//! Lock-free render counters.
//!
//! The audio thread must not log, so it bumps relaxed atomics instead and
//! the control thread reads a [`StatsSnapshot`] whenever it wants to report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated by the renderer.
#[derive(Debug, Default)]
pub struct RenderStats {
    blocks: AtomicU64,
    frames: AtomicU64,
    lock_misses: AtomicU64,
    skipped_notes: AtomicU64,
    snapshot_skips: AtomicU64,
    analysis_errors: AtomicU64,
    last_block_nanos: AtomicU64,
    max_block_nanos: AtomicU64,
}

/// Point-in-time copy of [`RenderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Blocks rendered
    pub blocks: u64,
    /// Frames rendered
    pub frames: u64,
    /// Blocks rendered silent because the registry lock was busy
    pub lock_misses: u64,
    /// Note-blocks skipped for want of a voice
    pub skipped_notes: u64,
    /// Snapshots not published because a reader held the buffer
    pub snapshot_skips: u64,
    /// Spectrum analyses that failed
    pub analysis_errors: u64,
    /// Wall time of the most recent block, in nanoseconds
    pub last_block_nanos: u64,
    /// Worst block wall time since the last reset, in nanoseconds
    pub max_block_nanos: u64,
}

impl RenderStats {
    /// Read every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks: self.blocks.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            lock_misses: self.lock_misses.load(Ordering::Relaxed),
            skipped_notes: self.skipped_notes.load(Ordering::Relaxed),
            snapshot_skips: self.snapshot_skips.load(Ordering::Relaxed),
            analysis_errors: self.analysis_errors.load(Ordering::Relaxed),
            last_block_nanos: self.last_block_nanos.load(Ordering::Relaxed),
            max_block_nanos: self.max_block_nanos.load(Ordering::Relaxed),
        }
    }

    /// Forget the worst-case block time.
    pub fn reset_max(&self) {
        self.max_block_nanos.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_block(&self, frames: usize, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.blocks.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
        self.last_block_nanos.store(nanos, Ordering::Relaxed);
        self.max_block_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    pub(crate) fn lock_miss(&self) {
        self.lock_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skipped_note(&self) {
        self.skipped_notes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_skip(&self) {
        self.snapshot_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn analysis_error(&self) {
        self.analysis_errors.fetch_add(1, Ordering::Relaxed);
    }
}

impl StatsSnapshot {
    /// Counter deltas since `earlier`. Timing fields keep the current values.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            blocks: self.blocks.saturating_sub(earlier.blocks),
            frames: self.frames.saturating_sub(earlier.frames),
            lock_misses: self.lock_misses.saturating_sub(earlier.lock_misses),
            skipped_notes: self.skipped_notes.saturating_sub(earlier.skipped_notes),
            snapshot_skips: self.snapshot_skips.saturating_sub(earlier.snapshot_skips),
            analysis_errors: self.analysis_errors.saturating_sub(earlier.analysis_errors),
            ..*self
        }
    }

    /// Most recent block time in milliseconds.
    pub fn last_block_ms(&self) -> f64 {
        self.last_block_nanos as f64 / 1e6
    }

    /// Worst block time in milliseconds.
    pub fn max_block_ms(&self) -> f64 {
        self.max_block_nanos as f64 / 1e6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = RenderStats::default();
        stats.record_block(512, Duration::from_micros(300));
        stats.record_block(512, Duration::from_micros(100));
        stats.lock_miss();
        stats.skipped_note();

        let snap = stats.snapshot();
        assert_eq!(snap.blocks, 2);
        assert_eq!(snap.frames, 1024);
        assert_eq!(snap.last_block_nanos, 100_000);
        assert_eq!(snap.max_block_nanos, 300_000);
        assert_eq!(snap.lock_misses, 1);
        assert_eq!(snap.skipped_notes, 1);
        assert!((snap.max_block_ms() - 0.3).abs() < 1e-9);

        stats.reset_max();
        assert_eq!(stats.snapshot().max_block_nanos, 0);
    }

    #[test]
    fn test_since() {
        let stats = RenderStats::default();
        stats.record_block(256, Duration::from_micros(50));
        let first = stats.snapshot();
        stats.record_block(256, Duration::from_micros(70));
        stats.record_block(256, Duration::from_micros(60));

        let delta = stats.snapshot().since(&first);
        assert_eq!(delta.blocks, 2);
        assert_eq!(delta.frames, 512);
        assert_eq!(delta.last_block_nanos, 60_000);
    }
}
