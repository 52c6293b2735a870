//! Visualizer-facing snapshot buffers.
//!
//! The renderer publishes the post-mix block and the spectrum magnitudes
//! into [`Visualization`]; a visualizer copies them out at its own cadence.
//! Each buffer sits behind its own mutex. The audio thread only `try_lock`s:
//! if the visualizer is mid-copy, that block's snapshot is skipped rather
//! than waited for. Readers therefore always see a complete block, never a
//! half-written one.

use parking_lot::Mutex;

#[derive(Debug)]
struct Snapshot {
    data: Vec<f32>,
    len: usize,
    sequence: u64,
}

impl Snapshot {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            len: 0,
            sequence: 0,
        }
    }

    fn store(&mut self, samples: &[f32]) {
        let n = samples.len().min(self.data.len());
        self.data[..n].copy_from_slice(&samples[..n]);
        self.len = n;
        self.sequence += 1;
    }

    fn copy_into(&self, out: &mut Vec<f32>) -> u64 {
        out.clear();
        out.extend_from_slice(&self.data[..self.len]);
        self.sequence
    }
}

/// Latest waveform and spectrum, shared between renderer and visualizer.
#[derive(Debug)]
pub struct Visualization {
    waveform: Mutex<Snapshot>,
    spectrum: Mutex<Snapshot>,
}

impl Visualization {
    /// Create empty snapshots.
    ///
    /// `waveform_capacity` is in samples (interleaved stereo), and
    /// `spectrum_capacity` is in bins.
    pub fn new(waveform_capacity: usize, spectrum_capacity: usize) -> Self {
        Self {
            waveform: Mutex::new(Snapshot::with_capacity(waveform_capacity)),
            spectrum: Mutex::new(Snapshot::with_capacity(spectrum_capacity)),
        }
    }

    /// Copy the latest post-mix block (interleaved stereo) into `out`.
    ///
    /// Returns the block sequence number; 0 means nothing published yet.
    pub fn copy_waveform(&self, out: &mut Vec<f32>) -> u64 {
        self.waveform.lock().copy_into(out)
    }

    /// Copy the latest spectrum magnitudes into `out`.
    ///
    /// Returns the spectrum sequence number; 0 means nothing published yet.
    pub fn copy_spectrum(&self, out: &mut Vec<f32>) -> u64 {
        self.spectrum.lock().copy_into(out)
    }

    /// Sequence number of the latest waveform.
    pub fn waveform_sequence(&self) -> u64 {
        self.waveform.lock().sequence
    }

    /// Sequence number of the latest spectrum.
    pub fn spectrum_sequence(&self) -> u64 {
        self.spectrum.lock().sequence
    }

    /// Publish a waveform without waiting. Returns `false` if a reader held
    /// the buffer.
    pub(crate) fn try_publish_waveform(&self, samples: &[f32]) -> bool {
        match self.waveform.try_lock() {
            Some(mut snapshot) => {
                snapshot.store(samples);
                true
            }
            None => false,
        }
    }

    /// Publish spectrum magnitudes without waiting.
    pub(crate) fn try_publish_spectrum(&self, magnitudes: &[f32]) -> bool {
        match self.spectrum.try_lock() {
            Some(mut snapshot) => {
                snapshot.store(magnitudes);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_published() {
        let vis = Visualization::new(8, 4);
        let mut out = vec![1.0; 3];
        assert_eq!(vis.copy_waveform(&mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_publish_and_copy() {
        let vis = Visualization::new(8, 4);
        assert!(vis.try_publish_waveform(&[0.1, 0.2, 0.3, 0.4]));
        assert!(vis.try_publish_waveform(&[0.5, 0.6]));

        let mut out = Vec::new();
        assert_eq!(vis.copy_waveform(&mut out), 2);
        assert_eq!(out, vec![0.5, 0.6]);
    }

    #[test]
    fn test_oversized_publish_is_truncated() {
        let vis = Visualization::new(8, 2);
        assert!(vis.try_publish_spectrum(&[1.0, 2.0, 3.0]));
        let mut out = Vec::new();
        assert_eq!(vis.copy_spectrum(&mut out), 1);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn test_publish_skips_while_reader_holds_lock() {
        let vis = Visualization::new(4, 4);
        let guard = vis.waveform.lock();
        assert!(!vis.try_publish_waveform(&[1.0]));
        drop(guard);
        assert!(vis.try_publish_waveform(&[1.0]));
        assert_eq!(vis.waveform_sequence(), 1);
    }
}
