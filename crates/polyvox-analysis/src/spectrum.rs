//! Magnitude spectra for display.
//!
//! [`SpectrumAnalyzer`] owns a [`Radix2Fft`] plus every scratch buffer it
//! needs, so [`SpectrumAnalyzer::analyze`] can run once per audio block
//! without touching the allocator. Magnitudes are scaled by `2 / N`, which maps
//! a full-scale sinusoid centred on a bin to a magnitude of 1.0.

use crate::{Complex, Radix2Fft, Result};

/// Window applied to the block before the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Window {
    /// No windowing. Bin-centred tones stay perfectly sharp.
    #[default]
    Rectangular,
    /// Hann window (raised cosine). Trades main-lobe width for less leakage.
    Hann,
}

impl Window {
    /// Window coefficients for `size` points.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        match self {
            Window::Rectangular => vec![1.0; size],
            Window::Hann => (0..size)
                .map(|i| {
                    let x = std::f32::consts::TAU * i as f32 / size as f32;
                    0.5 * (1.0 - x.cos())
                })
                .collect(),
        }
    }
}

/// FFT-based magnitude analyzer with a fixed size and display bin count.
#[derive(Debug, Clone)]
pub struct SpectrumAnalyzer {
    fft: Radix2Fft,
    bins: usize,
    window: Window,
    coefficients: Vec<f32>,
    windowed: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    normalization: f32,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for `fft_size`-point blocks.
    ///
    /// `bins` is the number of display bins produced per call, capped at
    /// `fft_size / 2` (the bins below Nyquist).
    pub fn new(fft_size: usize, bins: usize) -> Result<Self> {
        let fft = Radix2Fft::new(fft_size)?;
        let window = Window::default();
        Ok(Self {
            fft,
            bins: bins.min(fft_size / 2),
            window,
            coefficients: window.coefficients(fft_size),
            windowed: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            normalization: 2.0 / fft_size as f32,
        })
    }

    /// Builder-style window selection.
    pub fn with_window(mut self, window: Window) -> Self {
        self.set_window(window);
        self
    }

    /// Change the analysis window. Allocates; not for the audio thread.
    pub fn set_window(&mut self, window: Window) {
        self.window = window;
        self.coefficients = window.coefficients(self.fft.size());
    }

    /// Active analysis window.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Transform size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Number of display bins produced per call.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Centre frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.fft.size() as f32
    }

    /// Analyze one block of samples.
    ///
    /// `input` must be exactly [`fft_size`](Self::fft_size) samples. Writes
    /// `min(bins, magnitudes.len())` magnitudes and returns that count.
    pub fn analyze(&mut self, input: &[f32], magnitudes: &mut [f32]) -> Result<usize> {
        if input.len() != self.windowed.len() {
            return Err(crate::Error::LengthMismatch {
                expected: self.windowed.len(),
                actual: input.len(),
            });
        }

        for ((w, &x), &c) in self
            .windowed
            .iter_mut()
            .zip(input)
            .zip(&self.coefficients)
        {
            *w = x * c;
        }

        self.fft.process_real(&self.windowed, &mut self.spectrum)?;

        let count = self.bins.min(magnitudes.len());
        for (mag, bin) in magnitudes[..count].iter_mut().zip(&self.spectrum) {
            *mag = bin.norm() * self.normalization;
        }
        Ok(count)
    }
}

/// Index of the largest magnitude, or `None` for an empty slice.
pub fn peak_bin(magnitudes: &[f32]) -> Option<usize> {
    magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

/// Find local maxima above `threshold`.
///
/// Returns up to `max_peaks` `(frequency_hz, magnitude)` pairs sorted by
/// magnitude, loudest first. `fft_size` is the transform size the magnitudes
/// came from (not the display bin count).
pub fn find_peaks(
    magnitudes: &[f32],
    sample_rate: f32,
    fft_size: usize,
    threshold: f32,
    max_peaks: usize,
) -> Vec<(f32, f32)> {
    let bin_width = sample_rate / fft_size as f32;
    let mut peaks = Vec::new();

    for (i, &mag) in magnitudes.iter().enumerate() {
        let left = if i == 0 { 0.0 } else { magnitudes[i - 1] };
        let right = magnitudes.get(i + 1).copied().unwrap_or(0.0);
        if mag > threshold && mag >= left && mag > right {
            peaks.push((i as f32 * bin_width, mag));
        }
    }

    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    peaks.truncate(max_peaks);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn tone(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_bins_capped_at_nyquist() {
        let analyzer = SpectrumAnalyzer::new(64, 1000).unwrap();
        assert_eq!(analyzer.bins(), 32);
    }

    #[test]
    fn test_sine_peak_at_expected_bin() {
        let sample_rate = 48000.0;
        let mut analyzer = SpectrumAnalyzer::new(1024, 256).unwrap();
        let freq = analyzer.bin_frequency(40, sample_rate);
        let signal = tone(freq, 1.0, sample_rate, 1024);

        let mut mags = vec![0.0; 256];
        assert_eq!(analyzer.analyze(&signal, &mut mags).unwrap(), 256);

        assert_eq!(peak_bin(&mags), Some(40));
        assert!(
            (mags[40] - 1.0).abs() < 1e-3,
            "full-scale tone should read 1.0, got {}",
            mags[40]
        );
        for (k, &m) in mags.iter().enumerate() {
            if k != 40 {
                assert!(m < 1e-3, "bin {k} should be near zero, got {m}");
            }
        }
    }

    #[test]
    fn test_amplitude_scales_linearly() {
        let sample_rate = 48000.0;
        let mut analyzer = SpectrumAnalyzer::new(256, 128).unwrap();
        let freq = analyzer.bin_frequency(12, sample_rate);

        let mut mags = vec![0.0; 128];
        analyzer
            .analyze(&tone(freq, 0.25, sample_rate, 256), &mut mags)
            .unwrap();
        assert!((mags[12] - 0.25).abs() < 1e-3, "got {}", mags[12]);
    }

    #[test]
    fn test_hann_window_still_finds_peak() {
        let sample_rate = 44100.0;
        let mut analyzer = SpectrumAnalyzer::new(2048, 512)
            .unwrap()
            .with_window(Window::Hann);
        // Deliberately between bins
        let freq = analyzer.bin_frequency(100, sample_rate) + 5.0;

        let mut mags = vec![0.0; 512];
        analyzer
            .analyze(&tone(freq, 1.0, sample_rate, 2048), &mut mags)
            .unwrap();
        assert_eq!(peak_bin(&mags), Some(100));
    }

    #[test]
    fn test_wrong_input_length() {
        let mut analyzer = SpectrumAnalyzer::new(128, 64).unwrap();
        let mut mags = vec![0.0; 64];
        assert!(analyzer.analyze(&[0.0; 100], &mut mags).is_err());
    }

    #[test]
    fn test_short_output_truncates() {
        let mut analyzer = SpectrumAnalyzer::new(128, 64).unwrap();
        let mut mags = vec![0.0; 10];
        assert_eq!(analyzer.analyze(&[0.0; 128], &mut mags).unwrap(), 10);
    }

    #[test]
    fn test_find_peaks_sorted_by_magnitude() {
        let mut mags = vec![0.0f32; 64];
        mags[5] = 0.3;
        mags[20] = 0.9;
        mags[40] = 0.5;
        let peaks = find_peaks(&mags, 48000.0, 128, 0.1, 2);

        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0], (20.0 * 375.0, 0.9));
        assert_eq!(peaks[1], (40.0 * 375.0, 0.5));
    }

    #[test]
    fn test_peak_bin_empty() {
        assert_eq!(peak_bin(&[]), None);
    }
}
