//! Polyvox Analysis - spectrum analysis for the polyvox synth engine
//!
//! This crate turns captured time-domain blocks into magnitude spectra for
//! display:
//!
//! - [`fft`] - Recursive radix-2 FFT with a precomputed twiddle table
//! - [`spectrum`] - Magnitude bins, windowing, and peak picking
//!
//! Both are built for the audio thread: after construction, a transform
//! performs no allocation and never panics on bad input. Length violations
//! come back as [`Error`] values.
//!
//! ## Example
//!
//! ```rust
//! use polyvox_analysis::SpectrumAnalyzer;
//!
//! let sample_rate = 48000.0;
//! let mut analyzer = SpectrumAnalyzer::new(512, 64).unwrap();
//!
//! let bin = 10;
//! let freq = analyzer.bin_frequency(bin, sample_rate);
//! let signal: Vec<f32> = (0..512)
//!     .map(|i| (std::f32::consts::TAU * freq * i as f32 / sample_rate).sin())
//!     .collect();
//!
//! let mut magnitudes = vec![0.0; 64];
//! analyzer.analyze(&signal, &mut magnitudes).unwrap();
//! assert_eq!(polyvox_analysis::spectrum::peak_bin(&magnitudes), Some(bin));
//! ```

pub mod fft;
pub mod spectrum;

pub use fft::Radix2Fft;
pub use rustfft::num_complex::Complex;
pub use spectrum::{SpectrumAnalyzer, Window};

/// Errors produced by the analysis routines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The transform size is not a power of two (or is zero).
    #[error("FFT size must be a nonzero power of two, got {0}")]
    NotPowerOfTwo(usize),

    /// A buffer handed to the transform does not match its configured size.
    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Length the transform was built for
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, Error>;
