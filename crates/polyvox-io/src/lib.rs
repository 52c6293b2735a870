//! Audio output layer for the polyvox synth engine.
//!
//! This crate provides:
//!
//! - **Device output**: the [`AudioBackend`] trait and its cpal implementation,
//!   [`CpalBackend`], which drive a render callback from the device thread
//! - **Device discovery**: [`list_devices`] and [`default_output_device`]
//! - **WAV files**: [`write_wav_stereo`] for offline renders, plus
//!   [`read_wav_info`] and [`read_wav_interleaved`] to inspect them
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polyvox_io::{AudioBackend, BackendStreamConfig, CpalBackend};
//!
//! let backend = CpalBackend::new();
//! let stream = backend.build_output_stream(
//!     &BackendStreamConfig::default(),
//!     Box::new(move |buffer: &mut [f32]| renderer.render(buffer)),
//!     Box::new(|err| tracing::error!(error = err, "stream error")),
//! )?;
//! // Audio plays until `stream` is dropped.
//! ```

pub mod backend;
pub mod cpal_backend;
mod devices;
mod wav;

pub use backend::{AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_output_device, list_devices};
pub use wav::{WavInfo, read_wav_info, read_wav_interleaved, write_wav_stereo};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device rejected the requested configuration.
    #[error("Unsupported stream configuration: {0}")]
    UnsupportedConfig(String),

    /// An interleaved stereo buffer had an odd number of samples.
    #[error("Interleaved stereo buffer has odd length {0}")]
    OddSampleCount(usize),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
