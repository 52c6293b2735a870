//! Pluggable audio backend abstraction.
//!
//! The [`AudioBackend`] trait keeps the engine host independent of the
//! platform audio API. [`CpalBackend`](crate::CpalBackend) is the only
//! implementation shipped; tests and offline hosts can provide their own.
//!
//! Callbacks are boxed closures rather than generic parameters so the trait
//! stays object-safe. Streams come back as a type-erased [`StreamHandle`]
//! that stops playback when dropped.

use crate::{AudioDevice, Result};

/// Configuration for building an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames; `None` lets the device choose.
    pub buffer_size: Option<u32>,
    /// Number of interleaved output channels.
    pub channels: u16,
    /// Device name filter (case-insensitive substring); system default if `None`.
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: Some(512),
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops
/// playback.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Audio output callback.
///
/// Runs on the device thread and must fill the interleaved buffer
/// (`[L0, R0, L1, R1, ...]` for stereo). It must not allocate, block, or
/// perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Stream error callback, given a human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// A platform audio API capable of driving an output callback.
pub trait AudioBackend {
    /// Short backend identifier, for logs.
    fn name(&self) -> &'static str;

    /// Every device the backend can see.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The system default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Look up an output device by case-insensitive name substring, or the
    /// default device when `name` is `None`.
    fn find_output_device(&self, name: Option<&str>) -> Result<AudioDevice>;

    /// Open and start an output stream.
    ///
    /// `callback` is invoked from the device thread for every buffer.
    /// `error_callback` receives stream errors raised after start.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Backend that runs the callback a fixed number of times on build.
    struct ScriptedBackend {
        buffers: usize,
        calls: Arc<AtomicUsize>,
    }

    impl AudioBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn list_devices(&self) -> Result<Vec<AudioDevice>> {
            Ok(vec![AudioDevice {
                name: "Scripted Out".into(),
                is_input: false,
                is_output: true,
                channels: 2,
                default_sample_rate: 48000,
            }])
        }

        fn default_output_device(&self) -> Result<Option<AudioDevice>> {
            Ok(self.list_devices()?.into_iter().next())
        }

        fn find_output_device(&self, name: Option<&str>) -> Result<AudioDevice> {
            let devices = self.list_devices()?;
            match name {
                None => devices.into_iter().next().ok_or(Error::NoDevice),
                Some(search) => devices
                    .into_iter()
                    .find(|d| d.matches(search))
                    .ok_or_else(|| Error::DeviceNotFound(search.to_string())),
            }
        }

        fn build_output_stream(
            &self,
            config: &BackendStreamConfig,
            mut callback: OutputCallback,
            _error_callback: ErrorCallback,
        ) -> Result<StreamHandle> {
            let frames = config.buffer_size.unwrap_or(64) as usize;
            let mut buffer = vec![0.0; frames * usize::from(config.channels)];
            for _ in 0..self.buffers {
                callback(&mut buffer);
                self.calls.fetch_add(1, Ordering::Relaxed);
            }
            Ok(StreamHandle::new(buffer))
        }
    }

    #[test]
    fn test_default_config() {
        let config = BackendStreamConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, Some(512));
        assert_eq!(config.channels, 2);
        assert!(config.device_name.is_none());
    }

    #[test]
    fn test_trait_object_drives_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend: Box<dyn AudioBackend> = Box::new(ScriptedBackend {
            buffers: 3,
            calls: Arc::clone(&calls),
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _stream = backend
            .build_output_stream(
                &BackendStreamConfig {
                    buffer_size: Some(16),
                    ..Default::default()
                },
                Box::new(move |buf: &mut [f32]| sink.lock().unwrap().push(buf.len())),
                Box::new(|_| {}),
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(*seen.lock().unwrap(), vec![32, 32, 32]);
    }

    #[test]
    fn test_find_device_by_substring() {
        let backend = ScriptedBackend {
            buffers: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        assert_eq!(backend.find_output_device(Some("scripted")).unwrap().name, "Scripted Out");
        assert!(matches!(
            backend.find_output_device(Some("usb")),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }
}
