//! Error types for the synth engine.

/// Errors raised while building or running the engine.
///
/// Nothing here crosses the audio callback: the render path counts its
/// failures in [`RenderStats`](crate::RenderStats) instead of returning them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every voice slot is taken.
    #[error("no voice available: all {capacity} slots are in use")]
    NoVoiceAvailable {
        /// Total number of voice slots
        capacity: usize,
    },

    /// A setting is out of range.
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The spectrum analyzer could not be built.
    #[error("spectrum analyzer: {0}")]
    Analysis(#[from] polyvox_analysis::Error),

    /// A voice worker thread could not be spawned.
    #[error("failed to spawn voice worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display() {
        let err = Error::NoVoiceAvailable { capacity: 16 };
        assert_eq!(err.to_string(), "no voice available: all 16 slots are in use");

        let err = Error::invalid("block_size", "must be a power of two");
        assert_eq!(
            err.to_string(),
            "invalid setting `block_size`: must be a power of two"
        );
    }

    #[test]
    fn test_analysis_source() {
        let err = Error::from(polyvox_analysis::Error::NotPowerOfTwo(300));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("300"));
    }
}
