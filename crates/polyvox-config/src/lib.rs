//! Configuration for the polyvox synth engine.
//!
//! Settings live in a TOML file, by default `polyvox.toml` in the user
//! config directory. Every section and field is optional, so a file only
//! needs to name what it changes.
//!
//! # Features
//!
//! - **Config file**: [`Config`] load, save, and conversion to validated
//!   [`EngineSettings`](polyvox_synth::EngineSettings)
//! - **Paths**: platform-specific config directory and file lookup
//!
//! # Example
//!
//! ```rust
//! use polyvox_config::Config;
//!
//! let config = Config::from_toml(
//!     r#"
//!     [synth]
//!     instrument = "saw"
//!     max_voices = 8
//!     "#,
//! )
//! .unwrap();
//!
//! let settings = config.to_settings().unwrap();
//! assert_eq!(settings.max_voices, 8);
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

pub use config::{
    AudioSection, Config, EnvelopeConfig, EnvelopeSection, FilterSection, RenderSection,
    SpectrumSection, StrategyKind, SynthSection, WindowKind,
};
pub use error::ConfigError;
pub use paths::{ensure_user_config_dir, find_config, user_config_dir, user_config_file};
