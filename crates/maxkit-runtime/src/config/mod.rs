//! Configuration module for the maxkit runtime.
//!
//! Configuration is layered with figment (defaults, files, `MAXKIT_*`
//! environment variables, programmatic merges) and validated before the
//! runtime starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MaxApiConfig,
    MaxkitConfig, PollingConfig, SpanEventConfig,
};
pub use validation::validate_config;
