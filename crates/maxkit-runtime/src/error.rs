//! Runtime error types.

use thiserror::Error;

use maxkit_core::ApiError;

use crate::config::ConfigError;

/// Errors that stop the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The platform client could not be created.
    #[error("Failed to create platform client: {0}")]
    Client(#[from] ApiError),

    /// The long-poll loop hit the consecutive failure threshold.
    #[error("Polling aborted after {failures} consecutive failures: {last_error}")]
    PollingAborted {
        /// Number of consecutive failed polls.
        failures: u32,
        /// The error of the last poll.
        last_error: ApiError,
    },

    /// `run` was called while the runtime was already running.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

impl RuntimeError {
    /// Returns `true` for the polling failure that ends the process.
    pub fn is_polling_aborted(&self) -> bool {
        matches!(self, Self::PollingAborted { .. })
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
