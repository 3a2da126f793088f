//! Error types shared across maxkit crates.
//!
//! Framework-level errors (handler failures, state usage errors) are defined
//! in `maxkit-framework`.

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors raised while normalizing a raw payload into an [`Update`].
///
/// These are never fatal: the payload is logged and dropped.
///
/// [`Update`]: crate::update::Update
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The payload has no discriminant field.
    #[error("payload has no '{field}' discriminant")]
    MissingDiscriminant {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The discriminant is not a known update type.
    #[error("unknown update type '{0}'")]
    Unknown(String),

    /// The discriminant names a known kind that is not routed.
    #[error("unsupported update type '{0}'")]
    Unsupported(String),

    /// The payload does not have the shape its discriminant promises.
    #[error("malformed '{kind}' payload: {reason}")]
    Malformed {
        /// The declared update type.
        kind: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ParseError {
    /// Creates a malformed-payload error.
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for payloads that were well-formed but of an unrouted kind.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by platform API calls (polling and delivery).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a non-success status.
    #[error("HTTP {status} error: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidRequest(_) => false,
        }
    }
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
