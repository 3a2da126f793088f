//! Error types for the maxkit framework.

use thiserror::Error;

/// Errors that can occur during context extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The update is not of the variant the extractor expects.
    #[error("update kind mismatch: expected '{expected}', got '{got}'")]
    KindMismatch {
        /// Expected update kind.
        expected: &'static str,
        /// Actual update kind.
        got: &'static str,
    },

    /// The callback payload could not be parsed.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// A failure isolated at the dispatch boundary.
///
/// Carries the name of the route whose filters or handler failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A filter returned an error or panicked.
    #[error("filter '{filter}' of handler '{handler}' failed: {error:#}")]
    Filter {
        /// Route name.
        handler: String,
        /// Filter name.
        filter: String,
        /// The filter error.
        error: anyhow::Error,
    },

    /// The handler returned an error, including a failed extraction.
    #[error("handler '{handler}' failed: {error:#}")]
    Failed {
        /// Route name.
        handler: String,
        /// The handler error.
        error: anyhow::Error,
    },

    /// The handler panicked.
    #[error("handler '{handler}' panicked: {message}")]
    Panicked {
        /// Route name.
        handler: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl HandlerError {
    /// Returns the name of the failed route.
    pub fn handler(&self) -> &str {
        match self {
            Self::Filter { handler, .. } | Self::Failed { handler, .. } | Self::Panicked { handler, .. } => {
                handler
            }
        }
    }
}

/// Errors raised by the conversation state store.
///
/// These are contract violations in handler code (e.g. writing scratch data
/// before a flow was started) and are returned to the caller.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    /// Scratch data was accessed on a conversation with no active record.
    #[error("conversation {chat_id} has no active state record")]
    NoActiveRecord {
        /// The conversation id.
        chat_id: i64,
    },

    /// A scratch value could not be converted to or from JSON.
    #[error("scratch value '{key}' could not be converted: {reason}")]
    Conversion {
        /// The scratch key.
        key: String,
        /// The serde error message.
        reason: String,
    },
}

/// Errors raised while parsing or building a structured callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The payload has no action.
    #[error("payload has an empty action")]
    EmptyAction,

    /// The payload exceeds the maximum encoded length.
    #[error("payload is {len} bytes long, the limit is {max}")]
    TooLong {
        /// Encoded length.
        len: usize,
        /// Maximum length.
        max: usize,
    },

    /// The payload has more arguments than allowed.
    #[error("payload has {count} arguments, the limit is {max}")]
    TooManyArguments {
        /// Argument count.
        count: usize,
        /// Maximum argument count.
        max: usize,
    },

    /// An argument was requested past the end of the argument list.
    #[error("payload '{action}' has no argument at index {index}")]
    MissingArgument {
        /// Payload action.
        action: String,
        /// Requested index.
        index: usize,
    },

    /// An argument could not be parsed into the requested type.
    #[error("argument {index} of payload '{action}' is invalid: {reason}")]
    InvalidArgument {
        /// Payload action.
        action: String,
        /// Argument index.
        index: usize,
        /// Parse failure.
        reason: String,
    },

    /// A segment contains the delimiter and cannot be encoded.
    #[error("segment '{0}' contains the ':' delimiter")]
    DelimiterInSegment(String),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Result type for payload operations.
pub type PayloadResult<T> = Result<T, PayloadError>;
