//! Structured callback payloads.
//!
//! Inline buttons carry an opaque payload string. Flows that need more than a
//! fixed token encode an action plus positional arguments with a simple
//! grammar:
//!
//! ```text
//! payload := action ( ':' arg )*
//! action  := one or more characters except ':'
//! arg     := zero or more characters except ':'
//! ```
//!
//! A payload is at most [`MAX_PAYLOAD_LEN`] bytes and carries at most
//! [`MAX_ARGS`] arguments. Argument access is bounds-checked and typed:
//!
//! ```rust,ignore
//! let data = CallbackData::parse("shelter_search:like:42")?;
//! assert_eq!(data.action(), "shelter_search");
//! assert_eq!(data.get(0)?, "like");
//! let id: i64 = data.parse_arg(1)?;
//!
//! let payload = CallbackData::new("shelter_search").arg("next").encode()?;
//! ```

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{PayloadError, PayloadResult};

/// Delimiter between the action and each argument.
pub const DELIMITER: char = ':';

/// Maximum encoded payload length, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Maximum number of arguments after the action.
pub const MAX_ARGS: usize = 16;

/// A parsed callback payload: an action and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData {
    action: String,
    args: Vec<String>,
}

impl CallbackData {
    /// Starts building a payload for `action`.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Parses a raw payload string.
    pub fn parse(raw: &str) -> PayloadResult<Self> {
        if raw.len() > MAX_PAYLOAD_LEN {
            return Err(PayloadError::TooLong {
                len: raw.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let mut parts = raw.split(DELIMITER);
        let action = parts.next().unwrap_or_default();
        if action.is_empty() {
            return Err(PayloadError::EmptyAction);
        }

        let args: Vec<String> = parts.map(str::to_string).collect();
        if args.len() > MAX_ARGS {
            return Err(PayloadError::TooManyArguments {
                count: args.len(),
                max: MAX_ARGS,
            });
        }

        Ok(Self {
            action: action.to_string(),
            args,
        })
    }

    /// Returns the action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns all arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the argument at `index`.
    pub fn get(&self, index: usize) -> PayloadResult<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| PayloadError::MissingArgument {
                action: self.action.clone(),
                index,
            })
    }

    /// Parses the argument at `index` into `T`.
    pub fn parse_arg<T>(&self, index: usize) -> PayloadResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.get(index)?;
        raw.parse().map_err(|e: T::Err| PayloadError::InvalidArgument {
            action: self.action.clone(),
            index,
            reason: e.to_string(),
        })
    }

    /// Encodes the payload, validating it against the grammar and bounds.
    pub fn encode(&self) -> PayloadResult<String> {
        if self.action.is_empty() {
            return Err(PayloadError::EmptyAction);
        }
        if self.args.len() > MAX_ARGS {
            return Err(PayloadError::TooManyArguments {
                count: self.args.len(),
                max: MAX_ARGS,
            });
        }
        for segment in std::iter::once(&self.action).chain(&self.args) {
            if segment.contains(DELIMITER) {
                return Err(PayloadError::DelimiterInSegment(segment.clone()));
            }
        }

        let mut out = self.action.clone();
        for arg in &self.args {
            out.push(DELIMITER);
            out.push_str(arg);
        }

        if out.len() > MAX_PAYLOAD_LEN {
            return Err(PayloadError::TooLong {
                len: out.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(out)
    }
}

impl FromStr for CallbackData {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
