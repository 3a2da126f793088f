//! Configuration of the Max platform client.
//!
//! Loaded as the `bot` section of the runtime configuration:
//!
//! ```toml
//! [bot]
//! token = "..."                              # or MAXKIT_BOT__TOKEN
//! base_url = "https://platform-api.max.ru"
//! request_timeout_secs = 45
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default platform API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://platform-api.max.ru";

/// Max platform client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxApiConfig {
    /// Bot access token.
    pub token: String,

    /// API base URL.
    pub base_url: String,

    /// Timeout of a single HTTP request, in seconds.
    ///
    /// Must exceed the long-poll timeout, or every idle poll fails.
    pub request_timeout_secs: u64,
}

impl Default for MaxApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 45,
        }
    }
}

impl MaxApiConfig {
    /// Creates a configuration with the given token and default settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Returns the request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// The token must never end up in logs.
impl std::fmt::Debug for MaxApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxApiConfig")
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_partial_input() {
        let config: MaxApiConfig = serde_json::from_str(r#"{ "token": "abc" }"#).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", MaxApiConfig::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
