//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, LogOutput, LoggingConfig, MaxApiConfig, MaxkitConfig, PollingConfig};

/// Largest batch the platform returns per poll.
pub const MAX_POLL_LIMIT: u32 = 1000;

/// Longest long-poll timeout the platform accepts, in seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 90;

/// Validates the entire configuration.
pub fn validate_config(config: &MaxkitConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_polling_config(&config.polling, &config.bot)?;
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates the platform client settings.
fn validate_bot_config(bot: &MaxApiConfig) -> ConfigResult<()> {
    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }

    validate_url(&bot.base_url)?;

    if bot.request_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "bot.request_timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

/// Validates the long-poll loop settings.
fn validate_polling_config(polling: &PollingConfig, bot: &MaxApiConfig) -> ConfigResult<()> {
    if polling.limit == 0 || polling.limit > MAX_POLL_LIMIT {
        return Err(ConfigError::validation(format!(
            "polling.limit must be between 1 and {MAX_POLL_LIMIT}, got {}",
            polling.limit
        )));
    }

    if polling.timeout_secs > MAX_POLL_TIMEOUT_SECS {
        return Err(ConfigError::validation(format!(
            "polling.timeout_secs must be at most {MAX_POLL_TIMEOUT_SECS}, got {}",
            polling.timeout_secs
        )));
    }

    // An idle long poll must end before the HTTP client gives up on it.
    if polling.timeout_secs >= bot.request_timeout_secs {
        return Err(ConfigError::validation(format!(
            "polling.timeout_secs ({}) must be less than bot.request_timeout_secs ({})",
            polling.timeout_secs, bot.request_timeout_secs
        )));
    }

    if polling.error_threshold == 0 {
        return Err(ConfigError::validation(
            "polling.error_threshold must be greater than 0",
        ));
    }

    Ok(())
}

/// Validates the worker pool settings.
fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.max_in_flight == 0 {
        return Err(ConfigError::validation(
            "dispatch.max_in_flight must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates a URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("bot.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}
