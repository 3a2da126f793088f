//! Logging setup for maxkit.
//!
//! One `fmt` layer on a `tracing-subscriber` registry, filtered by an
//! `EnvFilter`. `RUST_LOG` replaces the configured base level; the
//! per-module `filters` of [`LoggingConfig`] apply on top of either.
//!
//! Every dispatched update runs inside a `dispatch` span carrying
//! `update_kind` and `chat_id`. The span is recorded at `debug`, so
//! enabling any span event also turns on `debug` for the dispatcher; with
//! `span_events.close` each update gets one line with its handling time:
//!
//! ```text
//! DEBUG dispatch{update_kind=message chat_id=42}: maxkit_framework::dispatcher: close time.busy=1.2ms time.idle=85µs
//! ```
//!
//! Lines written by the poller carry `marker`, `attempt`/`threshold` and
//! `count` fields; the `json-log` feature keeps them as JSON keys.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{Subscriber, debug, warn};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// Target of the span wrapped around every dispatched update.
pub const DISPATCH_TARGET: &str = "maxkit_framework::dispatcher";

const DEFAULT_FILE_NAME: &str = "maxkit.log";

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(e) = try_init(config) {
        debug!("Logging already initialized: {e}");
    }
}

/// Installs the global subscriber described by `config`, failing if one
/// is already installed.
pub fn try_init(config: &LoggingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config, writer(config)))
        .with(env_filter(config, true))
        .try_init()
}

/// Filter directives derived from `config`, base level first.
fn directives(config: &LoggingConfig) -> Vec<String> {
    let mut directives = Vec::with_capacity(config.filters.len() + 1);

    if span_events(&config.span_events) != FmtSpan::NONE
        && !matches!(config.level, LogLevel::Trace | LogLevel::Debug)
    {
        directives.push(format!("{DISPATCH_TARGET}=debug"));
    }

    let mut modules: Vec<_> = config.filters.iter().collect();
    modules.sort_by(|a, b| a.0.cmp(b.0));
    directives.extend(
        modules
            .into_iter()
            .map(|(module, level)| format!("{module}={}", level.as_str())),
    );

    directives
}

fn env_filter(config: &LoggingConfig, honour_env: bool) -> EnvFilter {
    let base = honour_env
        .then(|| EnvFilter::try_from_default_env().ok())
        .flatten();
    let mut filter = base.unwrap_or_else(|| EnvFilter::new(config.level.as_str()));

    for directive in directives(config) {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => warn!(%directive, "Ignoring invalid log filter: {e}"),
        }
    }
    filter
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

fn writer(config: &LoggingConfig) -> BoxMakeWriter {
    match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
        (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
        (LogOutput::File, Some(path)) => BoxMakeWriter::new(file_appender(path, config.rotation)),
        (LogOutput::File, None) => {
            // Rejected by validation; reachable only with unvalidated configs.
            warn!("File output requested but no file path configured, falling back to stdout");
            BoxMakeWriter::new(std::io::stdout)
        }
    }
}

fn file_appender(path: &Path, rotation: LogRotation) -> RollingFileAppender {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_FILE_NAME));
    match rotation {
        LogRotation::Never => tracing_appender::rolling::never(directory, file_name),
        LogRotation::Hourly => tracing_appender::rolling::hourly(directory, file_name),
        LogRotation::Daily => tracing_appender::rolling::daily(directory, file_name),
    }
}

fn fmt_layer<S>(config: &LoggingConfig, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(config.output != LogOutput::File)
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Full => layer.boxed(),
        #[cfg(not(feature = "json-log"))]
        LogFormat::Full | LogFormat::Json => layer.boxed(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::Level;

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Handles one fake update under `config` and returns the log output.
    fn capture(config: &LoggingConfig) -> String {
        let buffer = Buffer::default();
        let writer = {
            let buffer = buffer.clone();
            BoxMakeWriter::new(move || buffer.clone())
        };
        let subscriber = tracing_subscriber::registry()
            .with(fmt_layer(config, writer))
            .with(env_filter(config, false));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::span!(
                target: DISPATCH_TARGET,
                Level::DEBUG,
                "dispatch",
                update_kind = "message",
                chat_id = 42
            );
            let _entered = span.enter();
            tracing::info!(target: DISPATCH_TARGET, handler = "start", "Handled update");
        });

        String::from_utf8_lossy(&buffer.0.lock()).into_owned()
    }

    fn config(format: LogFormat) -> LoggingConfig {
        LoggingConfig {
            format,
            // Plain text, no ANSI escapes.
            output: LogOutput::File,
            ..Default::default()
        }
    }

    #[test]
    fn test_span_events() {
        assert_eq!(span_events(&SpanEventConfig::default()), FmtSpan::NONE);
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_events(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn test_directives() {
        let mut config = LoggingConfig::default();
        config.filters.insert("maxkit_runtime".to_string(), LogLevel::Warn);
        config
            .filters
            .insert("maxkit_adapter_max".to_string(), LogLevel::Trace);
        assert_eq!(
            directives(&config),
            ["maxkit_adapter_max=trace", "maxkit_runtime=warn"]
        );

        config.span_events.close = true;
        assert_eq!(directives(&config)[0], "maxkit_framework::dispatcher=debug");

        // Already verbose enough to record the dispatch span.
        config.level = LogLevel::Debug;
        assert_eq!(directives(&config).len(), 2);
    }

    #[test]
    fn test_dispatch_span_hidden_by_default() {
        let output = capture(&config(LogFormat::Full));
        assert!(output.contains("Handled update"), "{output}");
        assert!(!output.contains("chat_id=42"), "{output}");
    }

    #[test]
    fn test_close_event_reports_dispatch_fields() {
        let mut config = config(LogFormat::Full);
        config.span_events.close = true;

        let output = capture(&config);
        let close = output
            .lines()
            .find(|line| line.contains("close"))
            .unwrap_or_else(|| panic!("no close event in {output}"));
        assert!(close.contains("dispatch"), "{close}");
        assert!(close.contains("chat_id=42"), "{close}");
        assert!(close.contains("time.busy"), "{close}");
    }

    #[test]
    fn test_module_filter_silences_target() {
        let mut config = config(LogFormat::Compact);
        config
            .filters
            .insert(DISPATCH_TARGET.to_string(), LogLevel::Warn);

        assert!(capture(&config).is_empty());
    }
}
