//! maxkit Runtime - the event engine of the maxkit bot framework.
//!
//! This crate provides:
//! - The long-poll loop ([`Poller`]) with consecutive-failure accounting
//! - A bounded worker pool ([`WorkerPool`]) with optional per-conversation
//!   serialization
//! - Runtime orchestration and graceful shutdown ([`MaxkitRuntime`])
//! - Configuration loading ([`config`]) and logging setup ([`logging`])
//!
//! ```ignore
//! use maxkit_framework::{Router, filter};
//! use maxkit_runtime::MaxkitRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.on_message("start", start, maxkit_framework::filters![filter::command("start")]);
//!
//!     // Reads maxkit.toml and MAXKIT_* variables
//!     let runtime = MaxkitRuntime::builder().build()?;
//!
//!     // Runs until Ctrl+C; fails after too many polling errors
//!     runtime.run(router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod pool;
pub mod runtime;
pub mod stats;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, MaxkitConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use poller::Poller;
pub use pool::WorkerPool;
pub use runtime::{MaxkitRuntime, RuntimeBuilder};
pub use stats::RuntimeStats;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module with the logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
