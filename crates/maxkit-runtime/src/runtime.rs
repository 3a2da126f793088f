//! Runtime orchestration.
//!
//! [`MaxkitRuntime`] owns the configuration, the platform collaborators and
//! the conversation store, and runs the long-poll loop for a [`Router`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use maxkit_runtime::MaxkitRuntime;
//!
//! // Loads maxkit.toml and MAXKIT_* variables, then connects to the platform
//! let runtime = MaxkitRuntime::builder().build()?;
//! runtime.run(router).await?;
//!
//! // Custom configuration path and profile
//! let runtime = MaxkitRuntime::builder()
//!     .config_file("config/maxkit.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use maxkit_adapter_max::MaxApi;
use maxkit_core::{BoxedBot, BoxedSource};
use maxkit_framework::{ConversationStore, Router};

use crate::config::{ConfigLoader, MaxkitConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::poller::Poller;
use crate::pool::WorkerPool;
use crate::stats::{Counters, RuntimeStats};

/// The maxkit runtime.
pub struct MaxkitRuntime {
    config: MaxkitConfig,
    source: BoxedSource,
    bot: BoxedBot,
    store: ConversationStore,
    counters: Arc<Counters>,
    stop: Mutex<CancellationToken>,
    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    pool: Mutex<Option<Arc<WorkerPool>>>,
}

impl MaxkitRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime talking to the Max platform.
    ///
    /// Validates the configuration and initializes logging from it.
    pub fn from_config(config: MaxkitConfig) -> RuntimeResult<Self> {
        Self::builder().config(config).build()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MaxkitConfig {
        &self.config
    }

    /// Returns the conversation store handlers see.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Returns the outbound client handlers see.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns whether the poll loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> RuntimeStats {
        let uptime = self
            .started_at
            .lock()
            .map_or(Duration::ZERO, |started| started.elapsed());
        let in_flight = self.pool.lock().as_ref().map_or(0, |pool| pool.in_flight());
        self.counters.snapshot(uptime, in_flight, self.store.len())
    }

    /// Requests the poll loop to stop.
    ///
    /// The loop notices the request before its next poll; a poll in flight
    /// completes first and its updates are still dispatched. A stop requested
    /// before [`run`](Self::run) makes the next run return immediately.
    pub fn stop(&self) {
        if self.is_running() {
            info!("Stop requested");
        } else {
            warn!("Runtime is not running");
        }
        self.stop.lock().cancel();
    }

    /// Runs until Ctrl+C or SIGTERM, or until polling aborts.
    pub async fn run(&self, router: Router) -> RuntimeResult<()> {
        info!("maxkit runtime is now running. Press Ctrl+C to stop.");
        self.run_until(router, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes, [`stop`](Self::stop) is called, or
    /// polling aborts.
    pub async fn run_until<F>(&self, router: Router, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(RuntimeError::AlreadyRunning);
        }

        if router.is_empty() {
            warn!("No handlers registered, every update will be dropped");
        }

        let stop = self.stop.lock().clone();
        *self.started_at.lock() = Some(Instant::now());

        let pool = Arc::new(WorkerPool::new(
            router,
            self.store.clone(),
            Arc::clone(&self.bot),
            &self.config.dispatch,
            Arc::clone(&self.counters),
        ));
        *self.pool.lock() = Some(Arc::clone(&pool));

        let poller = Poller::new(
            Arc::clone(&self.source),
            self.config.polling.clone(),
            Arc::clone(&self.counters),
        );

        let polling = async {
            let result = poller.run(&pool, &stop).await;
            stop.cancel();
            result
        };
        let watcher = async {
            tokio::select! {
                () = shutdown => {
                    info!("Shutting down");
                    stop.cancel();
                }
                () = stop.cancelled() => {}
            }
        };
        let (result, ()) = tokio::join!(polling, watcher);

        self.drain(&pool).await;
        *self.stop.lock() = CancellationToken::new();
        self.running.store(false, Ordering::Release);

        let stats = self.stats();
        info!(
            uptime_secs = stats.uptime.as_secs_f64(),
            processed = stats.processed(),
            dropped = stats.dropped,
            failed = stats.failed,
            "Polling stopped"
        );

        if let Err(err) = &result {
            error!("Runtime stopped with a fatal error: {err}");
        }
        result
    }

    async fn drain(&self, pool: &WorkerPool) {
        let timeout = self.config.dispatch.drain_timeout();
        if timeout.is_zero() {
            return;
        }
        if !pool.drain(timeout).await {
            warn!(
                in_flight = pool.in_flight(),
                timeout_secs = timeout.as_secs(),
                "Handlers still running after drain timeout"
            );
        }
    }
}

impl std::fmt::Debug for MaxkitRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxkitRuntime")
            .field("running", &self.is_running())
            .field("polling", &self.config.polling)
            .field("dispatch", &self.config.dispatch)
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!("Failed to register SIGTERM handler: {e}"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            // Without a signal source only stop() ends the loop.
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`MaxkitRuntime`].
///
/// Without an explicit [`config`](Self::config) the configuration is loaded
/// with [`ConfigLoader`]. Without an explicit source and bot a [`MaxApi`]
/// client is created from the `bot` section and used for both.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<MaxkitConfig>,
    source: Option<BoxedSource>,
    bot: Option<BoxedBot>,
    store: Option<ConversationStore>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
            config: None,
            source: None,
            bot: None,
            store: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Uses this configuration instead of loading one.
    pub fn config(mut self, config: MaxkitConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses a custom update source.
    pub fn source(mut self, source: BoxedSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Uses a custom outbound client.
    pub fn bot(mut self, bot: BoxedBot) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Shares an existing conversation store.
    pub fn store(mut self, store: ConversationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<MaxkitRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let (source, bot) = match (self.source, self.bot) {
            (Some(source), Some(bot)) => (source, bot),
            (source, bot) => {
                let api = Arc::new(MaxApi::new(&config.bot)?);
                (
                    source.unwrap_or_else(|| Arc::clone(&api) as BoxedSource),
                    bot.unwrap_or_else(|| api as BoxedBot),
                )
            }
        };

        info!(
            log_level = %config.logging.level,
            max_in_flight = config.dispatch.max_in_flight,
            serialize_per_conversation = config.dispatch.serialize_per_conversation,
            "Runtime initialized from configuration"
        );

        Ok(MaxkitRuntime {
            config,
            source,
            bot,
            store: self.store.unwrap_or_default(),
            counters: Arc::new(Counters::default()),
            stop: Mutex::new(CancellationToken::new()),
            running: AtomicBool::new(false),
            started_at: Mutex::new(None),
            pool: Mutex::new(None),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
