//! The long-poll loop.
//!
//! ```text
//!   ┌──▶ stop requested? ──yes──▶ return Ok
//!   │          │ no
//!   │          ▼
//!   │    poll(marker) ──err──▶ failures += 1 ──▶ failures == threshold? ──yes──▶ PollingAborted
//!   │          │ ok                                   │ no
//!   │          ▼                                      ▼
//!   │    failures = 0                          sleep(backoff) (cut short by stop)
//!   │    normalize + submit each update               │
//!   │    marker = next marker                         │
//!   └──────────┴──────────────────────────────────────┘
//! ```
//!
//! A stop request never interrupts a poll already in flight.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use maxkit_core::{ApiError, BoxedSource, ParseError, PollRequest};

use crate::config::PollingConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::pool::WorkerPool;
use crate::stats::Counters;

/// Drives an [`UpdateSource`](maxkit_core::UpdateSource) and feeds the
/// worker pool.
pub struct Poller {
    source: BoxedSource,
    config: PollingConfig,
    counters: Arc<Counters>,
}

impl Poller {
    pub(crate) fn new(source: BoxedSource, config: PollingConfig, counters: Arc<Counters>) -> Self {
        Self {
            source,
            config,
            counters,
        }
    }

    fn request(&self, marker: Option<i64>, skipping: bool) -> PollRequest {
        PollRequest {
            marker,
            // Pending updates are fetched without waiting for new ones.
            timeout: if skipping {
                std::time::Duration::ZERO
            } else {
                self.config.timeout()
            },
            limit: self.config.limit,
            types: self.config.types.clone(),
        }
    }

    /// Polls until `stop` is cancelled or the failure threshold is reached.
    pub async fn run(&self, pool: &WorkerPool, stop: &CancellationToken) -> RuntimeResult<()> {
        let mut marker: Option<i64> = None;
        let mut failures: u32 = 0;
        let mut skipping = self.config.skip_updates;

        info!(
            timeout_secs = self.config.timeout_secs,
            limit = self.config.limit,
            skip_updates = skipping,
            "Starting polling"
        );

        loop {
            if stop.is_cancelled() {
                info!("Polling stopped");
                return Ok(());
            }

            let request = self.request(marker, skipping);
            match self.source.poll(&request).await {
                Ok(batch) => {
                    failures = 0;
                    self.counters.poll_succeeded(batch.updates.len());

                    if skipping {
                        skipping = false;
                        info!(skipped = batch.updates.len(), "Skipped pending updates");
                    } else {
                        if !batch.updates.is_empty() {
                            debug!(count = batch.updates.len(), "Received updates");
                        }
                        for raw in &batch.updates {
                            match self.source.parse_update(raw) {
                                Ok(update) => pool.submit(update).await,
                                Err(err) => self.drop_update(raw, err),
                            }
                        }
                    }

                    if let Some(next) = batch.marker {
                        marker = Some(next);
                        debug!(marker = next, "Updated marker");
                    }
                }
                Err(err) => {
                    failures += 1;
                    self.counters.poll_failed();
                    error!(attempt = failures, threshold = self.config.error_threshold, "Polling error: {err}");

                    if failures >= self.config.error_threshold {
                        error!(failures, "Too many consecutive polling errors, stopping");
                        return Err(RuntimeError::PollingAborted {
                            failures,
                            last_error: err,
                        });
                    }

                    self.backoff(stop, &err).await;
                }
            }
        }
    }

    fn drop_update(&self, raw: &serde_json::Value, err: ParseError) {
        self.counters.dropped();
        if err.is_unsupported() {
            debug!("Dropping update: {err}");
        } else {
            warn!(payload = %raw, "Dropping update: {err}");
        }
    }

    async fn backoff(&self, stop: &CancellationToken, err: &ApiError) {
        let delay = self.config.backoff();
        debug!(delay_ms = delay.as_millis() as u64, transient = err.is_transient(), "Backing off");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = stop.cancelled() => {}
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
