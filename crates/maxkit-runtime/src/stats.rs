//! Runtime counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use maxkit_framework::DispatchOutcome;

/// Live counters shared by the poller and the worker pool.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    polls: AtomicU64,
    poll_failures: AtomicU64,
    received: AtomicU64,
    dropped: AtomicU64,
    dispatched: AtomicU64,
    handled: AtomicU64,
    unmatched: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    pub(crate) fn poll_succeeded(&self, received: usize) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.received.fetch_add(received as u64, Ordering::Relaxed);
    }

    pub(crate) fn poll_failed(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, outcome: &DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Handled { .. } => &self.handled,
            DispatchOutcome::Unmatched => &self.unmatched,
            DispatchOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, uptime: Duration, in_flight: usize, conversations: usize) -> RuntimeStats {
        RuntimeStats {
            uptime,
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight,
            conversations,
        }
    }
}

/// A snapshot of runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Time since the current (or last) run started.
    pub uptime: Duration,
    /// Poll calls made, including failed ones.
    pub polls: u64,
    /// Poll calls that failed.
    pub poll_failures: u64,
    /// Raw updates received.
    pub received: u64,
    /// Raw updates that could not be normalized.
    pub dropped: u64,
    /// Updates handed to the worker pool.
    pub dispatched: u64,
    /// Updates a handler completed.
    pub handled: u64,
    /// Updates no handler accepted.
    pub unmatched: u64,
    /// Updates whose filter or handler failed.
    pub failed: u64,
    /// Dispatch tasks still running.
    pub in_flight: usize,
    /// Conversations with an active record in the store.
    pub conversations: usize,
}

impl RuntimeStats {
    /// Updates whose dispatch has finished, whatever the outcome.
    pub fn processed(&self) -> u64 {
        self.handled + self.unmatched + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxkit_framework::HandlerError;

    #[test]
    fn test_record_outcomes() {
        let counters = Counters::default();
        counters.poll_succeeded(3);
        counters.poll_failed();
        counters.dropped();
        counters.dispatched();
        counters.dispatched();
        counters.record(&DispatchOutcome::Handled {
            handler: "start".to_string(),
        });
        counters.record(&DispatchOutcome::Failed(HandlerError::Failed {
            handler: "broken".to_string(),
            error: anyhow::anyhow!("boom"),
        }));

        let stats = counters.snapshot(Duration::from_secs(1), 0, 2);
        assert_eq!(stats.polls, 2);
        assert_eq!(stats.poll_failures, 1);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed(), 2);
        assert_eq!(stats.conversations, 2);
    }
}
