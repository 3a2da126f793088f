//! Bounded worker pool.
//!
//! Every normalized update becomes its own task. A semaphore caps the
//! number of tasks alive at once; when it is exhausted [`WorkerPool::submit`]
//! waits, which in turn stalls the poll loop. Tasks are tracked so shutdown
//! can wait for them.
//!
//! With per-conversation serialization enabled, tasks of the same chat take
//! a shared async mutex before dispatching. Tokio mutexes are fair, so
//! handlers of one chat run in the order they queued for the lock. A task
//! queued on a busy chat gives its slot back until its turn comes, so the
//! semaphore bounds running handlers rather than queued ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

use maxkit_core::{BoxedBot, Update};
use maxkit_framework::{Context, ConversationStore, Router};

use crate::config::DispatchConfig;
use crate::stats::Counters;

type ConversationLock = Arc<tokio::sync::Mutex<()>>;

/// Per-chat locks, removed again once no task holds or waits for them.
#[derive(Clone, Default)]
pub(crate) struct ConversationLocks {
    locks: Arc<parking_lot::Mutex<HashMap<i64, ConversationLock>>>,
}

impl ConversationLocks {
    fn handle(&self, chat_id: i64) -> ConversationLock {
        Arc::clone(self.locks.lock().entry(chat_id).or_default())
    }

    fn release(&self, chat_id: i64, handle: ConversationLock) {
        let mut locks = self.locks.lock();
        drop(handle);
        // Only the map's own reference left: nobody holds or waits.
        if locks
            .get(&chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&chat_id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Spawns dispatch tasks for normalized updates.
pub struct WorkerPool {
    router: Router,
    store: ConversationStore,
    bot: BoxedBot,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    locks: Option<ConversationLocks>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub(crate) fn new(
        router: Router,
        store: ConversationStore,
        bot: BoxedBot,
        config: &DispatchConfig,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            router,
            store,
            bot,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            tracker: TaskTracker::new(),
            locks: config
                .serialize_per_conversation
                .then(ConversationLocks::default),
            counters,
        }
    }

    /// Hands an update to a new task.
    ///
    /// Waits for a free slot first, so a saturated pool stalls the poll
    /// loop. Waiting for a busy conversation happens inside the task and
    /// without a slot: a slow chat never holds back the others, and
    /// `submit` never waits on a conversation lock.
    pub async fn submit(&self, update: Update) {
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // The semaphore is never closed while the pool exists.
            warn!("Worker pool closed, dropping update");
            return;
        };

        let chat_id = update.chat_id();
        let ctx = Context::new(update, self.store.clone(), Arc::clone(&self.bot));
        let router = self.router.clone();
        let counters = Arc::clone(&self.counters);
        let locks = self.locks.clone();
        let permits = Arc::clone(&self.permits);

        self.counters.dispatched();
        trace!(chat_id, "Spawning dispatch task");

        self.tracker.spawn(async move {
            let outcome = match locks {
                Some(locks) => {
                    let handle = locks.handle(chat_id);
                    let outcome = {
                        let (_turn, _permit) = match handle.try_lock() {
                            Ok(turn) => (turn, Some(permit)),
                            Err(_) => {
                                // Queued behind the chat's running handler: free the slot.
                                drop(permit);
                                trace!(chat_id, "Waiting for conversation");
                                let turn = handle.lock().await;
                                (turn, permits.acquire_owned().await.ok())
                            }
                        };
                        router.dispatch(ctx).await
                    };
                    locks.release(chat_id, handle);
                    outcome
                }
                None => {
                    let _permit = permit;
                    router.dispatch(ctx).await
                }
            };

            counters.record(&outcome);
        });
    }

    /// Number of dispatch tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `timeout` for running tasks. Returns `true` if all of
    /// them finished.
    ///
    /// Tasks still running after the timeout are left alone.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if self.tracker.is_empty() {
            return true;
        }

        debug!(in_flight = self.tracker.len(), "Waiting for in-flight handlers");
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }

    #[cfg(test)]
    pub(crate) fn conversation_locks(&self) -> usize {
        self.locks.as_ref().map_or(0, ConversationLocks::len)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("available", &self.permits.available_permits())
            .field("in_flight", &self.tracker.len())
            .field("serialized", &self.locks.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use maxkit_core::{
        ApiResult, Bot, CallbackAnswer, Message, NewMessage, SentMessage, Target, User,
    };
    use tokio::sync::Notify;

    pub(crate) struct SilentBot;

    #[async_trait]
    impl Bot for SilentBot {
        async fn send_message(&self, _target: Target, _message: NewMessage) -> ApiResult<SentMessage> {
            Ok(SentMessage { message_id: None })
        }

        async fn answer_callback(&self, _id: &str, _answer: CallbackAnswer) -> ApiResult<()> {
            Ok(())
        }

        async fn edit_message(&self, _id: &str, _message: NewMessage) -> ApiResult<()> {
            Ok(())
        }

        async fn delete_message(&self, _id: &str) -> ApiResult<()> {
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    pub(crate) fn text_update(chat_id: i64, text: &str) -> Update {
        Update::Message(Message {
            message_id: format!("mid.{chat_id}.{text}"),
            chat_id,
            sender: User {
                user_id: chat_id,
                first_name: "Test".to_string(),
                last_name: None,
                username: None,
                is_bot: false,
            },
            text: Some(text.to_string()),
            attachments: Vec::new(),
            timestamp: 0,
        })
    }

    fn pool(router: Router, config: DispatchConfig) -> (WorkerPool, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let pool = WorkerPool::new(
            router,
            ConversationStore::new(),
            Arc::new(SilentBot),
            &config,
            Arc::clone(&counters),
        );
        (pool, counters)
    }

    #[tokio::test]
    async fn test_in_flight_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let mut router = Router::new();
        {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let release = Arc::clone(&release);
            router.on_message(
                "slow",
                move || {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    let release = Arc::clone(&release);
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        release.notified().await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    }
                },
                [],
            );
        }

        let config = DispatchConfig {
            max_in_flight: 2,
            serialize_per_conversation: false,
            ..Default::default()
        };
        let (pool, counters) = pool(router, config);
        let pool = Arc::new(pool);

        pool.submit(text_update(1, "a")).await;
        pool.submit(text_update(2, "b")).await;

        // The third submit must wait for a free slot.
        let third = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.submit(text_update(3, "c")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!third.is_finished());
        assert_eq!(pool.in_flight(), 2);

        while !third.is_finished() {
            release.notify_waiters();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        while pool.in_flight() > 0 {
            release.notify_waiters();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(pool.drain(Duration::from_secs(1)).await);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(counters.snapshot(Duration::ZERO, 0, 0).handled, 3);
    }

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let running = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));

        let mut router = Router::new();
        {
            let running = Arc::clone(&running);
            let overlapped = Arc::clone(&overlapped);
            router.on_message(
                "step",
                move || {
                    let running = Arc::clone(&running);
                    let overlapped = Arc::clone(&overlapped);
                    async move {
                        if running.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlapped.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    }
                },
                [],
            );
        }

        let (pool, counters) = pool(router, DispatchConfig::default());
        for i in 0..10 {
            pool.submit(text_update(42, &i.to_string())).await;
        }

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
        assert_eq!(counters.snapshot(Duration::ZERO, 0, 0).handled, 10);
        assert_eq!(pool.conversation_locks(), 0);
    }

    #[tokio::test]
    async fn test_drain_times_out_on_stuck_handler() {
        let mut router = Router::new();
        router.on_message("stuck", || std::future::pending::<()>(), []);

        let (pool, _) = pool(router, DispatchConfig::default());
        pool.submit(text_update(1, "x")).await;

        assert!(!pool.drain(Duration::from_millis(20)).await);
        assert_eq!(pool.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_stuck_conversation_does_not_block_others() {
        let served = Arc::new(AtomicUsize::new(0));

        let mut router = Router::new();
        {
            let served = Arc::clone(&served);
            router.on_message(
                "reply",
                move |msg: Message| {
                    let served = Arc::clone(&served);
                    async move {
                        if msg.chat_id == 1 {
                            std::future::pending::<()>().await;
                        }
                        served.fetch_add(1, Ordering::SeqCst);
                    }
                },
                [],
            );
        }

        let config = DispatchConfig {
            max_in_flight: 2,
            ..Default::default()
        };
        let (pool, _) = pool(router, config);

        // Chat 1 gets stuck with a second update queued behind it.
        pool.submit(text_update(1, "a")).await;
        pool.submit(text_update(1, "b")).await;

        tokio::time::timeout(Duration::from_secs(1), pool.submit(text_update(2, "c")))
            .await
            .expect("submit for another chat must not wait on chat 1");
        tokio::time::timeout(Duration::from_secs(1), async {
            while served.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("handler for chat 2 must run");

        assert_eq!(pool.in_flight(), 2);
        assert_eq!(pool.permits.available_permits(), 1);
    }
}
