//! Long-poll loop tests driven by a scripted update source.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

use maxkit_core::{
    ApiError, ApiResult, Bot, CallbackAnswer, NewMessage, ParseResult, PollRequest, SentMessage,
    Target, Update, UpdateBatch, UpdateSource,
};
use maxkit_framework::{Router, filter, filters};
use maxkit_runtime::config::{MaxApiConfig, MaxkitConfig, PollingConfig};
use maxkit_runtime::{MaxkitRuntime, RuntimeError};

// =============================================================================
// Fixtures
// =============================================================================

enum Scripted {
    Fail,
    Batch(Vec<Value>, Option<i64>),
}

/// Replays a script of poll results, then signals `exhausted` and keeps
/// returning empty batches.
struct ScriptedSource {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PollRequest>>,
    exhausted: Arc<Notify>,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            exhausted: Arc::new(Notify::new()),
        })
    }

    fn markers(&self) -> Vec<Option<i64>> {
        self.requests.lock().iter().map(|r| r.marker).collect()
    }

    fn shutdown(&self) -> impl Future<Output = ()> + use<> {
        let exhausted = Arc::clone(&self.exhausted);
        async move { exhausted.notified().await }
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn poll(&self, request: &PollRequest) -> ApiResult<UpdateBatch> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Fail) => Err(ApiError::Transport("connection reset".to_string())),
            Some(Scripted::Batch(updates, marker)) => Ok(UpdateBatch { updates, marker }),
            None => {
                self.exhausted.notify_one();
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(UpdateBatch::default())
            }
        }
    }

    fn parse_update(&self, raw: &Value) -> ParseResult<Update> {
        maxkit_adapter_max::parse_update(raw)
    }
}

#[derive(Default)]
struct CountingBot {
    sent: AtomicUsize,
}

#[async_trait]
impl Bot for CountingBot {
    async fn send_message(&self, _target: Target, _message: NewMessage) -> ApiResult<SentMessage> {
        self.sent.fetch_add(1, Ordering::SeqCst);
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

/// Collects formatted log output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn message(chat_id: i64, text: &str) -> Value {
    json!({
        "update_type": "message_created",
        "timestamp": 1_700_000_000_000_i64,
        "message": {
            "sender": { "user_id": chat_id, "first_name": "Ada", "is_bot": false },
            "recipient": { "chat_id": chat_id, "chat_type": "dialog" },
            "timestamp": 1_700_000_000_000_i64,
            "body": { "mid": format!("mid.{chat_id}.{text}"), "text": text }
        }
    })
}

fn config() -> MaxkitConfig {
    MaxkitConfig {
        bot: MaxApiConfig::new("test-token"),
        polling: PollingConfig {
            backoff_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn runtime(config: MaxkitConfig, source: Arc<ScriptedSource>, bot: Arc<CountingBot>) -> MaxkitRuntime {
    MaxkitRuntime::builder()
        .config(config)
        .source(source)
        .bot(bot)
        .without_logging()
        .build()
        .unwrap()
}

/// A router whose `/start` handler sends one message.
fn start_router() -> Router {
    async fn start(bot: maxkit_core::BoxedBot, msg: maxkit_core::Message) -> anyhow::Result<()> {
        bot.send_message(Target::Chat(msg.chat_id), NewMessage::text("Hello"))
            .await?;
        Ok(())
    }

    let mut router = Router::new();
    router.on_message("start", start, filters![filter::command("start")]);
    router
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_recovers_after_failures_below_threshold() {
    let source = ScriptedSource::new([
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Batch(vec![message(1, "/start")], Some(7)),
        Scripted::Fail,
        Scripted::Batch(vec![message(2, "/start")], Some(8)),
    ]);
    let bot = Arc::new(CountingBot::default());
    let runtime = runtime(config(), Arc::clone(&source), Arc::clone(&bot));

    runtime
        .run_until(start_router(), source.shutdown())
        .await
        .unwrap();

    let stats = runtime.stats();
    assert_eq!(stats.poll_failures, 5);
    assert_eq!(stats.handled, 2);
    assert_eq!(bot.sent.load(Ordering::SeqCst), 2);
    assert!(!runtime.is_running());

    // The marker of a successful batch is carried into every later poll.
    let markers = source.markers();
    assert_eq!(&markers[..5], &[None; 5]);
    assert_eq!(markers[5], Some(7));
    assert_eq!(markers[6], Some(7));
    assert_eq!(markers[7], Some(8));
}

#[tokio::test]
async fn test_aborts_after_threshold() {
    let source = ScriptedSource::new([
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Fail,
        Scripted::Batch(vec![message(1, "/start")], Some(1)),
    ]);
    let bot = Arc::new(CountingBot::default());
    let runtime = runtime(config(), Arc::clone(&source), Arc::clone(&bot));

    let result = runtime
        .run_until(start_router(), std::future::pending())
        .await;

    match result {
        Err(RuntimeError::PollingAborted { failures, last_error }) => {
            assert_eq!(failures, 5);
            assert!(last_error.is_transient());
        }
        other => panic!("expected PollingAborted, got {other:?}"),
    }
    assert_eq!(source.requests.lock().len(), 5);
    assert_eq!(bot.sent.load(Ordering::SeqCst), 0);
    assert!(!runtime.is_running());
}

#[tokio::test]
async fn test_unknown_update_is_dropped_and_counted() {
    let source = ScriptedSource::new([Scripted::Batch(
        vec![
            json!({ "update_type": "hologram_received", "chat_id": 1 }),
            json!({ "update_type": "message_edited", "message": {} }),
            message(3, "/start"),
        ],
        Some(3),
    )]);
    let bot = Arc::new(CountingBot::default());
    let runtime = runtime(config(), Arc::clone(&source), Arc::clone(&bot));

    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    {
        let calls = Arc::clone(&calls);
        router.on_message(
            "any",
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            },
            [],
        );
    }

    runtime.run_until(router, source.shutdown()).await.unwrap();

    let stats = runtime.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.dispatched, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dropped_update_is_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let source = ScriptedSource::new([Scripted::Batch(
        vec![
            json!({ "update_type": "hologram_received", "chat_id": 1 }),
            json!({ "update_type": "message_edited", "message": {} }),
        ],
        Some(2),
    )]);
    let runtime = runtime(config(), Arc::clone(&source), Arc::new(CountingBot::default()));

    runtime.run_until(Router::new(), source.shutdown()).await.unwrap();

    let lines = logs.lines();
    let dropped = |level: &str, kind: &str| {
        lines
            .iter()
            .any(|line| line.contains(level) && line.contains("Dropping update") && line.contains(kind))
    };
    assert!(dropped("WARN", "unknown update type 'hologram_received'"), "{lines:#?}");
    assert!(dropped("DEBUG", "unsupported update type 'message_edited'"), "{lines:#?}");
    assert_eq!(runtime.stats().dropped, 2);
}

#[tokio::test]
async fn test_failing_handler_does_not_affect_others() {
    async fn explode(msg: maxkit_core::Message) {
        if msg.chat_id == 1 {
            panic!("handler bug");
        }
    }

    let source = ScriptedSource::new([Scripted::Batch(
        vec![message(1, "boom"), message(2, "boom"), message(3, "/start")],
        None,
    )]);
    let bot = Arc::new(CountingBot::default());
    let runtime = runtime(config(), Arc::clone(&source), Arc::clone(&bot));

    let mut router = start_router();
    router.on_message("explode", explode, []);

    runtime.run_until(router, source.shutdown()).await.unwrap();

    let stats = runtime.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.handled, 2);
    assert_eq!(bot.sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_skip_updates_discards_pending_batch() {
    let source = ScriptedSource::new([
        Scripted::Batch(vec![message(1, "/start"), message(2, "/start")], Some(40)),
        Scripted::Batch(vec![message(3, "/start")], Some(41)),
    ]);
    let bot = Arc::new(CountingBot::default());
    let mut config = config();
    config.polling.skip_updates = true;
    let runtime = runtime(config, Arc::clone(&source), Arc::clone(&bot));

    runtime
        .run_until(start_router(), source.shutdown())
        .await
        .unwrap();

    assert_eq!(bot.sent.load(Ordering::SeqCst), 1);

    let requests = source.requests.lock();
    assert_eq!(requests[0].timeout, Duration::ZERO);
    assert_eq!(requests[1].marker, Some(40));
    assert_eq!(requests[1].timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn test_stop_ends_the_loop() {
    let source = ScriptedSource::new([]);
    let bot = Arc::new(CountingBot::default());
    let runtime = Arc::new(runtime(config(), Arc::clone(&source), bot));

    let handle = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.run_until(Router::new(), std::future::pending()).await })
    };

    while !runtime.is_running() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(matches!(
        runtime.run_until(Router::new(), std::future::pending()).await,
        Err(RuntimeError::AlreadyRunning)
    ));

    runtime.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!runtime.is_running());
}
