//! Bot trait for outbound delivery.
//!
//! A `Bot` is the client handlers use to talk back to the platform. The
//! router never calls it; it only hands it to handlers through the dispatch
//! context.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::message::{CallbackAnswer, NewMessage, SentMessage, Target};

/// The core Bot trait.
///
/// Concrete implementations (e.g. `MaxApi`) may expose further
/// platform-specific calls; handlers reach them by downcasting through
/// [`as_any`](Bot::as_any).
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Sends a new message to a chat or user.
    async fn send_message(&self, target: Target, message: NewMessage) -> ApiResult<SentMessage>;

    /// Acknowledges a button press, optionally replacing its message.
    async fn answer_callback(&self, callback_id: &str, answer: CallbackAnswer) -> ApiResult<()>;

    /// Replaces the content of a sent message.
    async fn edit_message(&self, message_id: &str, message: NewMessage) -> ApiResult<()>;

    /// Deletes a sent message.
    async fn delete_message(&self, message_id: &str) -> ApiResult<()>;

    /// Returns self as an `Arc<dyn Any>` for downcasting to the concrete client.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;
