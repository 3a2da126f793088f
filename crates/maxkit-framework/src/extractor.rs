//! Handler parameter extraction.
//!
//! Any type implementing [`FromContext`] can be used as a handler parameter;
//! the router builds each argument from the dispatch [`Context`] before the
//! handler runs.
//!
//! | Extractor              | Yields                                     |
//! |------------------------|--------------------------------------------|
//! | `Arc<Update>`          | the update, any kind                       |
//! | `Message`              | message updates                            |
//! | `CallbackQuery`        | callback queries                           |
//! | `LifecycleEvent`       | lifecycle events                           |
//! | `CallbackData`         | parsed structured payload of a callback    |
//! | `ConversationStore`    | the whole store                            |
//! | `Conversation`         | the store bound to the update's chat       |
//! | `BoxedBot`             | the outbound client                        |
//! | `Option<T>`            | `Some` if `T` extracts, never fails        |
//!
//! A failed extraction fails the handler: the router reports it like any
//! other handler error.

use std::sync::Arc;

use maxkit_core::{BoxedBot, CallbackQuery, LifecycleEvent, Message, Update, UpdateKind};

use crate::context::Context;
use crate::error::{ExtractError, ExtractResult};
use crate::payload::CallbackData;
use crate::state::{Conversation, ConversationStore};

/// A type that can be extracted from a [`Context`].
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Context) -> ExtractResult<Self>;
}

fn mismatch(expected: UpdateKind, ctx: &Context) -> ExtractError {
    ExtractError::KindMismatch {
        expected: expected.as_str(),
        got: ctx.update().kind().as_str(),
    }
}

impl FromContext for Arc<Update> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.update_arc())
    }
}

impl FromContext for Message {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        ctx.update()
            .as_message()
            .cloned()
            .ok_or_else(|| mismatch(UpdateKind::Message, ctx))
    }
}

impl FromContext for CallbackQuery {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        ctx.update()
            .as_callback()
            .cloned()
            .ok_or_else(|| mismatch(UpdateKind::CallbackQuery, ctx))
    }
}

impl FromContext for LifecycleEvent {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        ctx.update()
            .as_lifecycle()
            .cloned()
            .ok_or_else(|| mismatch(UpdateKind::Lifecycle, ctx))
    }
}

impl FromContext for CallbackData {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        let query = ctx
            .update()
            .as_callback()
            .ok_or_else(|| mismatch(UpdateKind::CallbackQuery, ctx))?;
        Ok(CallbackData::parse(&query.payload)?)
    }
}

impl FromContext for ConversationStore {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.store().clone())
    }
}

impl FromContext for Conversation {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.conversation())
    }
}

/// Injects the bot so handlers can reply:
///
/// ```rust,ignore
/// async fn greet(bot: BoxedBot, msg: Message) -> anyhow::Result<()> {
///     bot.send_message(Target::Chat(msg.chat_id), NewMessage::text("Hi!")).await?;
///     Ok(())
/// }
/// ```
impl FromContext for BoxedBot {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.bot_arc())
    }
}

impl FromContext for Context {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.clone())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}
