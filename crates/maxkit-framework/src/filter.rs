//! Filter chain primitives.
//!
//! A [`Filter`] is an asynchronous predicate over a dispatch [`Context`].
//! Filters attached to one route are evaluated in order and combined with
//! AND (the first rejection stops evaluation); routes are tried one after
//! another, so alternatives across routes combine with OR.
//!
//! Filters must be side-effect free. They may read the update and the
//! conversation store but never write to either.
//!
//! # Example
//!
//! ```rust,ignore
//! use maxkit_framework::filter;
//!
//! router.on_message("start", start_handler, filters![filter::command("start")]);
//! router.on_message("ask_age", age_handler, filters![filter::state(ASK_AGE)]);
//! router.on_callback("confirm", confirm_handler, filters![filter::callback("confirm_yes")]);
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use maxkit_core::{LifecycleKind, Step};

use crate::context::Context;
use crate::payload::CallbackData;

/// An asynchronous, side-effect free predicate over an update.
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    /// Returns `Ok(true)` if the update is accepted.
    ///
    /// An error is treated as a failure of the route being evaluated.
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool>;

    /// A short description used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A shared Filter trait object.
pub type BoxedFilter = Arc<dyn Filter>;

/// Conversion into a [`BoxedFilter`].
pub trait IntoFilter {
    fn into_filter(self) -> BoxedFilter;
}

impl<F: Filter> IntoFilter for F {
    fn into_filter(self) -> BoxedFilter {
        Arc::new(self)
    }
}

impl IntoFilter for BoxedFilter {
    fn into_filter(self) -> BoxedFilter {
        self
    }
}

/// Builds a `Vec<BoxedFilter>` from filters of different types.
///
/// ```rust,ignore
/// router.on_message("age", ask_age, filters![filter::state(ASK_AGE), filter::from_fn(has_text)]);
/// ```
#[macro_export]
macro_rules! filters {
    () => {
        ::std::vec::Vec::<$crate::filter::BoxedFilter>::new()
    };
    ($($filter:expr),+ $(,)?) => {
        ::std::vec![$($crate::filter::IntoFilter::into_filter($filter)),+]
    };
}

// ============================================================================
// Command
// ============================================================================

/// Matches messages whose text is the given slash command.
///
/// Created by [`command`].
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
}

impl Command {
    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        let Some(rest) = text.strip_prefix('/') else {
            return false;
        };
        // The token starts right after the slash: "/ start" has an empty one.
        let token = rest
            .split(|c: char| c.is_whitespace() || c == '@')
            .next()
            .unwrap_or_default();
        !token.is_empty() && token == self.name
    }
}

#[async_trait]
impl Filter for Command {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx.update().text().is_some_and(|text| self.matches(text)))
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Matches a message whose text is `/name`, optionally followed by
/// `@botname` and arguments.
///
/// The comparison is case-insensitive and a leading `/` in `name` is
/// ignored, so `command("start")` and `command("/Start")` are equivalent.
pub fn command(name: impl AsRef<str>) -> Command {
    let name = name.as_ref();
    Command {
        name: name.strip_prefix('/').unwrap_or(name).to_lowercase(),
    }
}

// ============================================================================
// Text
// ============================================================================

/// Matches messages whose text equals a literal.
///
/// Created by [`text`].
#[derive(Debug, Clone)]
pub struct Text {
    literal: String,
}

#[async_trait]
impl Filter for Text {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx
            .update()
            .text()
            .is_some_and(|text| text.to_lowercase() == self.literal))
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Matches a message whose text equals `literal`, ignoring case.
///
/// The text is not trimmed.
pub fn text(literal: impl AsRef<str>) -> Text {
    Text {
        literal: literal.as_ref().to_lowercase(),
    }
}

// ============================================================================
// Conversation state
// ============================================================================

/// Matches updates whose conversation is at a given step.
///
/// Created by [`state`].
#[derive(Debug, Clone, Copy)]
pub struct State {
    step: Step,
}

#[async_trait]
impl Filter for State {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx.current_step() == Some(self.step))
    }

    fn name(&self) -> &str {
        "state"
    }
}

/// Matches when the update's conversation is currently at `step`.
pub fn state(step: impl Into<Step>) -> State {
    State { step: step.into() }
}

/// Matches updates whose conversation has no active step.
///
/// Created by [`idle`].
#[derive(Debug, Clone, Copy)]
pub struct Idle;

#[async_trait]
impl Filter for Idle {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx.current_step().is_none())
    }

    fn name(&self) -> &str {
        "idle"
    }
}

/// Matches when the update's conversation is not inside any flow.
pub fn idle() -> Idle {
    Idle
}

// ============================================================================
// Callback payloads
// ============================================================================

/// Matches callback queries by payload.
///
/// Created by [`callback`], [`callback_matches`] and [`callback_action`].
pub struct Callback {
    label: &'static str,
    predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("label", &self.label).finish_non_exhaustive()
    }
}

#[async_trait]
impl Filter for Callback {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx
            .update()
            .as_callback()
            .is_some_and(|query| (self.predicate)(&query.payload)))
    }

    fn name(&self) -> &str {
        self.label
    }
}

/// Matches a callback query whose payload equals `value` exactly.
pub fn callback(value: impl Into<String>) -> Callback {
    let value = value.into();
    Callback {
        label: "callback",
        predicate: Box::new(move |payload: &str| payload == value),
    }
}

/// Matches a callback query whose payload satisfies `predicate`.
///
/// ```rust,ignore
/// filter::callback_matches(|p| p.starts_with("pet_"))
/// ```
pub fn callback_matches<P>(predicate: P) -> Callback
where
    P: Fn(&str) -> bool + Send + Sync + 'static,
{
    Callback {
        label: "callback_matches",
        predicate: Box::new(predicate),
    }
}

/// Matches a callback query carrying a structured payload with `action`.
///
/// Payloads that do not parse as [`CallbackData`] are rejected.
pub fn callback_action(action: impl Into<String>) -> Callback {
    let action = action.into();
    Callback {
        label: "callback_action",
        predicate: Box::new(move |payload: &str| {
            CallbackData::parse(payload).is_ok_and(|data| data.action() == action)
        }),
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Matches lifecycle events of one kind.
///
/// Created by [`lifecycle`].
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    kind: LifecycleKind,
}

#[async_trait]
impl Filter for Lifecycle {
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx.update().as_lifecycle().is_some_and(|ev| ev.kind == self.kind))
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}

/// Matches a lifecycle event of `kind`.
pub fn lifecycle(kind: LifecycleKind) -> Lifecycle {
    Lifecycle { kind }
}

// ============================================================================
// Closures
// ============================================================================

/// A filter backed by a synchronous closure.
///
/// Created by [`from_fn`].
pub struct FnFilter<F> {
    f: F,
}

#[async_trait]
impl<F> Filter for FnFilter<F>
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    async fn check(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok((self.f)(ctx))
    }

    fn name(&self) -> &str {
        "from_fn"
    }
}

/// Wraps a closure as a filter.
///
/// ```rust,ignore
/// filter::from_fn(|ctx| ctx.chat_id() > 0)
/// ```
pub fn from_fn<F>(f: F) -> FnFilter<F>
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    FnFilter { f }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::ConversationStore;
    use maxkit_core::{
        ApiResult, Bot, BoxedBot, CallbackAnswer, CallbackQuery, LifecycleEvent, Message,
        NewMessage, SentMessage, Target, Update, User,
    };
    use std::any::Any;

    pub(crate) struct MockBot;

    #[async_trait]
    impl Bot for MockBot {
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

    pub(crate) fn mock_bot() -> BoxedBot {
        Arc::new(MockBot)
    }

    fn user() -> User {
        User {
            user_id: 7,
            first_name: "Ada".into(),
            last_name: None,
            username: None,
            is_bot: false,
        }
    }

    pub(crate) fn message(chat_id: i64, text: &str) -> Update {
        Update::Message(Message {
            message_id: "mid.1".into(),
            chat_id,
            sender: user(),
            text: Some(text.into()),
            attachments: Vec::new(),
            timestamp: 0,
        })
    }

    pub(crate) fn callback_query(chat_id: i64, payload: &str) -> Update {
        Update::CallbackQuery(CallbackQuery {
            callback_id: "cb.1".into(),
            chat_id,
            sender: user(),
            payload: payload.into(),
            timestamp: 0,
            message: None,
        })
    }

    fn ctx(update: Update) -> Context {
        Context::new(update, ConversationStore::new(), mock_bot())
    }

    async fn accepts(filter: impl Filter, update: Update) -> bool {
        filter.check(&ctx(update)).await.unwrap()
    }

    #[tokio::test]
    async fn test_command_filter() {
        assert!(accepts(command("start"), message(1, "/start")).await);
        assert!(accepts(command("start"), message(1, "/start@SomeBot")).await);
        assert!(accepts(command("start"), message(1, "/START payload")).await);
        assert!(accepts(command("/Start"), message(1, "/start")).await);

        assert!(!accepts(command("start"), message(1, "start")).await);
        assert!(!accepts(command("start"), message(1, "/started")).await);
        assert!(!accepts(command("start"), message(1, "/")).await);
        assert!(!accepts(command("start"), message(1, "/ start")).await);
        assert!(!accepts(command("start"), message(1, "/@SomeBot start")).await);
        assert!(!accepts(command("start"), callback_query(1, "/start")).await);
    }

    #[tokio::test]
    async fn test_text_filter() {
        assert!(accepts(text("Найти приют"), message(1, "найти приют")).await);
        assert!(!accepts(text("yes"), message(1, " yes")).await);
        assert!(!accepts(text("yes"), callback_query(1, "yes")).await);
    }

    #[tokio::test]
    async fn test_state_and_idle_filters() {
        const ASK: Step = Step::new("form", "ask");
        const OTHER: Step = Step::new("other", "ask");

        let store = ConversationStore::new();
        let ctx = Context::new(message(5, "hi"), store.clone(), mock_bot());

        assert!(idle().check(&ctx).await.unwrap());
        assert!(!state(ASK).check(&ctx).await.unwrap());

        store.set_state(5, ASK);
        assert!(state(ASK).check(&ctx).await.unwrap());
        assert!(!state(OTHER).check(&ctx).await.unwrap());
        assert!(!idle().check(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_callback_filters() {
        assert!(accepts(callback("confirm_yes"), callback_query(1, "confirm_yes")).await);
        assert!(!accepts(callback("confirm_yes"), callback_query(1, "confirm_no")).await);
        assert!(!accepts(callback("confirm_yes"), message(1, "confirm_yes")).await);

        let prefixed = || callback_matches(|p| p.starts_with("pet_"));
        assert!(accepts(prefixed(), callback_query(1, "pet_12")).await);
        assert!(!accepts(prefixed(), callback_query(1, "shelter_12")).await);

        assert!(accepts(callback_action("pet"), callback_query(1, "pet:delete:4")).await);
        assert!(!accepts(callback_action("pet"), callback_query(1, "pets:delete")).await);
        assert!(!accepts(callback_action("pet"), callback_query(1, ":broken")).await);
    }

    #[tokio::test]
    async fn test_lifecycle_and_fn_filters() {
        let started = Update::Lifecycle(LifecycleEvent {
            kind: LifecycleKind::BotStarted,
            chat_id: 3,
            user: Some(user()),
            payload: None,
            timestamp: 0,
        });

        assert!(accepts(lifecycle(LifecycleKind::BotStarted), started.clone()).await);
        assert!(!accepts(lifecycle(LifecycleKind::BotStopped), started).await);

        assert!(accepts(from_fn(|ctx| ctx.chat_id() == 3), message(3, "x")).await);
        assert!(!accepts(from_fn(|ctx| ctx.chat_id() == 3), message(4, "x")).await);
    }
}
