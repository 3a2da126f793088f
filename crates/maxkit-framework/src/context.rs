//! Dispatch context.
//!
//! A [`Context`] is created once per normalized update and carries everything
//! filters and handlers may look at:
//!
//! - the update itself, shared behind an `Arc`
//! - the [`ConversationStore`] the router consults for `state` filters
//! - the outbound [`Bot`](maxkit_core::Bot) client
//!
//! Cloning a context is cheap; all three parts are reference counted.

use std::sync::Arc;

use maxkit_core::{BoxedBot, Step, Update};

use crate::state::{Conversation, ConversationStore};

/// The context handed to filters and handlers for one update.
#[derive(Clone)]
pub struct Context {
    update: Arc<Update>,
    store: ConversationStore,
    bot: BoxedBot,
}

impl Context {
    /// Creates a new context.
    pub fn new(update: impl Into<Arc<Update>>, store: ConversationStore, bot: BoxedBot) -> Self {
        Self {
            update: update.into(),
            store,
            bot,
        }
    }

    /// Returns the update being dispatched.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns a clone of the shared update.
    pub fn update_arc(&self) -> Arc<Update> {
        Arc::clone(&self.update)
    }

    /// Returns the conversation id of the update.
    pub fn chat_id(&self) -> i64 {
        self.update.chat_id()
    }

    /// Returns the conversation state store.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Returns a store handle bound to this update's conversation.
    pub fn conversation(&self) -> Conversation {
        self.store.conversation(self.chat_id())
    }

    /// Returns the current step of this update's conversation.
    pub fn current_step(&self) -> Option<Step> {
        self.store.get_state(self.chat_id())
    }

    /// Returns a reference to the bot.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns a clone of the bot `Arc`.
    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update", &self.update)
            .field("records", &self.store.len())
            .finish_non_exhaustive()
    }
}
