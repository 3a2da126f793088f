//! Conversation state store.
//!
//! The store maps a conversation id to its current [`Step`] and a scratch map
//! of JSON values collected along the flow:
//!
//! ```text
//! chat_id ─▶ Record { step: Option<Step>, scratch: { "name": "Rex", "age": 3 } }
//! ```
//!
//! A record exists only while the conversation has an active step or scratch
//! data. It is created by [`set_state`](ConversationStore::set_state) and
//! removed by [`erase_state`](ConversationStore::erase_state); nothing expires
//! on its own, so flows must erase their record when they finish.
//!
//! Every operation takes the store lock once and is therefore atomic for its
//! key. Sequences of operations are not: two handlers of the same
//! conversation running concurrently can interleave. Use
//! [`modify`](ConversationStore::modify) for read-modify-write, or let the
//! runtime serialize handlers per conversation.
//!
//! # Example
//!
//! ```rust,ignore
//! const ASK_AGE: Step = Step::new("form", "age");
//!
//! store.set_state(chat_id, ASK_AGE);
//! store.set_data(chat_id, "name", "Ada")?;
//! let name: Option<String> = store.get_data(chat_id, "name")?;
//! store.erase_state(chat_id);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

use maxkit_core::Step;

use crate::error::{StateError, StateResult};

/// Scratch data of one conversation.
pub type Scratch = Map<String, Value>;

#[derive(Debug, Clone, Default)]
struct Record {
    step: Option<Step>,
    scratch: Scratch,
}

/// In-memory store of per-conversation flow state.
///
/// Cloning is cheap and every clone shares the same records.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    records: Arc<RwLock<HashMap<i64, Record>>>,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current step, keeping existing scratch data.
    ///
    /// Creates the record with an empty scratch map if none exists.
    pub fn set_state(&self, chat_id: i64, step: impl Into<Step>) {
        let step = step.into();
        trace!(chat_id, %step, "Setting conversation step");
        self.records.write().entry(chat_id).or_default().step = Some(step);
    }

    /// Returns the current step, or `None` if the conversation is idle.
    pub fn get_state(&self, chat_id: i64) -> Option<Step> {
        self.records.read().get(&chat_id).and_then(|r| r.step)
    }

    /// Returns `true` if the conversation has no record.
    pub fn is_idle(&self, chat_id: i64) -> bool {
        !self.records.read().contains_key(&chat_id)
    }

    /// Removes the conversation's record, returning it to idle.
    ///
    /// Returns `true` if a record was removed.
    pub fn erase_state(&self, chat_id: i64) -> bool {
        let removed = self.records.write().remove(&chat_id).is_some();
        trace!(chat_id, removed, "Erased conversation state");
        removed
    }

    /// Stores a scratch value.
    ///
    /// Fails with [`StateError::NoActiveRecord`] if no step was set first.
    pub fn set_data<T: Serialize>(&self, chat_id: i64, key: &str, value: T) -> StateResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StateError::Conversion {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let mut records = self.records.write();
        let record = records
            .get_mut(&chat_id)
            .ok_or(StateError::NoActiveRecord { chat_id })?;
        record.scratch.insert(key.to_string(), value);
        Ok(())
    }

    /// Same as [`set_data`](Self::set_data).
    pub fn update<T: Serialize>(&self, chat_id: i64, key: &str, value: T) -> StateResult<()> {
        self.set_data(chat_id, key, value)
    }

    /// Reads a scratch value.
    ///
    /// Returns `Ok(None)` if the key is absent and fails with
    /// [`StateError::NoActiveRecord`] if the conversation has no record.
    pub fn get_data<T: DeserializeOwned>(&self, chat_id: i64, key: &str) -> StateResult<Option<T>> {
        let value = {
            let records = self.records.read();
            let record = records
                .get(&chat_id)
                .ok_or(StateError::NoActiveRecord { chat_id })?;
            record.scratch.get(key).cloned()
        };

        value
            .map(|v| {
                serde_json::from_value(v).map_err(|e| StateError::Conversion {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Returns a copy of the whole scratch map.
    pub fn get_all_data(&self, chat_id: i64) -> StateResult<Scratch> {
        self.records
            .read()
            .get(&chat_id)
            .map(|r| r.scratch.clone())
            .ok_or(StateError::NoActiveRecord { chat_id })
    }

    /// Runs `f` on the scratch map while holding the store lock.
    ///
    /// `f` must not call back into the store.
    pub fn modify<R>(&self, chat_id: i64, f: impl FnOnce(&mut Scratch) -> R) -> StateResult<R> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&chat_id)
            .ok_or(StateError::NoActiveRecord { chat_id })?;
        Ok(f(&mut record.scratch))
    }

    /// Returns the number of resident records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no conversation has a record.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns a handle bound to one conversation.
    pub fn conversation(&self, chat_id: i64) -> Conversation {
        Conversation {
            store: self.clone(),
            chat_id,
        }
    }
}

/// A [`ConversationStore`] handle bound to a single conversation.
///
/// Handlers receive it as an extractor so they do not have to repeat the
/// conversation id on every call.
#[derive(Debug, Clone)]
pub struct Conversation {
    store: ConversationStore,
    chat_id: i64,
}

impl Conversation {
    /// Returns the conversation id.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn set_state(&self, step: impl Into<Step>) {
        self.store.set_state(self.chat_id, step);
    }

    pub fn get_state(&self) -> Option<Step> {
        self.store.get_state(self.chat_id)
    }

    pub fn is_idle(&self) -> bool {
        self.store.is_idle(self.chat_id)
    }

    pub fn erase_state(&self) -> bool {
        self.store.erase_state(self.chat_id)
    }

    pub fn set_data<T: Serialize>(&self, key: &str, value: T) -> StateResult<()> {
        self.store.set_data(self.chat_id, key, value)
    }

    pub fn get_data<T: DeserializeOwned>(&self, key: &str) -> StateResult<Option<T>> {
        self.store.get_data(self.chat_id, key)
    }

    /// Reads a scratch value that the flow must have stored earlier.
    pub fn require_data<T: DeserializeOwned>(&self, key: &str) -> StateResult<T> {
        self.get_data(key)?.ok_or_else(|| StateError::Conversion {
            key: key.to_string(),
            reason: "value is missing".to_string(),
        })
    }

    pub fn get_all_data(&self) -> StateResult<Scratch> {
        self.store.get_all_data(self.chat_id)
    }

    pub fn modify<R>(&self, f: impl FnOnce(&mut Scratch) -> R) -> StateResult<R> {
        self.store.modify(self.chat_id, f)
    }
}
