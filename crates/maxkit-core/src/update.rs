//! Canonical update model.
//!
//! Every payload received from the platform is normalized into exactly one
//! [`Update`] variant before it reaches the router:
//!
//! ```text
//! Update
//! ├── Message          ← a user wrote something
//! ├── CallbackQuery    ← a user pressed an inline button
//! └── Lifecycle        ← bot started / added / removed, chat renamed, …
//! ```
//!
//! The variant is decided once, by the normalizer, and is never
//! reinterpreted downstream. Routing keys on [`UpdateKind`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Update Kind
// ============================================================================

/// The routing category of an update.
///
/// The router keeps one ordered handler list per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A new message in a conversation.
    Message,
    /// An inline button press.
    CallbackQuery,
    /// A lifecycle notification (bot started, added to chat, …).
    Lifecycle,
}

impl UpdateKind {
    /// Returns the kind as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::CallbackQuery => "callback_query",
            Self::Lifecycle => "lifecycle",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Participants
// ============================================================================

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    /// Returns the first and last name joined by a space.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// An attachment carried by a message (image, file, keyboard, …).
///
/// The payload is kept as raw JSON; only the attachment type is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

// ============================================================================
// Variants
// ============================================================================

/// A message written in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub chat_id: i64,
    pub sender: User,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
    pub timestamp: i64,
}

impl Message {
    /// Returns the message text, or an empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// An inline button press.
///
/// `chat_id` is the conversation of the message that carried the button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub chat_id: i64,
    pub sender: User,
    pub payload: String,
    pub timestamp: i64,
    /// The message the pressed button was attached to.
    pub message: Option<Message>,
}

/// The kind of a lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    BotStarted,
    BotStopped,
    BotAdded,
    BotRemoved,
    UserAdded,
    UserRemoved,
    ChatTitleChanged,
}

impl LifecycleKind {
    /// Returns the platform discriminant for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BotStarted => "bot_started",
            Self::BotStopped => "bot_stopped",
            Self::BotAdded => "bot_added",
            Self::BotRemoved => "bot_removed",
            Self::UserAdded => "user_added",
            Self::UserRemoved => "user_removed",
            Self::ChatTitleChanged => "chat_title_changed",
        }
    }
}

/// A lifecycle notification about a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub chat_id: i64,
    pub user: Option<User>,
    /// Deep-link payload for `bot_started`, new title for `chat_title_changed`.
    pub payload: Option<String>,
    pub timestamp: i64,
}

// ============================================================================
// Update
// ============================================================================

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Update {
    Message(Message),
    CallbackQuery(CallbackQuery),
    Lifecycle(LifecycleEvent),
}

impl Update {
    /// Returns the routing category of this update.
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::Lifecycle(_) => UpdateKind::Lifecycle,
        }
    }

    /// Returns the conversation this update belongs to.
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.chat_id,
            Self::CallbackQuery(c) => c.chat_id,
            Self::Lifecycle(l) => l.chat_id,
        }
    }

    /// Returns the user that caused this update, if known.
    pub fn sender(&self) -> Option<&User> {
        match self {
            Self::Message(m) => Some(&m.sender),
            Self::CallbackQuery(c) => Some(&c.sender),
            Self::Lifecycle(l) => l.user.as_ref(),
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Message(m) => m.timestamp,
            Self::CallbackQuery(c) => c.timestamp,
            Self::Lifecycle(l) => l.timestamp,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&CallbackQuery> {
        match self {
            Self::CallbackQuery(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_lifecycle(&self) -> Option<&LifecycleEvent> {
        match self {
            Self::Lifecycle(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the message text for message updates.
    pub fn text(&self) -> Option<&str> {
        self.as_message().and_then(|m| m.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            user_id: 7,
            first_name: "Ada".into(),
            last_name: Some("Lovelace".into()),
            username: None,
            is_bot: false,
        }
    }

    #[test]
    fn test_accessors_follow_variant() {
        let update = Update::CallbackQuery(CallbackQuery {
            callback_id: "cb-1".into(),
            chat_id: 42,
            sender: user(),
            payload: "confirm_yes".into(),
            timestamp: 100,
            message: None,
        });

        assert_eq!(update.kind(), UpdateKind::CallbackQuery);
        assert_eq!(update.chat_id(), 42);
        assert_eq!(update.sender().map(|u| u.user_id), Some(7));
        assert!(update.as_message().is_none());
        assert!(update.text().is_none());
    }

    #[test]
    fn test_lifecycle_without_user() {
        let update = Update::Lifecycle(LifecycleEvent {
            kind: LifecycleKind::BotAdded,
            chat_id: -5,
            user: None,
            payload: None,
            timestamp: 1,
        });
        assert_eq!(update.kind().as_str(), "lifecycle");
        assert!(update.sender().is_none());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user().full_name(), "Ada Lovelace");
        let mut u = user();
        u.last_name = None;
        assert_eq!(u.full_name(), "Ada");
    }
}
