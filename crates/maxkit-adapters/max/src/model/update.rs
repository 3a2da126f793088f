//! Update payloads as the platform sends them.
//!
//! Every update is an object with an `update_type` discriminant and a
//! `timestamp`. The rest of the shape depends on the discriminant:
//!
//! ```text
//! message_created   { message: WireMessage }
//! message_callback  { callback: WireCallback, message: WireMessage? }
//! bot_started       { chat_id, user, payload? }
//! bot_added, ...    { chat_id, user, title?, ... }
//! ```

use serde::{Deserialize, Serialize};

use maxkit_core::Attachment;

/// The `update_type` values the platform may send.
///
/// Only the first three groups are routed; the rest are recognised so they
/// can be dropped quietly.
pub mod update_type {
    pub const MESSAGE_CREATED: &str = "message_created";
    pub const MESSAGE_CALLBACK: &str = "message_callback";

    pub const BOT_STARTED: &str = "bot_started";
    pub const BOT_STOPPED: &str = "bot_stopped";
    pub const BOT_ADDED: &str = "bot_added";
    pub const BOT_REMOVED: &str = "bot_removed";
    pub const USER_ADDED: &str = "user_added";
    pub const USER_REMOVED: &str = "user_removed";
    pub const CHAT_TITLE_CHANGED: &str = "chat_title_changed";

    /// Known kinds that are never routed.
    pub const UNROUTED: &[&str] = &[
        "message_edited",
        "message_removed",
        "message_chat_created",
        "dialog_muted",
        "dialog_unmuted",
        "dialog_cleared",
        "dialog_removed",
    ];
}

/// A user as embedded in update payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireUser {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// Where a message was sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub chat_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBody {
    pub mid: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Sent as `null` when the message has none.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

/// A message as embedded in update payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Absent for channel posts.
    #[serde(default)]
    pub sender: Option<WireUser>,
    pub recipient: Recipient,
    #[serde(default)]
    pub timestamp: i64,
    pub body: MessageBody,
}

/// A button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCallback {
    pub callback_id: String,
    #[serde(default)]
    pub payload: Option<String>,
    pub user: WireUser,
    #[serde(default)]
    pub timestamp: i64,
}

/// `message_created` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreated {
    pub message: WireMessage,
    #[serde(default)]
    pub timestamp: i64,
}

/// `message_callback` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCallback {
    pub callback: WireCallback,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub timestamp: i64,
}

/// Payload shared by the chat lifecycle updates.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    pub chat_id: i64,
    #[serde(default)]
    pub user: Option<WireUser>,
    /// Deep-link payload of `bot_started`.
    #[serde(default)]
    pub payload: Option<String>,
    /// New title of `chat_title_changed`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}
