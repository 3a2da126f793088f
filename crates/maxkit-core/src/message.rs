//! Outgoing message types.
//!
//! These types describe what handlers hand to a [`Bot`](crate::bot::Bot)
//! for delivery. They serialize to the platform's request bodies:
//!
//! ```text
//! NewMessage { text, attachments: [ {type: "inline_keyboard", payload: {buttons}} ], … }
//! CallbackAnswer { message?: NewMessage, notification?: String }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Delivery Target
// ============================================================================

/// Where a new message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A conversation, by chat id.
    Chat(i64),
    /// A user's dialog with the bot, by user id.
    User(i64),
}

// ============================================================================
// Text Format
// ============================================================================

/// Markup applied to message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Markdown,
    Html,
}

// ============================================================================
// Inline Keyboard
// ============================================================================

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    /// Pressing the button produces a callback update carrying `payload`.
    Callback { text: String, payload: String },
    /// Pressing the button opens `url`.
    Link { text: String, url: String },
}

impl Button {
    /// Creates a callback button.
    pub fn callback(text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Callback {
            text: text.into(),
            payload: payload.into(),
        }
    }

    /// Creates a link button.
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// A grid of inline buttons, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    rows: Vec<Vec<Button>>,
}

impl InlineKeyboard {
    /// Creates an empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row of buttons.
    pub fn row(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    /// Returns the keyboard rows.
    pub fn rows(&self) -> &[Vec<Button>] {
        &self.rows
    }

    /// Converts the keyboard into a message attachment.
    pub fn into_attachment(self) -> Value {
        json!({
            "type": "inline_keyboard",
            "payload": { "buttons": self.rows },
        })
    }
}

// ============================================================================
// New Message
// ============================================================================

/// Body of a message to send or of an edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
    #[serde(default = "default_notify")]
    pub notify: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_link_preview: bool,
}

fn default_notify() -> bool {
    true
}

impl NewMessage {
    /// Creates a plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            notify: true,
            ..Default::default()
        }
    }

    /// Attaches an inline keyboard.
    pub fn keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.attachments.push(keyboard.into_attachment());
        self
    }

    /// Attaches a raw attachment value.
    pub fn attachment(mut self, attachment: Value) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Sets the text markup.
    pub fn format(mut self, format: TextFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Disables link previews.
    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

// ============================================================================
// Callback Answer
// ============================================================================

/// Acknowledgement of a button press.
///
/// `message` replaces the message that carried the button;
/// `notification` shows a one-off toast to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<NewMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

impl CallbackAnswer {
    /// Answers with a notification only.
    pub fn notify(text: impl Into<String>) -> Self {
        Self {
            message: None,
            notification: Some(text.into()),
        }
    }

    /// Answers by replacing the originating message.
    pub fn replace(message: NewMessage) -> Self {
        Self {
            message: Some(message),
            notification: None,
        }
    }
}

/// Acknowledgement returned by the platform after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Platform message id (`mid`), when the platform returned one.
    pub message_id: Option<String>,
}
