//! Request and response bodies of the platform REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use maxkit_core::{CallbackAnswer, NewMessage};

use super::update::{MessageBody, WireUser};

/// `GET /updates` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatesResponse {
    #[serde(default)]
    pub updates: Vec<Value>,
    #[serde(default)]
    pub marker: Option<i64>,
}

/// `GET /me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    #[serde(flatten)]
    pub user: WireUser,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /chats/{chat_id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub chat_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub participants_count: Option<u64>,
    #[serde(default)]
    pub last_event_time: Option<i64>,
}

/// Body of `POST /messages` and `PUT /messages`.
///
/// `text` is always sent and `attachments` defaults to an empty list.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest<'a> {
    pub text: &'a str,
    pub attachments: &'a [Value],
    pub notify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<maxkit_core::TextFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_link_preview: bool,
}

impl<'a> From<&'a NewMessage> for MessageRequest<'a> {
    fn from(message: &'a NewMessage) -> Self {
        Self {
            text: message.text.as_deref().unwrap_or_default(),
            attachments: &message.attachments,
            notify: message.notify,
            format: message.format,
            disable_link_preview: message.disable_link_preview,
        }
    }
}

/// The message part of a callback answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    pub attachments: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<maxkit_core::TextFormat>,
}

/// Body of `POST /answers`.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<AnswerMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<&'a str>,
}

impl<'a> From<&'a CallbackAnswer> for AnswerRequest<'a> {
    fn from(answer: &'a CallbackAnswer) -> Self {
        let message = answer
            .message
            .as_ref()
            .filter(|m| m.text.is_some() || !m.attachments.is_empty())
            .map(|m| AnswerMessage {
                text: m.text.as_deref(),
                attachments: &m.attachments,
                format: m.format,
            });

        Self {
            message,
            notification: answer.notification.as_deref(),
        }
    }
}

/// A sent message, as returned by `POST /messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessageBody {
    pub body: MessageBody,
}

/// `POST /messages` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub message: Option<SentMessageBody>,
}

/// Generic `{ success, message }` response of mutating calls.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleResult {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxkit_core::{Button, InlineKeyboard, TextFormat};
    use serde_json::json;

    #[test]
    fn test_message_request_shape() {
        let message = NewMessage::text("Hi")
            .keyboard(InlineKeyboard::new().row([Button::callback("Yes", "confirm_yes")]))
            .format(TextFormat::Markdown);
        let body = serde_json::to_value(MessageRequest::from(&message)).unwrap();

        assert_eq!(body["text"], "Hi");
        assert_eq!(body["notify"], true);
        assert_eq!(body["format"], "markdown");
        assert_eq!(body["attachments"][0]["type"], "inline_keyboard");
        assert!(body.get("disable_link_preview").is_none());
    }

    #[test]
    fn test_answer_request_shape() {
        let notify = serde_json::to_value(AnswerRequest::from(&CallbackAnswer::notify("Saved"))).unwrap();
        assert_eq!(notify, json!({ "notification": "Saved" }));

        let replace = CallbackAnswer::replace(NewMessage::text("Done"));
        let body = serde_json::to_value(AnswerRequest::from(&replace)).unwrap();
        assert_eq!(body, json!({ "message": { "text": "Done" } }));
    }

    #[test]
    fn test_decode_responses() {
        let updates: UpdatesResponse = serde_json::from_value(json!({
            "updates": [{ "update_type": "bot_started" }],
            "marker": 17
        }))
        .unwrap();
        assert_eq!(updates.updates.len(), 1);
        assert_eq!(updates.marker, Some(17));

        let sent: SendMessageResponse = serde_json::from_value(json!({
            "message": { "body": { "mid": "mid.42", "text": "Hi" } }
        }))
        .unwrap();
        assert_eq!(sent.message.unwrap().body.mid, "mid.42");

        let me: BotInfo = serde_json::from_value(json!({
            "user_id": 1, "first_name": "Shelter Bot", "username": "shelter_bot", "is_bot": true
        }))
        .unwrap();
        assert!(me.user.is_bot);
    }
}
