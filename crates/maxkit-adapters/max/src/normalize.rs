//! Event normalizer.
//!
//! Turns raw update payloads into the canonical [`Update`]:
//!
//! | `update_type`                       | Result                         |
//! |-------------------------------------|--------------------------------|
//! | `message_created`                   | `Update::Message`              |
//! | `message_callback`                  | `Update::CallbackQuery`        |
//! | `bot_started`, `bot_added`, ...     | `Update::Lifecycle`            |
//! | `message_edited`, `dialog_*`, ...   | `ParseError::Unsupported`      |
//! | anything else                       | `ParseError::Unknown`          |
//!
//! Payloads whose shape does not match their discriminant yield
//! `ParseError::Malformed`. None of these errors is fatal: [`normalize`]
//! logs them and returns `None`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use maxkit_core::{
    CallbackQuery, LifecycleEvent, LifecycleKind, Message, ParseError, ParseResult, Update, User,
};

use crate::model::update::{
    ChatEvent, MessageCallback, MessageCreated, WireMessage, WireUser, update_type,
};

/// Normalizes a raw payload, logging and dropping anything unusable.
///
/// Unknown and malformed payloads are logged at `warn`, known but unrouted
/// kinds at `debug`.
pub fn normalize(raw: &Value) -> Option<Update> {
    match parse_update(raw) {
        Ok(update) => {
            trace!(kind = %update.kind(), chat_id = update.chat_id(), "Normalized update");
            Some(update)
        }
        Err(err @ ParseError::Unsupported(_)) => {
            debug!("Dropping update: {err}");
            None
        }
        Err(err) => {
            warn!(payload = %raw, "Dropping update: {err}");
            None
        }
    }
}

/// Parses a raw payload into an [`Update`].
pub fn parse_update(raw: &Value) -> ParseResult<Update> {
    let kind = raw
        .get("update_type")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingDiscriminant {
            field: "update_type",
        })?;

    match kind {
        update_type::MESSAGE_CREATED => {
            let payload: MessageCreated = decode(kind, raw)?;
            convert_message(kind, payload.message).map(Update::Message)
        }
        update_type::MESSAGE_CALLBACK => {
            let payload: MessageCallback = decode(kind, raw)?;
            convert_callback(kind, payload).map(Update::CallbackQuery)
        }
        _ => match lifecycle_kind(kind) {
            Some(lifecycle) => {
                let payload: ChatEvent = decode(kind, raw)?;
                Ok(Update::Lifecycle(convert_chat_event(lifecycle, payload)))
            }
            None if update_type::UNROUTED.contains(&kind) => {
                Err(ParseError::Unsupported(kind.to_string()))
            }
            None => Err(ParseError::Unknown(kind.to_string())),
        },
    }
}

fn lifecycle_kind(kind: &str) -> Option<LifecycleKind> {
    Some(match kind {
        update_type::BOT_STARTED => LifecycleKind::BotStarted,
        update_type::BOT_STOPPED => LifecycleKind::BotStopped,
        update_type::BOT_ADDED => LifecycleKind::BotAdded,
        update_type::BOT_REMOVED => LifecycleKind::BotRemoved,
        update_type::USER_ADDED => LifecycleKind::UserAdded,
        update_type::USER_REMOVED => LifecycleKind::UserRemoved,
        update_type::CHAT_TITLE_CHANGED => LifecycleKind::ChatTitleChanged,
        _ => return None,
    })
}

fn decode<T: DeserializeOwned>(kind: &str, raw: &Value) -> ParseResult<T> {
    serde_json::from_value(raw.clone()).map_err(|e| ParseError::malformed(kind, e.to_string()))
}

impl From<WireUser> for User {
    fn from(user: WireUser) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            is_bot: user.is_bot,
        }
    }
}

fn convert_message(kind: &str, message: WireMessage) -> ParseResult<Message> {
    let chat_id = message
        .recipient
        .chat_id
        .ok_or_else(|| ParseError::malformed(kind, "message has no recipient chat_id"))?;
    let sender = message
        .sender
        .ok_or_else(|| ParseError::malformed(kind, "message has no sender"))?;

    Ok(Message {
        message_id: message.body.mid,
        chat_id,
        sender: sender.into(),
        text: message.body.text,
        attachments: message.body.attachments.unwrap_or_default(),
        timestamp: message.timestamp,
    })
}

fn convert_callback(kind: &str, payload: MessageCallback) -> ParseResult<CallbackQuery> {
    let MessageCallback {
        callback,
        message,
        timestamp,
    } = payload;

    // The conversation id only exists on the originating message.
    let message = message
        .ok_or_else(|| ParseError::malformed(kind, "callback has no originating message"))
        .and_then(|m| convert_message(kind, m))?;

    Ok(CallbackQuery {
        callback_id: callback.callback_id,
        chat_id: message.chat_id,
        sender: callback.user.into(),
        payload: callback.payload.unwrap_or_default(),
        timestamp: if callback.timestamp != 0 {
            callback.timestamp
        } else {
            timestamp
        },
        message: Some(message),
    })
}

fn convert_chat_event(kind: LifecycleKind, event: ChatEvent) -> LifecycleEvent {
    let payload = match kind {
        LifecycleKind::ChatTitleChanged => event.title,
        _ => event.payload,
    };

    LifecycleEvent {
        kind,
        chat_id: event.chat_id,
        user: event.user.map(Into::into),
        payload,
        timestamp: event.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sender() -> Value {
        json!({ "user_id": 501, "first_name": "Ada", "last_name": "L", "username": "ada", "is_bot": false })
    }

    fn message(text: &str) -> Value {
        json!({
            "sender": sender(),
            "recipient": { "chat_id": 9001, "chat_type": "dialog" },
            "timestamp": 1_700_000_000_000_i64,
            "body": { "mid": "mid.1", "text": text, "attachments": null }
        })
    }

    #[test]
    fn test_message_created() {
        let raw = json!({
            "update_type": "message_created",
            "timestamp": 1_700_000_000_000_i64,
            "message": message("/start")
        });

        let Update::Message(msg) = parse_update(&raw).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(msg.chat_id, 9001);
        assert_eq!(msg.message_id, "mid.1");
        assert_eq!(msg.text(), "/start");
        assert_eq!(msg.sender.full_name(), "Ada L");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn test_message_callback_takes_chat_from_message() {
        let raw = json!({
            "update_type": "message_callback",
            "timestamp": 1_700_000_000_500_i64,
            "callback": {
                "callback_id": "cb.7",
                "payload": "confirm_yes",
                "user": sender(),
                "timestamp": 1_700_000_000_400_i64
            },
            "message": message("Confirm?")
        });

        let Update::CallbackQuery(query) = parse_update(&raw).unwrap() else {
            panic!("expected a callback");
        };
        assert_eq!(query.chat_id, 9001);
        assert_eq!(query.payload, "confirm_yes");
        assert_eq!(query.callback_id, "cb.7");
        assert_eq!(query.timestamp, 1_700_000_000_400);
        assert_eq!(query.message.unwrap().text(), "Confirm?");
    }

    #[test]
    fn test_callback_without_message_is_malformed() {
        let raw = json!({
            "update_type": "message_callback",
            "callback": { "callback_id": "cb.7", "payload": "x", "user": sender() }
        });
        assert!(matches!(parse_update(&raw), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn test_lifecycle_events() {
        let started = json!({
            "update_type": "bot_started",
            "timestamp": 5,
            "chat_id": 9001,
            "user": sender(),
            "payload": "ref_42"
        });
        let Update::Lifecycle(event) = parse_update(&started).unwrap() else {
            panic!("expected a lifecycle event");
        };
        assert_eq!(event.kind, LifecycleKind::BotStarted);
        assert_eq!(event.payload.as_deref(), Some("ref_42"));
        assert_eq!(event.user.unwrap().user_id, 501);

        let renamed = json!({
            "update_type": "chat_title_changed",
            "chat_id": -77,
            "user": sender(),
            "title": "Volunteers"
        });
        let Update::Lifecycle(event) = parse_update(&renamed).unwrap() else {
            panic!("expected a lifecycle event");
        };
        assert_eq!(event.kind, LifecycleKind::ChatTitleChanged);
        assert_eq!(event.payload.as_deref(), Some("Volunteers"));
    }

    #[test]
    fn test_unknown_and_unsupported_are_dropped() {
        let unknown = json!({ "update_type": "hologram_received", "chat_id": 1 });
        assert!(matches!(parse_update(&unknown), Err(ParseError::Unknown(_))));
        assert!(normalize(&unknown).is_none());

        let edited = json!({ "update_type": "message_edited", "message": message("x") });
        assert!(parse_update(&edited).unwrap_err().is_unsupported());
        assert!(normalize(&edited).is_none());
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            parse_update(&json!({ "timestamp": 1 })),
            Err(ParseError::MissingDiscriminant { .. })
        ));

        let no_body = json!({
            "update_type": "message_created",
            "message": { "sender": sender(), "recipient": { "chat_id": 1 } }
        });
        assert!(matches!(parse_update(&no_body), Err(ParseError::Malformed { .. })));

        let no_chat = json!({
            "update_type": "message_created",
            "message": { "sender": sender(), "recipient": {}, "body": { "mid": "m" } }
        });
        assert!(matches!(parse_update(&no_chat), Err(ParseError::Malformed { .. })));
        assert!(normalize(&no_chat).is_none());
    }
}
