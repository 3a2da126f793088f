//! HTTP client for the Max platform API.
//!
//! [`MaxApi`] is both the upstream [`UpdateSource`] of the long-poll loop and
//! the outbound [`Bot`] handed to handlers. Every request carries the access
//! token as the `access_token` query parameter.
//!
//! | Call                | Endpoint                          |
//! |---------------------|-----------------------------------|
//! | `get_me`            | `GET /me`                         |
//! | `get_updates`       | `GET /updates`                    |
//! | `send_message`      | `POST /messages?chat_id|user_id`  |
//! | `answer_callback`   | `POST /answers?callback_id`       |
//! | `edit_message`      | `PUT /messages?message_id`        |
//! | `delete_message`    | `DELETE /messages?message_id`     |
//! | `get_chat`          | `GET /chats/{chat_id}`            |

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use maxkit_core::{
    ApiError, ApiResult, Bot, CallbackAnswer, NewMessage, ParseResult, PollRequest, SentMessage,
    Target, Update, UpdateBatch, UpdateSource,
};

use crate::config::MaxApiConfig;
use crate::model::api::{
    AnswerRequest, BotInfo, ChatInfo, MessageRequest, SendMessageResponse, SimpleResult,
    UpdatesResponse,
};
use crate::normalize;

/// Max platform API client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct MaxApi {
    client: Client,
    base_url: Arc<str>,
    token: Arc<str>,
}

impl MaxApi {
    /// Creates a client from its configuration.
    pub fn new(config: &MaxApiConfig) -> ApiResult<Self> {
        if config.token.is_empty() {
            return Err(ApiError::InvalidRequest("access token is empty".into()));
        }

        let client = ClientBuilder::new()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').into(),
            token: config.token.as_str().into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("access_token", &*self.token)])
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_checked(&self, request: RequestBuilder, action: &str) -> ApiResult<()> {
        let result: SimpleResult = self.send(request).await?;
        if result.success {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 200,
                body: result
                    .message
                    .unwrap_or_else(|| format!("{action} was rejected")),
            })
        }
    }

    /// Returns information about the bot itself.
    pub async fn get_me(&self) -> ApiResult<BotInfo> {
        debug!("Getting bot info");
        self.send(self.request(Method::GET, "/me")).await
    }

    /// Fetches the next batch of updates.
    pub async fn get_updates(&self, poll: &PollRequest) -> ApiResult<UpdatesResponse> {
        let mut request = self.request(Method::GET, "/updates").query(&[
            ("limit", poll.limit.to_string()),
            ("timeout", poll.timeout.as_secs().to_string()),
        ]);
        if let Some(marker) = poll.marker {
            request = request.query(&[("marker", marker.to_string())]);
        }
        if !poll.types.is_empty() {
            request = request.query(&[("types", poll.types.join(","))]);
        }

        debug!(marker = ?poll.marker, limit = poll.limit, "Getting updates");
        let response: UpdatesResponse = self.send(request).await?;
        debug!(count = response.updates.len(), marker = ?response.marker, "Received updates");
        Ok(response)
    }

    /// Returns information about a chat.
    pub async fn get_chat(&self, chat_id: i64) -> ApiResult<ChatInfo> {
        debug!(chat_id, "Getting chat info");
        self.send(self.request(Method::GET, &format!("/chats/{chat_id}")))
            .await
    }

    /// Returns `true` if the platform accepts the token.
    pub async fn health_check(&self) -> bool {
        match self.get_me().await {
            Ok(_) => {
                debug!("Health check passed");
                true
            }
            Err(e) => {
                error!("Health check failed: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for MaxApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn ensure_content(message: &NewMessage) -> ApiResult<()> {
    if message.text.is_none() && message.attachments.is_empty() {
        return Err(ApiError::InvalidRequest(
            "message has neither text nor attachments".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Bot for MaxApi {
    async fn send_message(&self, target: Target, message: NewMessage) -> ApiResult<SentMessage> {
        ensure_content(&message)?;

        let (param, id) = match target {
            Target::Chat(id) => ("chat_id", id),
            Target::User(id) => ("user_id", id),
        };
        let request = self
            .request(Method::POST, "/messages")
            .query(&[(param, id.to_string())])
            .json(&MessageRequest::from(&message));

        let response: SendMessageResponse = self.send(request).await?;
        let message_id = response.message.map(|m| m.body.mid);
        info!(?target, message_id = message_id.as_deref().unwrap_or("unknown"), "Message sent");
        Ok(SentMessage { message_id })
    }

    async fn answer_callback(&self, callback_id: &str, answer: CallbackAnswer) -> ApiResult<()> {
        let body = AnswerRequest::from(&answer);
        if body.message.is_none() && body.notification.is_none() {
            return Err(ApiError::InvalidRequest(
                "callback answer has neither a message nor a notification".into(),
            ));
        }

        debug!(callback_id, "Answering callback");
        let request = self
            .request(Method::POST, "/answers")
            .query(&[("callback_id", callback_id)])
            .json(&body);
        self.send_checked(request, "answer").await
    }

    async fn edit_message(&self, message_id: &str, message: NewMessage) -> ApiResult<()> {
        ensure_content(&message)?;

        debug!(message_id, "Editing message");
        let request = self
            .request(Method::PUT, "/messages")
            .query(&[("message_id", message_id)])
            .json(&MessageRequest::from(&message));
        self.send_checked(request, "edit").await
    }

    async fn delete_message(&self, message_id: &str) -> ApiResult<()> {
        debug!(message_id, "Deleting message");
        let request = self
            .request(Method::DELETE, "/messages")
            .query(&[("message_id", message_id)]);
        self.send_checked(request, "delete").await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[async_trait]
impl UpdateSource for MaxApi {
    async fn poll(&self, request: &PollRequest) -> ApiResult<UpdateBatch> {
        let response = self.get_updates(request).await?;
        Ok(UpdateBatch {
            updates: response.updates,
            marker: response.marker,
        })
    }

    fn parse_update(&self, raw: &Value) -> ParseResult<Update> {
        normalize::parse_update(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_token() {
        assert!(matches!(
            MaxApi::new(&MaxApiConfig::default()),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_trims_base_url() {
        let api = MaxApi::new(&MaxApiConfig {
            base_url: "http://localhost:8080/".into(),
            ..MaxApiConfig::new("t")
        })
        .unwrap();
        assert_eq!(&*api.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_message_is_invalid() {
        assert!(ensure_content(&NewMessage::default()).is_err());
        assert!(ensure_content(&NewMessage::text("")).is_ok());
    }
}
