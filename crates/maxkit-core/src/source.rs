//! Update source trait.
//!
//! An [`UpdateSource`] is the upstream side of the long-poll loop: it fetches
//! batches of raw payloads and knows how to normalize them.
//!
//! ```text
//! poll(marker) ──▶ UpdateBatch { updates: [raw JSON], marker }
//!                          │
//!                          ▼
//!                  parse_update(raw) ──▶ Update | ParseError
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiResult, ParseResult};
use crate::update::Update;

/// One response of the polling call.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    /// Raw payloads, in the order the platform returned them.
    pub updates: Vec<Value>,
    /// Cursor to pass to the next poll; `None` keeps the previous one.
    pub marker: Option<i64>,
}

/// Parameters of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Cursor returned by the previous poll.
    pub marker: Option<i64>,
    /// How long the platform may hold the request open.
    pub timeout: Duration,
    /// Maximum number of updates to return.
    pub limit: u32,
    /// Update types to receive; empty means all.
    pub types: Vec<String>,
}

/// The upstream polling collaborator.
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    /// Fetches the next batch of raw updates.
    ///
    /// This is a blocking network call bounded by `request.timeout`.
    async fn poll(&self, request: &PollRequest) -> ApiResult<UpdateBatch>;

    /// Normalizes one raw payload.
    fn parse_update(&self, raw: &Value) -> ParseResult<Update>;
}

/// A shared UpdateSource trait object.
pub type BoxedSource = Arc<dyn UpdateSource>;
