//! Wire models of the Max platform API.
//!
//! These types mirror the JSON the platform sends and expects. They are
//! converted into the canonical `maxkit-core` types by the normalizer and
//! never leave this crate's public API unconverted, except for the plain
//! response types returned by [`MaxApi`](crate::MaxApi).

pub mod api;
pub mod update;

pub use api::{BotInfo, ChatInfo, SimpleResult, UpdatesResponse};
pub use update::{WireCallback, WireMessage, WireUser};
