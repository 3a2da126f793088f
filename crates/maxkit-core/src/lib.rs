//! # maxkit Core
//!
//! The core types of the maxkit bot framework.
//!
//! This crate holds everything the other layers agree on and nothing that
//! needs a runtime:
//!
//! - **Update model**: the canonical, normalized inbound event ([`Update`])
//! - **Step tokens**: tagged wait-points of multi-turn flows ([`Step`])
//! - **Collaborator traits**: the upstream poller ([`UpdateSource`]) and the
//!   outbound delivery client ([`Bot`])
//! - **Outgoing messages**: message bodies, inline keyboards, callback answers
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐  raw JSON  ┌────────────┐  Update  ┌────────┐     ┌─────────┐
//! │ UpdateSource │───────────▶│ normalizer │─────────▶│ Router │────▶│ Handler │
//! └──────────────┘            └────────────┘          └────────┘     └────┬────┘
//!                                                                         │ Bot
//!                                                                         ▼
//!                                                                     platform
//! ```

pub mod bot;
pub mod error;
pub mod message;
pub mod source;
pub mod step;
pub mod update;

pub use bot::{Bot, BoxedBot};
pub use error::{ApiError, ApiResult, ParseError, ParseResult};
pub use message::{Button, CallbackAnswer, InlineKeyboard, NewMessage, SentMessage, Target, TextFormat};
pub use source::{BoxedSource, PollRequest, UpdateBatch, UpdateSource};
pub use step::Step;
pub use update::{
    Attachment, CallbackQuery, LifecycleEvent, LifecycleKind, Message, Update, UpdateKind, User,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::{Bot, BoxedBot};
    pub use super::message::{Button, CallbackAnswer, InlineKeyboard, NewMessage, Target};
    pub use super::step::Step;
    pub use super::update::{CallbackQuery, LifecycleEvent, LifecycleKind, Message, Update, UpdateKind};
}
