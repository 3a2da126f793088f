//! # maxkit
//!
//! A typed bot framework for the Max messenger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐ raw JSON ┌────────────┐ Update ┌─────────────┐ Context ┌────────┐
//! │ Poller  │─────────▶│ normalizer │───────▶│ worker pool │────────▶│ Router │──▶ handler
//! └─────────┘          └────────────┘        └─────────────┘         └────────┘
//!      ▲                                                                  │
//!      └──── marker                             ConversationStore ◀───────┘
//! ```
//!
//! - **Runtime** (`maxkit-runtime`): configuration, the long-poll loop, the
//!   bounded worker pool, shutdown
//! - **Adapter** (`maxkit-adapter-max`): the platform HTTP client and the
//!   payload normalizer
//! - **Framework** (`maxkit-framework`): router, filters, handlers,
//!   conversation state
//! - **Core** (`maxkit-core`): the canonical update model and collaborator traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxkit::prelude::*;
//!
//! async fn start(bot: BoxedBot, msg: Message) -> anyhow::Result<()> {
//!     bot.send_message(Target::Chat(msg.chat_id), NewMessage::text("Hello!")).await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.on_message("start", start, filters![filter::command("start")]);
//!
//!     MaxkitRuntime::builder().build()?.run(router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: load `maxkit.toml`
//! - `yaml-config`: load `maxkit.yaml`
//! - `json-log`: JSON log lines

pub use maxkit_adapter_max as adapter;
pub use maxkit_core as core;
pub use maxkit_framework as framework;
pub use maxkit_runtime as runtime;

pub use maxkit_framework::filters;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use maxkit::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use maxkit_runtime::{MaxkitConfig, MaxkitRuntime, RuntimeError};

    // Routing and filters
    pub use maxkit_framework::filter;
    pub use maxkit_framework::filters;
    pub use maxkit_framework::{Context, DispatchOutcome, Filter, Router};

    // Conversation state and callback payloads
    pub use maxkit_framework::{CallbackData, Conversation, ConversationStore};

    // Update model and outbound messages
    pub use maxkit_core::{
        Bot, BoxedBot, Button, CallbackAnswer, CallbackQuery, InlineKeyboard, LifecycleEvent,
        LifecycleKind, Message, NewMessage, Step, Target, TextFormat, Update, UpdateKind,
    };

    // Platform client, for calls beyond the Bot trait
    pub use maxkit_adapter_max::MaxApi;
}
