//! # maxkit Framework
//!
//! Routing and conversation state for maxkit bots.
//!
//! This layer provides:
//! - [`Router`]: ordered, first-match-wins handler registry with failure
//!   isolation
//! - [`filter`]: composable predicates (commands, text, steps, callbacks)
//! - [`ConversationStore`]: per-conversation step and scratch data
//! - Axum-style handlers with [`FromContext`] extractors
//! - [`CallbackData`]: structured callback payloads
//!
//! It has no knowledge of the transport; the runtime feeds it normalized
//! updates wrapped in a [`Context`].

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod handler;
pub mod payload;
pub mod state;

pub use context::Context;
pub use dispatcher::{DispatchOutcome, Route, Router};
pub use error::{
    ExtractError, ExtractResult, HandlerError, PayloadError, PayloadResult, StateError, StateResult,
};
pub use extractor::FromContext;
pub use filter::{BoxedFilter, Filter, IntoFilter};
pub use handler::{BoxedHandler, Handler, IntoHandlerResult, into_handler};
pub use payload::CallbackData;
pub use state::{Conversation, ConversationStore, Scratch};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::filter;
    pub use crate::filters;
    pub use crate::{
        CallbackData, Context, Conversation, ConversationStore, DispatchOutcome, Filter, Router,
    };
}
