//! # maxkit Adapter for the Max messenger
//!
//! Connects maxkit to the Max bot platform API.
//!
//! This crate provides:
//!
//! - [`MaxApi`]: a `reqwest` client implementing both
//!   [`UpdateSource`](maxkit_core::UpdateSource) (long polling) and
//!   [`Bot`](maxkit_core::Bot) (message delivery)
//! - [`normalize`]: conversion of raw update payloads into the canonical
//!   [`Update`](maxkit_core::Update)
//! - [`model`]: the wire types of the platform API
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxkit_adapter_max::{MaxApi, MaxApiConfig};
//!
//! let api = MaxApi::new(&MaxApiConfig::new(std::env::var("BOT_TOKEN")?))?;
//! let me = api.get_me().await?;
//! println!("Running as @{}", me.user.username.unwrap_or_default());
//! ```

pub mod api;
pub mod config;
pub mod model;
pub mod normalize;

pub use api::MaxApi;
pub use config::{DEFAULT_BASE_URL, MaxApiConfig};
pub use normalize::{normalize, parse_update};
