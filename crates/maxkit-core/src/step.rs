//! Step tokens for multi-turn flows.
//!
//! A [`Step`] names one wait-point of a flow, e.g. "registration is waiting
//! for the shelter name". Two steps are equal when both their flow and step
//! tags are equal, so every conversation that reaches the same wait-point
//! carries the same token.
//!
//! ```rust,ignore
//! use maxkit_core::Step;
//!
//! const ASK_NAME: Step = Step::new("registration", "name");
//!
//! // Or derive steps from an application enum:
//! #[derive(Clone, Copy)]
//! enum Registration { Name, Age }
//!
//! impl From<Registration> for Step {
//!     fn from(s: Registration) -> Step {
//!         match s {
//!             Registration::Name => Step::new("registration", "name"),
//!             Registration::Age => Step::new("registration", "age"),
//!         }
//!     }
//! }
//! ```

use std::fmt;

use serde::Serialize;

/// A logical wait-point in a flow, compared by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Step {
    flow: &'static str,
    name: &'static str,
}

impl Step {
    /// Creates a step token from its flow and step tags.
    pub const fn new(flow: &'static str, name: &'static str) -> Self {
        Self { flow, name }
    }

    /// Returns the flow tag.
    pub const fn flow(&self) -> &'static str {
        self.flow
    }

    /// Returns the step tag within the flow.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this step belongs to `flow`.
    pub fn in_flow(&self, flow: &str) -> bool {
        self.flow == flow
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.flow, self.name)
    }
}
