//! Update router.
//!
//! The [`Router`] keeps one ordered list of routes per [`UpdateKind`]. Each
//! route is a named handler guarded by a list of filters. Dispatching an
//! update:
//!
//! 1. Routes of the update's kind are tried in registration order
//! 2. A route's filters run in order; the first rejection skips the route
//! 3. The first route whose filters all accept runs its handler, and
//!    dispatch stops there
//! 4. If no route accepts, the update is dropped
//!
//! Errors and panics raised by filters or by the selected handler are caught
//! here, logged with the route name and reported as
//! [`DispatchOutcome::Failed`]. They never reach the caller.
//!
//! ```rust,ignore
//! use maxkit_framework::{Router, filter, filters};
//!
//! let mut router = Router::new();
//! router
//!     .on_message("start", start, filters![filter::command("start")])
//!     .on_message("ask_age", ask_age, filters![filter::state(ASK_AGE)])
//!     .on_callback("confirm", confirm, filters![filter::callback("confirm_yes")]);
//!
//! // Freeze before polling starts.
//! let router = Arc::new(router);
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::Poll;

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, Level, debug, error, span, trace};

use maxkit_core::UpdateKind;

use crate::context::Context;
use crate::error::HandlerError;
use crate::filter::BoxedFilter;
use crate::handler::{BoxedHandler, Handler, into_handler};

/// A named handler guarded by filters.
#[derive(Clone)]
pub struct Route {
    name: String,
    filters: Vec<BoxedFilter>,
    handler: BoxedHandler,
}

impl Route {
    /// Creates a route from a handler function.
    pub fn new<H, T>(name: impl Into<String>, handler: H, filters: impl IntoIterator<Item = BoxedFilter>) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        Self::from_boxed(name, into_handler(handler), filters)
    }

    /// Creates a route from an already boxed handler.
    pub fn from_boxed(
        name: impl Into<String>,
        handler: BoxedHandler,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> Self {
        Self {
            name: name.into(),
            filters: filters.into_iter().collect(),
            handler,
        }
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the filters with AND short-circuit.
    async fn accepts(&self, ctx: &Context) -> Result<bool, HandlerError> {
        for filter in &self.filters {
            let checked = AssertUnwindSafe(filter.check(ctx)).catch_unwind().await;
            let accepted = match checked {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(error)) => {
                    return Err(HandlerError::Filter {
                        handler: self.name.clone(),
                        filter: filter.name().to_string(),
                        error,
                    });
                }
                Err(panic) => {
                    return Err(HandlerError::Filter {
                        handler: self.name.clone(),
                        filter: filter.name().to_string(),
                        error: anyhow::anyhow!("panicked: {}", panic_message(panic.as_ref())),
                    });
                }
            };
            if !accepted {
                trace!(handler = %self.name, filter = filter.name(), "Filter rejected update");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn run(&self, ctx: Context) -> Result<(), HandlerError> {
        match AssertUnwindSafe((self.handler)(ctx)).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(HandlerError::Failed {
                handler: self.name.clone(),
                error,
            }),
            Err(panic) => Err(HandlerError::Panicked {
                handler: self.name.clone(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("filters", &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The result of dispatching one update.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The named route handled the update.
    Handled { handler: String },
    /// No route accepted the update.
    Unmatched,
    /// A filter or the selected handler failed.
    Failed(HandlerError),
}

impl DispatchOutcome {
    /// Returns `true` if a handler completed successfully.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    /// Returns the name of the route involved, if any.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Handled { handler } => Some(handler),
            Self::Unmatched => None,
            Self::Failed(err) => Some(err.handler()),
        }
    }
}

#[derive(Clone, Default)]
struct RouterInner {
    messages: Vec<Route>,
    callbacks: Vec<Route>,
    lifecycle: Vec<Route>,
}

impl RouterInner {
    fn routes(&self, kind: UpdateKind) -> &[Route] {
        match kind {
            UpdateKind::Message => &self.messages,
            UpdateKind::CallbackQuery => &self.callbacks,
            UpdateKind::Lifecycle => &self.lifecycle,
        }
    }

    fn routes_mut(&mut self, kind: UpdateKind) -> &mut Vec<Route> {
        match kind {
            UpdateKind::Message => &mut self.messages,
            UpdateKind::CallbackQuery => &mut self.callbacks,
            UpdateKind::Lifecycle => &mut self.lifecycle,
        }
    }
}

/// Ordered, append-only registry of routes.
///
/// Registration happens during startup. Once the router is shared (cloned or
/// put behind an `Arc`) further registrations on one copy do not affect the
/// others. Cloning is cheap.
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner_mut(&mut self) -> &mut RouterInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Appends a route for updates of `kind`.
    pub fn register(&mut self, kind: UpdateKind, route: Route) -> &mut Self {
        debug!(kind = %kind, handler = route.name(), "Registering handler");
        self.inner_mut().routes_mut(kind).push(route);
        self
    }

    /// Appends a message handler.
    pub fn on_message<H, T>(
        &mut self,
        name: impl Into<String>,
        handler: H,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> &mut Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(UpdateKind::Message, Route::new(name, handler, filters))
    }

    /// Appends a callback query handler.
    pub fn on_callback<H, T>(
        &mut self,
        name: impl Into<String>,
        handler: H,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> &mut Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(UpdateKind::CallbackQuery, Route::new(name, handler, filters))
    }

    /// Appends a lifecycle event handler.
    pub fn on_lifecycle<H, T>(
        &mut self,
        name: impl Into<String>,
        handler: H,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> &mut Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(UpdateKind::Lifecycle, Route::new(name, handler, filters))
    }

    /// Returns the number of routes registered for `kind`.
    pub fn route_count(&self, kind: UpdateKind) -> usize {
        self.inner.routes(kind).len()
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.messages.is_empty() && self.inner.callbacks.is_empty() && self.inner.lifecycle.is_empty()
    }

    /// Dispatches an update to at most one handler.
    pub async fn dispatch(&self, ctx: Context) -> DispatchOutcome {
        let kind = ctx.update().kind();
        let span = span!(Level::DEBUG, "dispatch", update_kind = %kind, chat_id = ctx.chat_id());
        self.dispatch_inner(kind, ctx).instrument(span).await
    }

    async fn dispatch_inner(&self, kind: UpdateKind, ctx: Context) -> DispatchOutcome {
        for route in self.inner.routes(kind) {
            match route.accepts(&ctx).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    error!(handler = route.name(), "{err}");
                    return DispatchOutcome::Failed(err);
                }
            }

            debug!(handler = route.name(), "Handler selected");
            return match route.run(ctx).await {
                Ok(()) => DispatchOutcome::Handled {
                    handler: route.name.clone(),
                },
                Err(err) => {
                    error!(handler = route.name(), "{err}");
                    DispatchOutcome::Failed(err)
                }
            };
        }

        debug!("No handler matched, dropping update");
        DispatchOutcome::Unmatched
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("messages", &self.inner.messages)
            .field("callbacks", &self.inner.callbacks)
            .field("lifecycle", &self.inner.lifecycle)
            .finish()
    }
}

/// Tower Service implementation for Router.
///
/// Lets tower middleware (timeouts, rate limits, ...) wrap the whole
/// dispatch step.
impl Service<Context> for Router {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Context) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { Ok(router.dispatch(ctx).await) })
    }
}
