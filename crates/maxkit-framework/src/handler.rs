//! Handler trait.
//!
//! Handlers are plain async functions whose parameters are extractors
//! ([`FromContext`]). [`Handler`] is implemented for every such function with
//! up to eight parameters, in the style of Axum handlers:
//!
//! ```rust,ignore
//! // No parameters, no result
//! async fn ping() {}
//!
//! // Extractors plus a fallible body
//! async fn ask_age(bot: BoxedBot, msg: Message, conv: Conversation) -> anyhow::Result<()> {
//!     conv.set_data("name", msg.text())?;
//!     conv.set_state(ASK_AGE);
//!     bot.send_message(Target::Chat(msg.chat_id), NewMessage::text("How old are you?")).await?;
//!     Ok(())
//! }
//! ```
//!
//! The router stores handlers type-erased as [`BoxedHandler`]s.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::extractor::FromContext;

// ============================================================================
// IntoHandlerResult
// ============================================================================

/// Return types accepted from handlers.
pub trait IntoHandlerResult: Send {
    fn into_handler_result(self) -> anyhow::Result<()>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error> + Send,
{
    fn into_handler_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler
// ============================================================================

/// An update handler.
///
/// Implemented automatically for async functions that take 0-8 parameters
/// implementing [`FromContext`] and return a type implementing
/// [`IntoHandlerResult`].
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Extracts the arguments and runs the handler.
    ///
    /// Extraction failures are returned as errors.
    async fn call(self, ctx: Context) -> anyhow::Result<()>;
}

/// A type-erased handler.
pub type BoxedHandler = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Converts a handler function into a [`BoxedHandler`].
pub fn into_handler<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| handler.clone().call(ctx))
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoHandlerResult + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            #[allow(unused_variables)]
            async fn call(self, ctx: Context) -> anyhow::Result<()> {
                $(
                    let $ty = $ty::from_context(&ctx)?;
                )*

                (self)($($ty,)*).await.into_handler_result()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
