//! Handler traits and chain types.
//!
//! Middleware and terminal route handlers share a single shape: an async
//! function over the mutable request [`Context`]. A chain is an ordered,
//! immutable sequence of handlers; each element decides whether the chain
//! descends further by calling [`Context::next`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A boxed future as returned by handler trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An element of a request handler chain.
///
/// Implementors receive the request [`Context`] and may inspect the
/// request, write to the response, and drive the remainder of the chain
/// through [`Context::next`]. Returning without calling `next` stops the
/// chain at this element.
pub trait Handler: Send + Sync + 'static {
    /// Processes the request.
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

/// A shared, type-erased handler.
pub type HandlerFunc = Arc<dyn Handler>;

/// An immutable, shared handler chain.
///
/// Chains are composed once at registration time and never mutated
/// afterwards; cloning is a reference-count bump.
pub type Chain = Arc<[HandlerFunc]>;

/// Implemented for `async fn(&mut Context)` items.
///
/// This is the adapter that lets plain async functions act as handlers
/// without boxing at the definition site; see [`handler_fn`].
pub trait AsyncHandler<'a>: Send + Sync + 'static {
    /// The future produced by the function.
    type Future: Future<Output = ()> + Send + 'a;

    /// Invokes the function.
    fn invoke(&self, ctx: &'a mut Context) -> Self::Future;
}

impl<'a, F, Fut> AsyncHandler<'a> for F
where
    F: Fn(&'a mut Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'a,
{
    type Future = Fut;

    fn invoke(&self, ctx: &'a mut Context) -> Fut {
        self(ctx)
    }
}

struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: for<'a> AsyncHandler<'a>,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.0.invoke(ctx))
    }
}

/// Wraps an `async fn(&mut Context)` as a [`HandlerFunc`].
///
/// # Example
///
/// ```
/// use portico_core::{handler_fn, Context};
///
/// async fn hello(ctx: &mut Context) {
///     ctx.string(http::StatusCode::OK, "hello");
/// }
///
/// let handler = handler_fn(hello);
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFunc
where
    F: for<'a> AsyncHandler<'a>,
{
    Arc::new(FnHandler(f))
}

struct BoxedHandler<F>(F);

impl<F> Handler for BoxedHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self.0)(ctx)
    }
}

/// Wraps a closure returning a boxed future as a [`HandlerFunc`].
///
/// Use this form when the handler captures state; clone captured values
/// into the async block so the future owns them:
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use portico_core::{boxed_handler, Context};
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = hits.clone();
/// let handler = boxed_handler(move |ctx: &mut Context| {
///     let counter = counter.clone();
///     Box::pin(async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///         ctx.next().await;
///     })
/// });
/// # let _ = handler;
/// ```
pub fn boxed_handler<F>(f: F) -> HandlerFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(BoxedHandler(f))
}
