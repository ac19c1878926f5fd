//! Handlers, middleware and their combinators.
//!
//! A [`Handler`] turns an error into a response outcome written onto a
//! context `C`. A [`Middleware`] wraps a handler into another handler with the
//! same signature, for cross-cutting behavior such as logging or metrics.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde_json::json;

type HandlerFn<C> = dyn Fn(&(dyn Error + 'static), &mut C) + Send + Sync;
type MiddlewareFn<C> = dyn Fn(Handler<C>) -> Handler<C> + Send + Sync;

/// Response-producing error handler.
pub struct Handler<C> {
    f: Arc<HandlerFn<C>>,
}

impl<C: 'static> Handler<C> {
    /// Wrap a closure as a handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&(dyn Error + 'static), &mut C) + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Invoke the handler.
    pub fn call(&self, err: &(dyn Error + 'static), ctx: &mut C) {
        (self.f)(err, ctx)
    }

    /// Whether both values share the same underlying function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// Function from handler to handler.
pub struct Middleware<C> {
    f: Arc<MiddlewareFn<C>>,
}

impl<C: 'static> Middleware<C> {
    /// Wrap a closure as a middleware.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Handler<C>) -> Handler<C> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Middleware that returns the handler unchanged.
    pub fn identity() -> Self {
        Self::new(|next| next)
    }

    /// Apply this middleware around `next`.
    pub fn wrap(&self, next: Handler<C>) -> Handler<C> {
        (self.f)(next)
    }
}

impl<C> Clone for Middleware<C> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<C> fmt::Debug for Middleware<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Compose middlewares so the first one is the outermost.
///
/// `chain_middleware([m1, m2, m3]).wrap(h)` is `m1(m2(m3(h)))`.
pub fn chain_middleware<C: 'static>(
    middlewares: impl IntoIterator<Item = Middleware<C>>,
) -> Middleware<C> {
    let middlewares: Vec<Middleware<C>> = middlewares.into_iter().collect();
    if middlewares.is_empty() {
        return Middleware::identity();
    }
    Middleware::new(move |handler| {
        middlewares
            .iter()
            .rev()
            .fold(handler, |next, middleware| middleware.wrap(next))
    })
}

/// Compose handlers into one that calls each of them in order.
///
/// Every handler runs against the same error and context; none can stop the
/// others from running.
pub fn chain_handlers<C: 'static>(handlers: impl IntoIterator<Item = Handler<C>>) -> Handler<C> {
    let handlers: Vec<Handler<C>> = handlers.into_iter().collect();
    Handler::new(move |err, ctx| {
        for handler in &handlers {
            handler.call(err, ctx);
        }
    })
}

/// Context that can receive a status code and a JSON body.
///
/// Implemented by response contexts so the default fallback can be built
/// without knowing the concrete pipeline.
pub trait ResponseSink {
    /// Record the response outcome.
    fn write_error(&mut self, status: u16, body: serde_json::Value);
}

/// Handler writing `500 {"error": "<message>"}`.
pub fn internal_error_handler<C: ResponseSink + 'static>() -> Handler<C> {
    Handler::new(|err, ctx: &mut C| {
        ctx.write_error(500, json!({ "error": err.to_string() }));
    })
}
