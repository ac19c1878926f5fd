//! Dispatch entry point.
//!
//! A [`Dispatcher`] owns everything the per-request hook needs: the error
//! hierarchy, the fallback handler and the global middleware. It is built and
//! configured once at startup, then shared (typically behind an `Arc`) with the
//! request pipeline, which calls [`Dispatcher::dispatch`] after each unit of
//! work.

use std::error::Error;
use std::fmt;

use tracing::debug;

use crate::errors::RegisterError;
use crate::handler::{
    Handler, Middleware, ResponseSink, chain_middleware, internal_error_handler,
};
use crate::hierarchy::{ErrorHierarchy, NodeId};
use crate::identity::ErrorId;

/// Process-scoped error dispatch configuration.
pub struct Dispatcher<C> {
    hierarchy: ErrorHierarchy<C>,
    fallback: Handler<C>,
    global: Middleware<C>,
}

impl<C: ResponseSink + 'static> Dispatcher<C> {
    /// Dispatcher whose fallback writes `500 {"error": "<message>"}`.
    pub fn new() -> Self {
        Self::with_fallback(internal_error_handler())
    }
}

impl<C: ResponseSink + 'static> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Dispatcher<C> {
    /// Dispatcher with a custom fallback handler.
    pub fn with_fallback(fallback: Handler<C>) -> Self {
        Self {
            hierarchy: ErrorHierarchy::new(),
            fallback,
            global: Middleware::identity(),
        }
    }

    /// Associate `handler` with each of `identities`.
    ///
    /// Registration is sequential and not atomic: when one identity fails, the
    /// ones before it stay registered and the ones after it are skipped.
    pub fn register(
        &mut self,
        handler: Handler<C>,
        identities: impl IntoIterator<Item = ErrorId>,
    ) -> Result<Vec<NodeId>, RegisterError> {
        self.hierarchy.register_all(identities, handler)
    }

    /// Register `middleware` applied around `handler` for `identities`.
    pub fn register_with_middleware(
        &mut self,
        middleware: &Middleware<C>,
        handler: Handler<C>,
        identities: impl IntoIterator<Item = ErrorId>,
    ) -> Result<Vec<NodeId>, RegisterError> {
        self.register(middleware.wrap(handler), identities)
    }

    /// Replace the global middleware, applied around every dispatched handler.
    ///
    /// The first middleware is the outermost.
    pub fn use_global(&mut self, middlewares: impl IntoIterator<Item = Middleware<C>>) {
        self.global = chain_middleware(middlewares);
    }

    /// Replace the fallback handler. `None` keeps the current one.
    pub fn set_fallback(&mut self, fallback: impl Into<Option<Handler<C>>>) {
        match fallback.into() {
            Some(handler) => self.fallback = handler,
            None => debug!("ignoring empty fallback handler"),
        }
    }

    pub fn fallback(&self) -> &Handler<C> {
        &self.fallback
    }

    pub fn hierarchy(&self) -> &ErrorHierarchy<C> {
        &self.hierarchy
    }

    /// The handler that would run for `err`, including global middleware.
    pub fn handler_for(&self, err: &(dyn Error + 'static)) -> Handler<C> {
        let handler = match self.hierarchy.resolve(err) {
            Some(handler) => handler.clone(),
            None => {
                debug!(error = %err, "no handler registered, using fallback");
                self.fallback.clone()
            }
        };
        self.global.wrap(handler)
    }

    /// Handle the terminal error of a unit of work, if there is one.
    pub fn dispatch(&self, err: Option<&(dyn Error + 'static)>, ctx: &mut C) {
        let Some(err) = err else {
            return;
        };
        self.handler_for(err).call(err, ctx);
    }
}

impl<C: 'static> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registered", &self.hierarchy.len())
            .finish_non_exhaustive()
    }
}
