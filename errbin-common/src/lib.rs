//! Hierarchical error classification and handler dispatch.
//!
//! Applications declare error identities ([`ErrorId`]), possibly wrapping more
//! general ones, and register a [`Handler`] per identity on a [`Dispatcher`].
//! At runtime the dispatcher picks the handler of the most specific registered
//! identity that an error wraps, or the fallback handler when none matches.
//!
//! ```ignore
//! use errbin_common::{Dispatcher, ErrorId, Handler};
//!
//! let not_found = ErrorId::new("not found");
//! let user_not_found = ErrorId::wrap("user", &not_found);
//!
//! let mut dispatcher: Dispatcher<MyContext> = Dispatcher::new();
//! dispatcher.register(Handler::new(|err, ctx| ctx.respond(404, err)), [not_found])?;
//!
//! // Dispatches to the `not found` handler.
//! dispatcher.dispatch(Some(&user_not_found), &mut ctx);
//! ```

pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod hierarchy;
pub mod identity;
pub mod testing;

pub use dispatch::Dispatcher;
pub use errors::RegisterError;
pub use handler::{
    Handler, Middleware, ResponseSink, chain_handlers, chain_middleware, internal_error_handler,
};
pub use hierarchy::{ErrorHierarchy, HierarchySnapshot, Node, NodeId, NodeSnapshot};
pub use identity::{ErrorId, chain, matches};
