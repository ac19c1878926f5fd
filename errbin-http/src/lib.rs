//! axum integration for errbin.
//!
//! Route handlers record their terminal error by returning
//! `Err(RecordedError)`. The [`dispatch_errors`] middleware then resolves the
//! most specific registered handler for that error through a shared
//! [`Dispatcher`](errbin_common::Dispatcher) and turns what the handler wrote
//! into the HTTP response.

pub mod context;
pub mod layer;
pub mod recorded;
pub mod stock;

pub use context::HttpContext;
pub use layer::{SharedDispatcher, attach, dispatch_errors};
pub use recorded::RecordedError;
pub use stock::{json_handler, log_errors, message_handler, opaque_fallback};
