//! Error identities exposed by the demo service and their handlers.
//!
//! | Identity          | Wraps       | Response |
//! |-------------------|-------------|----------|
//! | `not found`       |             | 404      |
//! | `user not found`  | `not found` | 404 with `code` |
//! | `order not found` | `not found` | 404 (inherited) |
//! | `conflict`        |             | 409      |
//! | `duplicate email` | `conflict`  | 409 (same handler) |
//! | `unavailable`     |             | 503 with `Retry-After` |

use axum::http::{HeaderValue, StatusCode, header};
use errbin_common::{Dispatcher, ErrorId, Handler, RegisterError};
use errbin_http::{HttpContext, log_errors, message_handler, opaque_fallback};
use serde_json::json;
use tracing::info;

use crate::config::DaemonConfig;

/// The service's error identities.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub not_found: ErrorId,
    pub user_not_found: ErrorId,
    pub order_not_found: ErrorId,
    pub conflict: ErrorId,
    pub duplicate_email: ErrorId,
    pub unavailable: ErrorId,
}

impl Catalog {
    pub fn new() -> Self {
        let not_found = ErrorId::new("not found");
        let conflict = ErrorId::new("conflict");
        Self {
            user_not_found: ErrorId::wrap("user not found", &not_found),
            order_not_found: ErrorId::wrap("order not found", &not_found),
            duplicate_email: ErrorId::wrap("duplicate email", &conflict),
            unavailable: ErrorId::new("service unavailable"),
            not_found,
            conflict,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the dispatcher for the demo routes.
///
/// Identities are registered most specific first for some chains so startup
/// exercises both insertion below an ancestor and promotion of existing roots.
pub fn build_dispatcher(
    catalog: &Catalog,
    config: &DaemonConfig,
) -> Result<Dispatcher<HttpContext>, RegisterError> {
    let mut dispatcher = Dispatcher::new();

    dispatcher.register(
        Handler::new(|err, ctx: &mut HttpContext| {
            ctx.json(
                StatusCode::NOT_FOUND,
                json!({ "error": err.to_string(), "code": "user_not_found" }),
            );
        }),
        [catalog.user_not_found.clone()],
    )?;
    dispatcher.register(
        message_handler(StatusCode::NOT_FOUND),
        [catalog.not_found.clone()],
    )?;
    dispatcher.register(
        message_handler(StatusCode::CONFLICT),
        [catalog.conflict.clone(), catalog.duplicate_email.clone()],
    )?;
    dispatcher.register(
        Handler::new(|err, ctx: &mut HttpContext| {
            ctx.json(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": err.to_string() }),
            );
            ctx.insert_header(header::RETRY_AFTER, HeaderValue::from_static("30"));
        }),
        [catalog.unavailable.clone()],
    )?;

    if !config.fallback.expose_message {
        dispatcher.set_fallback(opaque_fallback());
    }
    dispatcher.use_global([log_errors()]);

    info!(
        identities = dispatcher.hierarchy().len(),
        roots = dispatcher.hierarchy().roots().len(),
        "error hierarchy ready"
    );
    Ok(dispatcher)
}
