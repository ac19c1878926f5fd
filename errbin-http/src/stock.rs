//! Ready-made handlers and middleware for HTTP services.

use axum::http::StatusCode;
use errbin_common::{Handler, Middleware, chain};
use serde_json::json;
use tracing::{error, warn};

use crate::context::HttpContext;

/// Handler responding with a fixed status and JSON body.
pub fn json_handler(status: StatusCode, body: serde_json::Value) -> Handler<HttpContext> {
    Handler::new(move |_err, ctx: &mut HttpContext| ctx.json(status, body.clone()))
}

/// Handler responding with `status` and `{"error": "<error message>"}`.
pub fn message_handler(status: StatusCode) -> Handler<HttpContext> {
    Handler::new(move |err, ctx: &mut HttpContext| {
        ctx.json(status, json!({ "error": err.to_string() }));
    })
}

/// Fallback that hides error details from clients.
pub fn opaque_fallback() -> Handler<HttpContext> {
    json_handler(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "internal server error" }),
    )
}

/// Log every handled error once the inner handler has written its response.
///
/// Server errors (or no response at all) log at `error`, the rest at `warn`.
pub fn log_errors() -> Middleware<HttpContext> {
    Middleware::new(|next: Handler<HttpContext>| {
        Handler::new(move |err, ctx: &mut HttpContext| {
            next.call(err, ctx);

            let causes: Vec<String> = chain(err).skip(1).map(|e| e.to_string()).collect();
            let status = ctx.status().map(|s| s.as_u16());
            if status.is_none_or(|s| s >= 500) {
                error!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    status,
                    error = %err,
                    ?causes,
                    "request failed"
                );
            } else {
                warn!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    status,
                    error = %err,
                    ?causes,
                    "request rejected"
                );
            }
        })
    })
}
