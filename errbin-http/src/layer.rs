//! axum middleware running the dispatcher after each request.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use errbin_common::Dispatcher;
use tracing::trace;

use crate::context::HttpContext;
use crate::recorded::RecordedError;

/// Dispatcher shared with the request pipeline.
pub type SharedDispatcher = Arc<Dispatcher<HttpContext>>;

/// Run the inner service, then map its recorded error (if any) to a response.
pub async fn dispatch_errors(
    State(dispatcher): State<SharedDispatcher>,
    request: Request,
    next: Next,
) -> Response {
    let mut ctx = HttpContext::new(request.method().clone(), request.uri());
    let mut response = next.run(request).await;

    let Some(recorded) = response.extensions_mut().remove::<RecordedError>() else {
        return response;
    };

    trace!(
        method = %ctx.method(),
        path = ctx.path(),
        error = %recorded,
        "dispatching recorded error"
    );
    dispatcher.dispatch(Some(recorded.error()), &mut ctx);
    ctx.into_response(response)
}

/// Install [`dispatch_errors`] on every route of `router`.
pub fn attach<S>(router: Router<S>, dispatcher: SharedDispatcher) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(dispatcher, dispatch_errors))
}
