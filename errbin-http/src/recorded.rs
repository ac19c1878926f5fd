//! Recording the terminal error of a request.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error recorded by a request handler for later dispatch.
///
/// Route handlers return `Result<T, RecordedError>` and use `?` on any error
/// type. The error travels to the dispatch middleware inside the response
/// extensions; recording again replaces the previous error.
#[derive(Clone)]
pub struct RecordedError(Arc<dyn Error + Send + Sync + 'static>);

impl RecordedError {
    pub fn new(err: impl Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    /// The recorded error.
    pub fn error(&self) -> &(dyn Error + 'static) {
        &*self.0
    }
}

impl<E> From<E> for RecordedError
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::new(err)
    }
}

impl fmt::Debug for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordedError").field(&self.0).finish()
    }
}

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl IntoResponse for RecordedError {
    /// Placeholder `500` carrying the error in its extensions.
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}
