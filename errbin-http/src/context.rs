//! Response context handed to error handlers.

use axum::Json;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use errbin_common::ResponseSink;

use crate::recorded::RecordedError;

/// Mutable response state for one request.
///
/// Handlers write a single outcome; a later write replaces an earlier one.
/// When nothing is written the pipeline's original response is kept.
#[derive(Debug)]
pub struct HttpContext {
    method: Method,
    path: String,
    outcome: Option<Outcome>,
    headers: HeaderMap,
}

#[derive(Debug)]
struct Outcome {
    status: StatusCode,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

impl HttpContext {
    pub fn new(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            outcome: None,
            headers: HeaderMap::new(),
        }
    }

    /// Method of the request that failed.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path of the request that failed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.outcome.as_ref().map(|o| o.status)
    }

    pub fn is_written(&self) -> bool {
        self.outcome.is_some()
    }

    /// Respond with a JSON body.
    pub fn json(&mut self, status: StatusCode, body: serde_json::Value) {
        self.outcome = Some(Outcome {
            status,
            body: Body::Json(body),
        });
    }

    /// Respond with a plain-text body.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.outcome = Some(Outcome {
            status,
            body: Body::Text(body.into()),
        });
    }

    /// Respond with a status and no body.
    pub fn empty(&mut self, status: StatusCode) {
        self.outcome = Some(Outcome {
            status,
            body: Body::Empty,
        });
    }

    /// Add a header to the final response, written outcome or not.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Build the final response, or return `original` if nothing was written.
    ///
    /// Inserted headers are applied in both cases.
    pub fn into_response(self, mut original: Response) -> Response {
        let Some(outcome) = self.outcome else {
            original.extensions_mut().remove::<RecordedError>();
            original.headers_mut().extend(self.headers);
            return original;
        };

        let mut response = match outcome.body {
            Body::Json(value) => (outcome.status, Json(value)).into_response(),
            Body::Text(text) => (outcome.status, text).into_response(),
            Body::Empty => outcome.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

impl ResponseSink for HttpContext {
    fn write_error(&mut self, status: u16, body: serde_json::Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.json(status, body);
    }
}
