//! Demo HTTP routes.
//!
//! Handlers return [`RecordedError`] on failure and leave the response to the
//! error dispatcher installed by [`create_router`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use errbin_common::ErrorId;
use errbin_http::{RecordedError, SharedDispatcher, attach};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::catalog::Catalog;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub dispatcher: SharedDispatcher,
    pub started_at: Instant,
    pub maintenance: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(catalog: Catalog, dispatcher: SharedDispatcher) -> Self {
        Self {
            catalog,
            dispatcher,
            started_at: Instant::now(),
            maintenance: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Debug, Error)]
#[error("no user with id {id}")]
struct UserError {
    id: u64,
    #[source]
    cause: ErrorId,
}

#[derive(Debug, Error)]
#[error("order {id} does not exist")]
struct OrderError {
    id: u64,
    #[source]
    cause: ErrorId,
}

#[derive(Debug, Error)]
#[error("cannot sign up {email}")]
struct SignupError {
    email: String,
    #[source]
    cause: ErrorId,
}

#[derive(Debug, Deserialize)]
struct Signup {
    email: String,
}

#[derive(Debug, Deserialize)]
struct Maintenance {
    enabled: bool,
}

/// Create the router with error dispatch installed on every route.
pub fn create_router(state: AppState) -> Router {
    let dispatcher = state.dispatcher.clone();
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/users/{id}", get(user_handler))
        .route("/orders/{id}", get(order_handler))
        .route("/signup", post(signup_handler))
        .route("/status", get(status_handler))
        .route("/status/maintenance", put(maintenance_handler))
        .route("/boom", get(boom_handler))
        .with_state(Arc::new(state));
    attach(routes, dispatcher)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, RecordedError> {
    if id == 1 {
        return Ok(Json(json!({ "id": 1, "name": "alice" })));
    }
    Err(UserError {
        id,
        cause: state.catalog.user_not_found.clone(),
    }
    .into())
}

async fn order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, RecordedError> {
    if id > 1000 {
        return Err(OrderError {
            id,
            cause: state.catalog.order_not_found.clone(),
        }
        .into());
    }
    Ok(Json(json!({ "id": id, "items": 3 })))
}

async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(signup): Json<Signup>,
) -> Result<impl IntoResponse, RecordedError> {
    if signup.email.eq_ignore_ascii_case("taken@example.com") {
        return Err(SignupError {
            email: signup.email,
            cause: state.catalog.duplicate_email.clone(),
        }
        .into());
    }
    info!(email = %signup.email, "signed up");
    Ok((StatusCode::CREATED, Json(json!({ "email": signup.email }))))
}

/// Uptime and the registered error tree, or `unavailable` in maintenance mode.
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, RecordedError> {
    if state.maintenance.load(Ordering::Relaxed) {
        return Err(state.catalog.unavailable.clone().into());
    }
    Ok(Json(json!({
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "errors": state.dispatcher.hierarchy().snapshot(),
    })))
}

async fn maintenance_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Maintenance>,
) -> StatusCode {
    state.maintenance.store(body.enabled, Ordering::Relaxed);
    info!(enabled = body.enabled, "maintenance mode changed");
    StatusCode::NO_CONTENT
}

/// Fails with an error no handler is registered for.
async fn boom_handler() -> Result<(), RecordedError> {
    Err(std::io::Error::other("disk on fire").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_dispatcher;
    use crate::config::DaemonConfig;
    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use tower::ServiceExt;

    fn make_test_state(config: &DaemonConfig) -> AppState {
        let catalog = Catalog::new();
        let dispatcher = build_dispatcher(&catalog, config).unwrap();
        AppState::new(catalog, Arc::new(dispatcher))
    }

    fn app() -> Router {
        create_router(make_test_state(&DaemonConfig::default()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_known_user() {
        let response = app().oneshot(get_request("/users/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "alice");
    }

    #[tokio::test]
    async fn test_missing_user_uses_specific_handler() {
        let response = app().oneshot(get_request("/users/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "user_not_found");
        assert_eq!(json["error"], "no user with id 7");
    }

    #[tokio::test]
    async fn test_missing_order_inherits_not_found() {
        let response = app().oneshot(get_request("/orders/4242")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["error"], "order 4242 does not exist");
        assert!(json.get("code").is_none());
    }

    #[tokio::test]
    async fn test_signup_conflict_and_success() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/signup",
                json!({ "email": "taken@example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/signup",
                json!({ "email": "new@example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["email"], "new@example.com");
    }

    #[tokio::test]
    async fn test_status_reports_error_tree() {
        let response = app().oneshot(get_request("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let roots = json["errors"]["roots"].as_array().unwrap();
        assert_eq!(roots.len(), 3);
        assert_eq!(roots[0]["identity"], "not found");
        assert_eq!(roots[0]["children"][0]["identity"], "user not found: not found");
    }

    #[tokio::test]
    async fn test_maintenance_mode_returns_unavailable() {
        let router = app();
        let response = router
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/status/maintenance",
                json!({ "enabled": true }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router.oneshot(get_request("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }

    #[tokio::test]
    async fn test_boom_exposes_message_by_default() {
        let response = app().oneshot(get_request("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "disk on fire");
    }

    #[tokio::test]
    async fn test_boom_hides_message_when_configured() {
        let mut config = DaemonConfig::default();
        config.fallback.expose_message = false;
        let router = create_router(make_test_state(&config));

        let response = router.oneshot(get_request("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "internal server error");
    }
}
