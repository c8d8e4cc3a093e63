//! Web router construction.

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{auth, export, status};

/// Creates the web server router.
///
/// `request_timeout` bounds a whole request, so it must exceed the longest
/// run the runner settings allow.
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    let export_router = Router::new()
        .route("/seace/export", post(export::export))
        .route_layer(from_fn_with_state(app_state.clone(), auth::require_bearer));

    Router::new()
        .route("/health", get(status::health))
        .merge(export_router)
        .with_state(app_state)
        .layer((
            // Outermost: per-request ID span and response logging.
            RequestIdLayer,
            TimeoutLayer::new(request_timeout),
        ))
}
