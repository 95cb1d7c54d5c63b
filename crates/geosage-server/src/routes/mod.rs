//! HTTP route handlers.

pub mod cache;
pub mod extract;
pub mod stats;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;
use geosage_core::Error;

/// Caller billed when a request names no user.
pub const ANONYMOUS_USER: &str = "anonymous";

type ApiResponse = (StatusCode, Json<serde_json::Value>);

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(extract::routes())
        .merge(cache::routes())
        .merge(stats::routes())
}

fn default_user() -> String {
    ANONYMOUS_USER.to_string()
}

/// Run synchronous pipeline work off the async executor.
async fn run_blocking<T, F>(state: Arc<AppState>, work: F) -> ApiResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&AppState) -> geosage_core::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&state)).await {
        Ok(Ok(value)) => match serde_json::to_value(value) {
            Ok(json) => (StatusCode::OK, Json(json)),
            Err(e) => error_response(&Error::Json(e)),
        },
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("Blocking task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal task failure" })),
            )
        }
    }
}

fn error_response(e: &Error) -> ApiResponse {
    let status = match e {
        Error::Config(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => {
            error!("Request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}
