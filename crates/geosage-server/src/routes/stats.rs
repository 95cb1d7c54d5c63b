//! Health and usage routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::run_blocking;
use crate::state::AppState;
use geosage_core::Error;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/usage/{user}", get(get_usage))
}

/// GET /api/health — loaded collaborators.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "nerProfiles": state.profiles.languages(),
        "geocoder": state.geocoder.name(),
        "defaultMaxRequests": state.config.default_max_requests,
    }))
}

/// GET /api/usage/{user} — accumulated usage counters of one user.
async fn get_usage(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    run_blocking(state, move |state| {
        state
            .store
            .get_usage(&user)?
            .ok_or_else(|| Error::NotFound(format!("no usage recorded for {}", user)))
    })
    .await
}
