//! Location cache administration routes.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::run_blocking;
use crate::state::AppState;
use geosage_core::Error;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/never", post(mark_never_cache))
}

/// GET /api/cache/stats — cache size and access totals.
async fn cache_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    run_blocking(state, |state| state.store.cache_stats()).await
}

#[derive(Deserialize)]
struct NeverCacheRequest {
    query: String,
}

/// POST /api/cache/never — stop resolving a query live.
async fn mark_never_cache(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NeverCacheRequest>,
) -> impl IntoResponse {
    run_blocking(state, move |state| {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(Error::Config("query must not be empty".into()));
        }
        state.store.mark_never_cache(query)?;
        Ok(serde_json::json!({ "query": query, "status": "cache_never" }))
    })
    .await
}
