//! Extraction routes: document locations, single-query geocoding, language detection.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{default_user, error_response, run_blocking};
use crate::state::AppState;
use geosage_core::{GeoQuery, Language, StrategyKind};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", post(extract_locations))
        .route("/geocode", get(geocode))
        .route("/language", post(detect_language))
}

#[derive(Deserialize)]
struct LocationsRequest {
    input: String,
    #[serde(default)]
    return_input: bool,
    #[serde(default)]
    return_context: bool,
    strategy: Option<String>,
    language: Option<String>,
    max_requests: Option<usize>,
    #[serde(default = "default_user")]
    user_id: String,
}

impl LocationsRequest {
    fn into_query(self) -> geosage_core::Result<(GeoQuery, String)> {
        let strategy = match self.strategy.as_deref() {
            Some(s) => s.parse::<StrategyKind>()?,
            None => StrategyKind::default(),
        };
        let language = match self.language.as_deref() {
            Some(l) => l.parse::<Language>()?,
            None => Language::En,
        };
        let query = GeoQuery {
            input: self.input,
            return_input: self.return_input,
            return_context: self.return_context,
            strategy,
            language,
            max_requests: self.max_requests,
        };
        Ok((query, self.user_id))
    }
}

/// POST /api/locations — extract and geocode the locations of a document.
async fn extract_locations(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocationsRequest>,
) -> impl IntoResponse {
    let (query, user_id) = match req.into_query() {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    run_blocking(state, move |state| {
        state
            .pipeline
            .extract_locations(&state.store, &state.profiles, &query, &user_id)
    })
    .await
}

#[derive(Deserialize)]
struct GeocodeParams {
    q: String,
    /// Billed user; named like the provider's API key parameter.
    key: Option<String>,
}

/// GET /api/geocode?q=...&key=... — geocode one query, provider-shaped answer.
async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> impl IntoResponse {
    let user_id = params.key.unwrap_or_else(default_user);
    let (status, body) = run_blocking(state, move |state| {
        state
            .pipeline
            .extract_opencage(&state.store, &params.q, &user_id)
    })
    .await;

    if status == StatusCode::OK && body["status"]["code"] == 429 {
        return (StatusCode::TOO_MANY_REQUESTS, body);
    }
    (status, body)
}

#[derive(Deserialize)]
struct LanguageRequest {
    text: String,
    #[serde(default = "default_user")]
    user_id: String,
}

/// POST /api/language — identify the language of a text.
async fn detect_language(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LanguageRequest>,
) -> impl IntoResponse {
    run_blocking(state, move |state| {
        state
            .pipeline
            .detect_language(&state.store, &req.text, &req.user_id)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_locations_end_to_end() {
        let (app, _dir) = test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/locations",
            Some(json!({
                "input": "Paris is nice. Paris in spring.",
                "return_context": true,
                "user_id": "alice",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["country"], "FRA");
        assert_eq!(body["entities"][0]["query"], "Paris");
        assert_eq!(body["entities"][0]["count"], 2);
        assert_eq!(body["entities"][0]["spans"][1], json!([15, 20]));
        assert!(body["entities"][0]["contexts"].is_array());
        assert!(body.get("input").is_none());

        let (_, usage) = call(&app, "GET", "/api/usage/alice", None).await;
        assert_eq!(usage["locationCount"], 1);
        assert_eq!(usage["cacheMiss"], 1);
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_bad_request() {
        let (app, _dir) = test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/locations",
            Some(json!({"input": "Paris", "strategy": "nearest"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("nearest"));
    }

    #[tokio::test]
    async fn test_missing_profile_is_bad_request() {
        let (app, _dir) = test_app();
        let (status, _) = call(
            &app,
            "POST",
            "/api/locations",
            Some(json!({"input": "Paris", "language": "de"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geocode_provider_shape() {
        let (app, _dir) = test_app();
        let (status, body) = call(&app, "GET", "/api/geocode?q=Lyon&key=bob", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_results"], 1);
        assert_eq!(body["results"][0]["geometry"]["lat"], 48.85);
        assert_eq!(body["results"][0]["components"]["ISO_3166-1_alpha-3"], "FRA");
        assert_eq!(body["geosage"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_geocode_rate_limited() {
        let (app, _dir) = test_app();
        let (status, body) = call(&app, "GET", "/api/geocode?q=Nowhere", None).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["status"]["code"], 429);
        assert_eq!(body["total_results"], 0);

        let (_, usage) = call(&app, "GET", "/api/usage/anonymous", None).await;
        assert_eq!(usage["ratelimit"], 1);
    }

    #[tokio::test]
    async fn test_language_detection() {
        let (app, _dir) = test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/language",
            Some(json!({
                "text": "Der Bahnhof liegt in der Mitte der Stadt und ist von überall gut zu erreichen.",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "deu");
        assert!(body["confidence"].is_number());
    }
}
