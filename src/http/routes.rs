//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::config::Controls;
use crate::game::{Fighter, FighterSummary, MatchInfo};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Timeout for plain HTTP requests (not applied to the WebSocket route)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/controls", get(controls_handler))
        .route("/fighters", get(fighters_handler))
        .route("/fighters/:id", get(fighter_details_handler))
        .route("/fights", get(fights_handler))
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        );

    Router::new()
        .merge(api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_fights: usize,
    cached_fighters: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_fights: state.match_registry.active_matches(),
        cached_fighters: state.fighter_store.cached_fighters(),
    })
}

// ============================================================================
// Fighter endpoints
// ============================================================================

async fn controls_handler(State(state): State<AppState>) -> Json<Controls> {
    Json(state.config.controls.clone())
}

async fn fighters_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<FighterSummary>>, AppError> {
    let fighters = state
        .fighter_store
        .list_fighters()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(fighters))
}

async fn fighter_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Fighter>, AppError> {
    let fighter = state
        .fighter_store
        .get_fighter(&id)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Fighter {} not found", id)))?;

    Ok(Json(fighter))
}

// ============================================================================
// Fight endpoints
// ============================================================================

#[derive(Serialize)]
struct FightsResponse {
    fights: Vec<MatchInfo>,
}

async fn fights_handler(State(state): State<AppState>) -> Json<FightsResponse> {
    Json(FightsResponse {
        fights: state.match_registry.list(),
    })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Fighter API unavailable: {0}")]
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let response = AppError::NotFound("Fighter 9 not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::Upstream("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
