use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::state::AppState;
use crate::domain::series::MarketSeriesResponse;
use crate::network::{PROXY_ALTCOIN_SEASON_ROUTE, PROXY_DOMINANCE_ROUTE};
use crate::shared::{SeriesKind, SeriesRequest};

// ── Query params ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
}

/// Assemble the proxy router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PROXY_ALTCOIN_SEASON_ROUTE, get(altcoin_season))
        .route(PROXY_DOMINANCE_ROUTE, get(dominance))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn altcoin_season(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<MarketSeriesResponse>, ApiError> {
    let Query(range) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start ({start}) must not be after end ({end})"
            )));
        }
    }

    let request = SeriesRequest::new(SeriesKind::AltcoinSeason, range.start, range.end);
    serve(&state, request).await
}

async fn dominance(
    State(state): State<AppState>,
) -> Result<Json<MarketSeriesResponse>, ApiError> {
    serve(&state, SeriesRequest::dominance()).await
}

async fn serve(
    state: &AppState,
    request: SeriesRequest,
) -> Result<Json<MarketSeriesResponse>, ApiError> {
    let kind = request.kind;
    let resp = state
        .upstream
        .fetch(&request)
        .await
        .map_err(|e| ApiError::fetch(kind, e))?;
    Ok(Json(resp.as_ref().clone()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
