use axum::{
    Extension,
    extract::{Path, State},
    response::Json,
};
use axum_extra::extract::Query;
use common::errors::AppError;
use common::models::{Claims, CityWeather, SearchResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::IntoParams;

use crate::auth::TokenVerifier;
use crate::cache::TemperatureCache;
use crate::search::SearchIndex;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchIndex>,
    pub cache: TemperatureCache,
    pub verifier: Arc<dyn TokenVerifier>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cities-service",
        "cached_temperatures": state.cache.len(),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// City name prefix; empty or missing lists every city
    #[serde(default)]
    pub term: String,
    /// Maximum number of rows to return
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/cities/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching cities ordered by country then name", body = Vec<SearchResult>),
        (status = 400, description = "Invalid limit"),
        (status = 401, description = "Missing or invalid caller token"),
        (status = 503, description = "City store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn search_cities(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    if params.limit == Some(0) {
        return Err(AppError::validation("limit must be at least 1"));
    }

    let term = params.term.trim();
    info!(term = %term, caller = %claims.sub, "City search request received");

    let rows = state.search.search(term, params.limit).await?;

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/cities/{id}/weather",
    params(
        ("id" = i64, Path, description = "City id")
    ),
    responses(
        (status = 200, description = "Current weather for the city", body = CityWeather),
        (status = 401, description = "Missing or invalid caller token"),
        (status = 404, description = "Unknown city"),
        (status = 503, description = "City store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn city_weather(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CityWeather>, AppError> {
    info!(city_id = id, "City weather request received");

    let weather = state.search.city_weather(id).await?;

    Ok(Json(weather))
}
