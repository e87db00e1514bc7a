// src/handlers/route_handler.rs
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::errors::MasarResult;
use crate::models::route::{LatLng, LocationSuggestion, RouteInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub start: LatLng,
    pub end: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct PlaceQuery {
    pub text: String,
    pub focus_lat: Option<f64>,
    pub focus_lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyUpdate {
    pub api_key: String,
}

pub async fn compute_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> MasarResult<Json<RouteInfo>> {
    let route = state
        .route_service
        .compute_route(request.start, request.end)
        .await?;
    Ok(Json(route))
}

/// Destination search. Always returns a list; provider failures and short
/// queries both collapse to an empty one.
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlaceQuery>,
) -> Json<Vec<LocationSuggestion>> {
    let focus = match (query.focus_lat, query.focus_lng) {
        (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
        _ => None,
    };
    Json(state.route_service.search_places(&query.text, focus).await)
}

pub async fn update_api_key(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ApiKeyUpdate>,
) -> MasarResult<StatusCode> {
    state.api_key.update(&update.api_key).await?;
    Ok(StatusCode::NO_CONTENT)
}
