// src/handlers/pricing_handler.rs
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::user::VehicleType;
use crate::services::pricing_service::PricingSettings;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FareEstimateRequest {
    pub vehicle_type: VehicleType,
    pub distance_km: f64,
    pub duration_min: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct FareEstimateResponse {
    pub estimated_fare: i64,
}

pub async fn get_pricing(State(state): State<Arc<AppState>>) -> Json<PricingSettings> {
    Json(state.pricing_service.settings().await)
}

/// Admin override for the per-vehicle rate table. Replaces the whole
/// table; vehicle types missing from the new table fall back to zero fares.
pub async fn update_pricing(
    State(state): State<Arc<AppState>>,
    Json(new_settings): Json<PricingSettings>,
) -> Json<PricingSettings> {
    state.pricing_service.update_pricing(new_settings).await;
    Json(state.pricing_service.settings().await)
}

pub async fn estimate_fare(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FareEstimateRequest>,
) -> Json<FareEstimateResponse> {
    let estimated_fare = state
        .pricing_service
        .estimate_fare(request.vehicle_type, request.distance_km, request.duration_min)
        .await;
    Json(FareEstimateResponse { estimated_fare })
}
