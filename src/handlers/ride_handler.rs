// src/handlers/ride_handler.rs
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::errors::{MasarError, MasarResult};
use crate::models::ride::{LiveTripData, Ride, RideRequest, RideStatusUpdate};
use crate::models::route::{LatLng, RouteInfo, Step};
use crate::models::user::Driver;
use crate::services::navigation_service;
use crate::services::ride_service::RideOperations;
use crate::state::AppState;

pub async fn request_ride(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RideRequest>,
) -> MasarResult<Json<Ride>> {
    let ride = state.ride_service.request_ride(request).await?;
    Ok(Json(ride))
}

pub async fn accept_ride(
    State(state): State<Arc<AppState>>,
    Json(driver): Json<Driver>,
) -> MasarResult<Json<Ride>> {
    let ride = state.ride_service.accept_ride(&driver).await?;
    Ok(Json(ride))
}

pub async fn reject_ride(State(state): State<Arc<AppState>>) -> MasarResult<StatusCode> {
    state.ride_service.reject_ride().await?;
    state.leg_monitor.clear().await;
    state.navigation_service.clear().await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_ride_status(
    State(state): State<Arc<AppState>>,
    Json(update): Json<RideStatusUpdate>,
) -> MasarResult<Json<Ride>> {
    let ride = state.ride_service.update_ride_status(update.status).await?;
    Ok(Json(ride))
}

pub async fn cancel_ride(State(state): State<Arc<AppState>>) -> MasarResult<Json<Ride>> {
    let ride = state.ride_service.cancel_ride().await?;
    state.leg_monitor.clear().await;
    state.navigation_service.clear().await;
    Ok(Json(ride))
}

pub async fn complete_ride(State(state): State<Arc<AppState>>) -> MasarResult<Json<Ride>> {
    let ride = state.ride_service.complete_ride().await?;
    state.leg_monitor.clear().await;
    state.navigation_service.clear().await;
    Ok(Json(ride))
}

pub async fn get_current_ride(State(state): State<Arc<AppState>>) -> MasarResult<Json<Ride>> {
    let ride = state
        .ride_service
        .current_ride()
        .await
        .ok_or(MasarError::NoActiveRide)?;
    Ok(Json(ride))
}

/// Meter readout for the ride in progress. Null while no meter is running.
pub async fn get_live_trip_data(
    State(state): State<Arc<AppState>>,
) -> Json<Option<LiveTripData>> {
    Json(state.ride_service.live_trip_data().await)
}

/// Driver position feed. Each update also schedules a debounced
/// recomputation of the driver's current leg so the customer map stays
/// roughly in sync without hammering the provider.
pub async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Json(location): Json<LatLng>,
) -> MasarResult<StatusCode> {
    if !location.is_finite() {
        return Err(MasarError::invalid_coordinates(
            "driver location must be finite",
        ));
    }

    state.ride_service.update_driver_location(location).await;
    if let Some(destination) = state.ride_service.leg_destination().await {
        state.leg_monitor.schedule(location, destination).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_driver_location(
    State(state): State<Arc<AppState>>,
) -> Json<Option<LatLng>> {
    Json(state.ride_service.driver_live_location().await)
}

/// The most recently computed route for the driver's current leg.
pub async fn get_leg_route(State(state): State<Arc<AppState>>) -> Json<Option<RouteInfo>> {
    Json(state.leg_monitor.current().await)
}

#[derive(Debug, serde::Serialize)]
pub struct GuidanceView {
    pub step_index: usize,
    pub current_step: Step,
    pub next_step: Option<Step>,
    pub distance_to_next_maneuver: String,
    pub remaining_time: String,
    pub eta: chrono::DateTime<chrono::Utc>,
}

/// Turn-by-turn guidance for the driver's navigation overlay, derived from
/// the last reported position and the current leg route. Null until both
/// a position and a routed leg with steps exist.
pub async fn get_navigation_guidance(
    State(state): State<Arc<AppState>>,
) -> Json<Option<GuidanceView>> {
    let Some(position) = state.ride_service.driver_live_location().await else {
        return Json(None);
    };
    let Some(route) = state.leg_monitor.current().await else {
        return Json(None);
    };

    let remaining_time = navigation_service::format_duration_min(route.duration_min);
    let eta = navigation_service::estimated_arrival(route.duration_min);

    state.navigation_service.set_route(route).await;
    let guidance = state.navigation_service.update(position).await;

    Json(guidance.map(|guidance| GuidanceView {
        step_index: guidance.step_index,
        current_step: guidance.current_step,
        next_step: guidance.next_step,
        distance_to_next_maneuver: navigation_service::format_distance(
            guidance.distance_to_next_maneuver_m,
        ),
        remaining_time,
        eta,
    }))
}
