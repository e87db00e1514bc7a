use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use masar_realtime::{
    handlers::{pricing_handler, ride_handler, route_handler},
    state::{AppConfig, AppState},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().unwrap();
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config);

    let app = Router::new()
        .route("/ride", get(ride_handler::get_current_ride))
        .route("/ride/request", post(ride_handler::request_ride))
        .route("/ride/accept", post(ride_handler::accept_ride))
        .route("/ride/reject", post(ride_handler::reject_ride))
        .route("/ride/status", post(ride_handler::update_ride_status))
        .route("/ride/cancel", post(ride_handler::cancel_ride))
        .route("/ride/complete", post(ride_handler::complete_ride))
        .route("/ride/live", get(ride_handler::get_live_trip_data))
        .route(
            "/driver/location",
            get(ride_handler::get_driver_location).post(ride_handler::update_driver_location),
        )
        .route("/driver/leg", get(ride_handler::get_leg_route))
        .route("/driver/guidance", get(ride_handler::get_navigation_guidance))
        .route("/routes", post(route_handler::compute_route))
        .route("/places", get(route_handler::search_places))
        .route(
            "/pricing",
            get(pricing_handler::get_pricing).put(pricing_handler::update_pricing),
        )
        .route("/pricing/estimate", post(pricing_handler::estimate_fare))
        .route("/config/api-key", put(route_handler::update_api_key))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(app_state));

    tracing::info!("Listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
