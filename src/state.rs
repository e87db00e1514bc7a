// src/state.rs
use std::sync::Arc;

use crate::errors::{MasarError, MasarResult};
use crate::services::fare_meter::FareMeter;
use crate::services::navigation_service::NavigationService;
use crate::services::pricing_service::PricingService;
use crate::services::ride_service::RideService;
use crate::services::route_service::{
    ApiKeyStore, LegRouteMonitor, RouteProviderConfig, RouteService, LEG_DEBOUNCE,
};

pub struct AppState {
    pub pricing_service: Arc<PricingService>,
    pub fare_meter: Arc<FareMeter>,
    pub ride_service: Arc<RideService>,
    pub route_service: Arc<RouteService>,
    pub leg_monitor: Arc<LegRouteMonitor>,
    pub navigation_service: Arc<NavigationService>,
    pub api_key: Arc<ApiKeyStore>,
    pub config: AppConfig,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub directions_url: String,
    pub geocode_url: String,
    pub routing_api_key: String,
}

impl AppConfig {
    /// Build from the environment. The routing key has no usable default
    /// and must be provided; the provider URLs fall back to the public
    /// openrouteservice endpoints.
    pub fn from_env() -> MasarResult<Self> {
        let routing_api_key = std::env::var("MASAR_ORS_API_KEY")
            .map_err(|_| MasarError::ConfigurationError("MASAR_ORS_API_KEY is not set".to_string()))?;
        if routing_api_key.trim().is_empty() {
            return Err(MasarError::ConfigurationError(
                "MASAR_ORS_API_KEY is empty".to_string(),
            ));
        }

        let defaults = RouteProviderConfig::default();
        Ok(Self {
            bind_addr: std::env::var("MASAR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            directions_url: std::env::var("MASAR_DIRECTIONS_URL")
                .unwrap_or(defaults.directions_url),
            geocode_url: std::env::var("MASAR_GEOCODE_URL").unwrap_or(defaults.geocode_url),
            routing_api_key,
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let api_key = Arc::new(ApiKeyStore::new(config.routing_api_key.clone()));
        let route_service = Arc::new(RouteService::new(
            api_key.clone(),
            RouteProviderConfig {
                directions_url: config.directions_url.clone(),
                geocode_url: config.geocode_url.clone(),
            },
        ));
        let leg_monitor = Arc::new(LegRouteMonitor::new(route_service.clone(), LEG_DEBOUNCE));

        let pricing_service = Arc::new(PricingService::new());
        let fare_meter = Arc::new(FareMeter::new());
        let ride_service = Arc::new(RideService::new(
            pricing_service.clone(),
            fare_meter.clone(),
        ));

        Self {
            pricing_service,
            fare_meter,
            ride_service,
            route_service,
            leg_monitor,
            navigation_service: Arc::new(NavigationService::new()),
            api_key,
            config,
        }
    }
}
