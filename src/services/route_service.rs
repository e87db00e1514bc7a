// src/services/route_service.rs
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing;

use crate::errors::{MasarError, MasarResult};
use crate::models::route::{LatLng, LocationSuggestion, RouteInfo, Step};
use crate::utils::geo::haversine_km;

/// Below this straight-line distance the endpoints are effectively the same
/// place; querying the provider would only produce errors.
const VERY_CLOSE_DISTANCE_KM: f64 = 0.05;

/// Safe upper bound for a country-wide app; anything above it is a bad
/// input, not a routable trip.
const MAX_REASONABLE_DISTANCE_KM: f64 = 1500.0;

/// Quiet period before a driver-location change triggers a leg recompute.
pub const LEG_DEBOUNCE: Duration = Duration::from_secs(2);

const DEFAULT_DIRECTIONS_URL: &str =
    "https://api.openrouteservice.org/v2/directions/driving-car/geojson";
const DEFAULT_GEOCODE_URL: &str = "https://api.openrouteservice.org/geocode/search";

/// Runtime-mutable key for the routing/geocoding provider.
pub struct ApiKeyStore {
    key: RwLock<String>,
}

impl ApiKeyStore {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(initial.into()),
        }
    }

    pub async fn get(&self) -> String {
        self.key.read().await.clone()
    }

    /// Empty or whitespace-only updates are rejected so a botched admin
    /// edit cannot wipe out routing for the whole session.
    pub async fn update(&self, new_key: &str) -> MasarResult<()> {
        let trimmed = new_key.trim();
        if trimmed.is_empty() {
            return Err(MasarError::InvalidApiKeyUpdate);
        }
        tracing::info!("Routing API key updated");
        *self.key.write().await = trimmed.to_string();
        Ok(())
    }
}

#[derive(Clone)]
pub struct RouteProviderConfig {
    pub directions_url: String,
    pub geocode_url: String,
}

impl Default for RouteProviderConfig {
    fn default() -> Self {
        Self {
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
        }
    }
}

pub struct RouteService {
    client: reqwest::Client,
    api_key: Arc<ApiKeyStore>,
    config: RouteProviderConfig,
}

impl RouteService {
    pub fn new(api_key: Arc<ApiKeyStore>, config: RouteProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        }
    }

    /// Compute a driving route between two points.
    ///
    /// Inputs are validated and sanity-checked against the straight-line
    /// distance before any provider call is made; degenerate pairs resolve
    /// to a zero-length route locally.
    pub async fn compute_route(&self, start: LatLng, end: LatLng) -> MasarResult<RouteInfo> {
        validate_endpoints(start, end)?;

        let preflight_km = haversine_km(start, end);
        if preflight_km < VERY_CLOSE_DISTANCE_KM {
            tracing::warn!(
                "Route pre-flight: points are {:.4} km apart, returning zero-length route",
                preflight_km
            );
            return Ok(RouteInfo::zero_length(start, end));
        }
        if preflight_km > MAX_REASONABLE_DISTANCE_KM {
            tracing::warn!("Route pre-flight: {:.1} km exceeds routable bound", preflight_km);
            return Err(MasarError::DistanceTooLarge { distance_km: preflight_km });
        }

        // Provider takes lon,lat pairs
        let body = json!({
            "coordinates": [[start.lng, start.lat], [end.lng, end.lat]],
        });

        let response = self
            .client
            .post(&self.config.directions_url)
            .header(AUTHORIZATION, self.api_key.get().await)
            .header(ACCEPT, "application/json, application/geo+json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_directions_response(status, &text, start, end, preflight_km)
    }

    /// Geocoding search for the destination picker. Advisory only: short
    /// queries are skipped and provider failures collapse to an empty list.
    pub async fn search_places(
        &self,
        query: &str,
        focus: Option<LatLng>,
    ) -> Vec<LocationSuggestion> {
        if query.trim().chars().count() < 3 {
            return Vec::new();
        }

        match self.try_search(query, focus).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                tracing::warn!("Place search failed, returning no suggestions: {}", err);
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        focus: Option<LatLng>,
    ) -> MasarResult<Vec<LocationSuggestion>> {
        let mut request = self
            .client
            .get(&self.config.geocode_url)
            .header(AUTHORIZATION, self.api_key.get().await)
            .query(&[("text", query)]);

        if let Some(point) = focus {
            request = request.query(&[
                ("focus.point.lon", point.lng.to_string()),
                ("focus.point.lat", point.lat.to_string()),
            ]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MasarError::NetworkError(format!(
                "geocode endpoint returned status {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response.json().await?;
        let suggestions = body
            .features
            .unwrap_or_default()
            .into_iter()
            .filter_map(|feature| {
                let label = feature.properties?.label?;
                let coords = feature.geometry?.coordinates;
                if coords.len() != 2 {
                    return None;
                }
                Some(LocationSuggestion {
                    name: label,
                    coordinates: LatLng::new(coords[1], coords[0]),
                })
            })
            .collect();

        Ok(suggestions)
    }
}

fn validate_endpoints(start: LatLng, end: LatLng) -> MasarResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(MasarError::invalid_coordinates(
            "start or end coordinate is not a finite number",
        ));
    }
    if start.is_null_island() || end.is_null_island() {
        return Err(MasarError::invalid_coordinates(
            "(0,0) coordinate detected, refusing to route",
        ));
    }
    Ok(())
}

// ---- Provider response parsing ----
//
// Kept pure over the response body so every mapping rule is testable
// without a network.

#[derive(Deserialize)]
struct DirectionsResponse {
    error: Option<ProviderError>,
    features: Option<Vec<RouteFeature>>,
}

#[derive(Deserialize)]
struct ProviderError {
    code: Option<u64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RouteFeature {
    properties: Option<RouteProperties>,
    geometry: Option<RouteGeometry>,
}

#[derive(Deserialize)]
struct RouteProperties {
    summary: Option<RouteSummary>,
    #[serde(default)]
    segments: Vec<RouteSegment>,
}

#[derive(Deserialize)]
struct RouteSummary {
    distance: Option<f64>,
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct RouteSegment {
    #[serde(default)]
    steps: Vec<ProviderStep>,
}

#[derive(Deserialize)]
struct ProviderStep {
    distance: f64,
    duration: f64,
    #[serde(rename = "type")]
    maneuver: u8,
    #[serde(default)]
    instruction: String,
    #[serde(default)]
    name: String,
    way_points: Vec<usize>,
}

#[derive(Deserialize)]
struct RouteGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    features: Option<Vec<GeocodeFeature>>,
}

#[derive(Deserialize)]
struct GeocodeFeature {
    properties: Option<GeocodeProperties>,
    geometry: Option<GeocodeGeometry>,
}

#[derive(Deserialize)]
struct GeocodeProperties {
    label: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    coordinates: Vec<f64>,
}

const ERROR_CODE_NO_ROUTE: u64 = 2004;
const ERROR_CODE_UNROUTABLE_POINT: u64 = 2010;

fn parse_directions_response(
    status: u16,
    body: &str,
    start: LatLng,
    end: LatLng,
    preflight_km: f64,
) -> MasarResult<RouteInfo> {
    if status == 403 {
        return Err(MasarError::InvalidApiKey);
    }

    let parsed: DirectionsResponse = serde_json::from_str(body).map_err(|_| {
        if (200..300).contains(&status) {
            MasarError::malformed_response("response body is not valid JSON")
        } else {
            MasarError::NoRouteFound(format!("provider returned status {}", status))
        }
    })?;

    if let Some(error) = parsed.error {
        let message = error.message.unwrap_or_else(|| "unknown provider failure".to_string());
        if error.code == Some(ERROR_CODE_UNROUTABLE_POINT)
            || message.to_lowercase().contains("could not find point")
        {
            return Err(MasarError::PointNotOnRoad);
        }
        if error.code == Some(ERROR_CODE_NO_ROUTE) {
            return Err(MasarError::NoRouteFound(message));
        }
        return Err(MasarError::NoRouteFound(message));
    }
    if !(200..300).contains(&status) {
        return Err(MasarError::NoRouteFound(format!(
            "provider returned status {}",
            status
        )));
    }

    let feature = parsed
        .features
        .and_then(|mut features| {
            if features.is_empty() {
                None
            } else {
                Some(features.remove(0))
            }
        })
        .ok_or_else(|| MasarError::malformed_response("no route feature in response"))?;

    let geometry = feature
        .geometry
        .ok_or_else(|| MasarError::malformed_response("route has no geometry"))?;
    if geometry.kind != "LineString" {
        return Err(MasarError::malformed_response(format!(
            "unsupported geometry type '{}'",
            geometry.kind
        )));
    }

    // Provider geometry is lon,lat; the system's polyline is lat,lng.
    let polyline: Vec<LatLng> = geometry
        .coordinates
        .iter()
        .filter(|pair| pair.len() == 2 && pair.iter().all(|c| c.is_finite()))
        .map(|pair| LatLng::new(pair[1], pair[0]))
        .collect();

    if polyline.len() < 2 {
        // Consistent with the pre-flight short-circuit: a degenerate
        // geometry over a near-zero distance is a zero-length route.
        if preflight_km < VERY_CLOSE_DISTANCE_KM {
            return Ok(RouteInfo::zero_length(start, end));
        }
        return Err(MasarError::malformed_response(
            "geometry has fewer than 2 valid points",
        ));
    }

    let properties = feature
        .properties
        .ok_or_else(|| MasarError::malformed_response("route has no properties"))?;
    let summary = properties
        .summary
        .ok_or_else(|| MasarError::malformed_response("route has no summary"))?;
    let (distance_m, duration_s) = match (summary.distance, summary.duration) {
        (Some(d), Some(t)) => (d, t),
        _ => {
            return Err(MasarError::malformed_response(
                "summary is missing distance or duration",
            ))
        }
    };

    let steps: Vec<Step> = properties
        .segments
        .into_iter()
        .flat_map(|segment| segment.steps)
        .filter(|step| step.way_points.len() >= 2)
        .map(|step| Step {
            distance_m: step.distance,
            duration_s: step.duration,
            maneuver: step.maneuver.into(),
            instruction: step.instruction,
            name: step.name,
            way_points: (step.way_points[0], step.way_points[1]),
        })
        .collect();

    Ok(RouteInfo {
        distance_km: round2(distance_m / 1000.0),
        duration_min: round2(duration_s / 60.0),
        polyline,
        steps: if steps.is_empty() { None } else { Some(steps) },
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Debounced recomputation of the current leg's route while the driver
/// moves. Only the latest pending computation survives a burst of
/// location updates.
pub struct LegRouteMonitor {
    route_service: Arc<RouteService>,
    latest: Arc<RwLock<Option<RouteInfo>>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    debounce: Duration,
}

impl LegRouteMonitor {
    pub fn new(route_service: Arc<RouteService>, debounce: Duration) -> Self {
        Self {
            route_service,
            latest: Arc::new(RwLock::new(None)),
            pending: Mutex::new(None),
            debounce,
        }
    }

    /// Schedule a recompute of the leg from `start` to `end`, replacing any
    /// recompute still waiting out its quiet period.
    pub async fn schedule(&self, start: LatLng, end: LatLng) {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let route_service = self.route_service.clone();
        let latest = self.latest.clone();
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            match route_service.compute_route(start, end).await {
                Ok(route) => {
                    tracing::debug!(
                        "Leg recomputed: {:.2} km, {:.1} min remaining",
                        route.distance_km,
                        route.duration_min
                    );
                    *latest.write().await = Some(route);
                }
                Err(err) => {
                    // Leg stats are advisory; keep the previous values.
                    tracing::warn!("Leg recompute failed: {}", err);
                }
            }
        }));
    }

    pub async fn current(&self) -> Option<RouteInfo> {
        self.latest.read().await.clone()
    }

    /// Drop the cached leg and cancel any pending recompute.
    pub async fn clear(&self) {
        if let Some(previous) = self.pending.lock().await.take() {
            previous.abort();
        }
        *self.latest.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_unreachable_provider() -> RouteService {
        RouteService::new(
            Arc::new(ApiKeyStore::new("test-key")),
            RouteProviderConfig {
                directions_url: "http://127.0.0.1:9/directions".to_string(),
                geocode_url: "http://127.0.0.1:9/geocode".to_string(),
            },
        )
    }

    fn damascus() -> LatLng {
        LatLng::new(33.5138, 36.2765)
    }

    #[tokio::test]
    async fn test_rejects_non_finite_coordinates() {
        let service = service_with_unreachable_provider();
        let result = service
            .compute_route(LatLng::new(f64::NAN, 36.0), damascus())
            .await;
        assert!(matches!(result, Err(MasarError::InvalidCoordinates(_))));
    }

    #[tokio::test]
    async fn test_rejects_null_island() {
        let service = service_with_unreachable_provider();
        let result = service.compute_route(LatLng::new(0.0, 0.0), damascus()).await;
        assert!(matches!(result, Err(MasarError::InvalidCoordinates(_))));
    }

    #[tokio::test]
    async fn test_very_close_points_short_circuit() {
        // ~22 m apart: must resolve locally, the provider is unreachable here.
        let service = service_with_unreachable_provider();
        let start = damascus();
        let end = LatLng::new(33.5140, 36.2765);
        let route = service.compute_route(start, end).await.unwrap();
        assert_eq!(route.distance_km, 0.0);
        assert_eq!(route.duration_min, 0.0);
        assert_eq!(route.polyline, vec![start, end]);
    }

    #[tokio::test]
    async fn test_excessive_distance_fails_fast() {
        // Damascus to Lisbon, far beyond the 1500 km bound, no provider call.
        let service = service_with_unreachable_provider();
        let result = service
            .compute_route(damascus(), LatLng::new(38.7223, -9.1393))
            .await;
        assert!(matches!(result, Err(MasarError::DistanceTooLarge { .. })));
    }

    #[test]
    fn test_parse_403_maps_to_invalid_api_key() {
        let result = parse_directions_response(403, "forbidden", damascus(), aleppo(), 310.0);
        assert_eq!(result.unwrap_err(), MasarError::InvalidApiKey);
    }

    fn aleppo() -> LatLng {
        LatLng::new(36.2021, 37.1594)
    }

    #[test]
    fn test_parse_unroutable_point_error() {
        let body = r#"{"error":{"code":2010,"message":"Could not find point 0"}}"#;
        let result = parse_directions_response(404, body, damascus(), aleppo(), 310.0);
        assert_eq!(result.unwrap_err(), MasarError::PointNotOnRoad);

        let body = r#"{"error":{"message":"could not find point within search radius"}}"#;
        let result = parse_directions_response(404, body, damascus(), aleppo(), 310.0);
        assert_eq!(result.unwrap_err(), MasarError::PointNotOnRoad);
    }

    #[test]
    fn test_parse_no_route_error() {
        let body = r#"{"error":{"code":2004,"message":"Route could not be found"}}"#;
        let result = parse_directions_response(404, body, damascus(), aleppo(), 310.0);
        assert!(matches!(result, Err(MasarError::NoRouteFound(_))));
    }

    #[test]
    fn test_parse_missing_geometry_is_malformed() {
        let body = r#"{"features":[{"properties":{"summary":{"distance":1000,"duration":120}}}]}"#;
        let result = parse_directions_response(200, body, damascus(), aleppo(), 310.0);
        assert!(matches!(result, Err(MasarError::MalformedProviderResponse(_))));
    }

    #[test]
    fn test_parse_missing_summary_is_malformed() {
        let body = r#"{"features":[{"properties":{},"geometry":{"type":"LineString","coordinates":[[36.27,33.51],[37.15,36.20]]}}]}"#;
        let result = parse_directions_response(200, body, damascus(), aleppo(), 310.0);
        assert!(matches!(result, Err(MasarError::MalformedProviderResponse(_))));
    }

    #[test]
    fn test_parse_non_linestring_is_malformed() {
        let body = r#"{"features":[{"properties":{"summary":{"distance":1000,"duration":120}},"geometry":{"type":"Point","coordinates":[[36.27,33.51]]}}]}"#;
        let result = parse_directions_response(200, body, damascus(), aleppo(), 310.0);
        assert!(matches!(result, Err(MasarError::MalformedProviderResponse(_))));
    }

    #[test]
    fn test_parse_success_converts_units_and_axis_order() {
        let body = r#"{
            "features": [{
                "properties": {
                    "summary": {"distance": 5250.0, "duration": 744.0},
                    "segments": [{
                        "steps": [
                            {"distance": 120.0, "duration": 20.0, "type": 11,
                             "instruction": "Head north", "name": "Baghdad Street",
                             "way_points": [0, 1]},
                            {"distance": 5130.0, "duration": 724.0, "type": 1,
                             "instruction": "Turn right", "name": "Airport Road",
                             "way_points": [1, 2]}
                        ]
                    }]
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[36.2765, 33.5138], [36.2800, 33.5200], [36.2900, 33.5300]]
                }
            }]
        }"#;

        let route = parse_directions_response(200, body, damascus(), aleppo(), 310.0).unwrap();
        assert_eq!(route.distance_km, 5.25);
        assert_eq!(route.duration_min, 12.4);
        assert_eq!(route.polyline.len(), 3);
        // lon,lat in the body becomes lat,lng here
        assert_eq!(route.polyline[0], LatLng::new(33.5138, 36.2765));

        let steps = route.steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].name, "Airport Road");
        assert_eq!(steps[1].way_points, (1, 2));
    }

    #[test]
    fn test_parse_degenerate_polyline_with_tiny_preflight() {
        let body = r#"{"features":[{"properties":{"summary":{"distance":5,"duration":2}},"geometry":{"type":"LineString","coordinates":[[36.2765,33.5138]]}}]}"#;
        let start = damascus();
        let end = LatLng::new(33.5140, 36.2765);

        let route = parse_directions_response(200, body, start, end, 0.02).unwrap();
        assert_eq!(route.distance_km, 0.0);
        assert_eq!(route.polyline, vec![start, end]);

        // Same degenerate geometry with a real distance is a provider defect.
        let result = parse_directions_response(200, body, damascus(), aleppo(), 310.0);
        assert!(matches!(result, Err(MasarError::MalformedProviderResponse(_))));
    }

    #[tokio::test]
    async fn test_short_queries_skip_search() {
        let service = service_with_unreachable_provider();
        assert!(service.search_places("", None).await.is_empty());
        assert!(service.search_places("ab", None).await.is_empty());
        assert!(service.search_places("  a  ", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_swallows_provider_failure() {
        let service = service_with_unreachable_provider();
        let results = service.search_places("Umayyad Square", None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_api_key_store_rejects_blank_updates() {
        let store = ApiKeyStore::new("initial");
        assert!(store.update("").await.is_err());
        assert!(store.update("   ").await.is_err());
        assert_eq!(store.get().await, "initial");

        store.update("  fresh-key  ").await.unwrap();
        assert_eq!(store.get().await, "fresh-key");
    }

    #[tokio::test(start_paused = true)]
    async fn test_leg_monitor_keeps_only_latest() {
        // Both pairs are under 50 m so the recompute resolves locally.
        let service = Arc::new(service_with_unreachable_provider());
        let monitor = LegRouteMonitor::new(service, LEG_DEBOUNCE);

        let first_end = LatLng::new(33.5140, 36.2765);
        let second_end = LatLng::new(33.5136, 36.2764);
        monitor.schedule(damascus(), first_end).await;
        monitor.schedule(damascus(), second_end).await;

        tokio::time::sleep(Duration::from_secs(3)).await;

        let leg = monitor.current().await.expect("latest recompute should land");
        assert_eq!(leg.polyline[1], second_end);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leg_monitor_clear_cancels_pending() {
        let service = Arc::new(service_with_unreachable_provider());
        let monitor = LegRouteMonitor::new(service, LEG_DEBOUNCE);

        monitor.schedule(damascus(), LatLng::new(33.5140, 36.2765)).await;
        monitor.clear().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(monitor.current().await.is_none());
    }
}
