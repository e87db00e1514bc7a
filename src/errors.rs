// src/errors.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Main error type for the masar-realtime service
#[derive(Debug, Clone, PartialEq)]
pub enum MasarError {
    // HTTP and API errors
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    InternalServer(String),

    // Route domain errors
    InvalidCoordinates(String),
    DistanceTooLarge { distance_km: f64 },
    InvalidApiKey,
    PointNotOnRoad,
    NoRouteFound(String),
    MalformedProviderResponse(String),
    NetworkError(String),

    // Geolocation domain errors
    PermissionDenied,
    PositionUnavailable(String),
    LocationTimeout,

    // Ride lifecycle errors
    NoActiveRide,
    RideAlreadyAssigned,
    RideNotCancellable(String),
    RideNotInProgress(String),

    // Configuration errors
    InvalidApiKeyUpdate,
    ConfigurationError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl fmt::Display for MasarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasarError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            MasarError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            MasarError::NotFound(msg) => write!(f, "Not found: {}", msg),
            MasarError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            MasarError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),

            MasarError::InvalidCoordinates(msg) => write!(f, "Invalid coordinates: {}", msg),
            MasarError::DistanceTooLarge { distance_km } => {
                write!(f, "Distance between points ({:.0} km) is too large to route", distance_km)
            }
            MasarError::InvalidApiKey => {
                write!(f, "Routing API key is invalid or expired")
            }
            MasarError::PointNotOnRoad => {
                write!(f, "Could not match a point to the road network; pick a location closer to a road")
            }
            MasarError::NoRouteFound(msg) => write!(f, "No route found between the points: {}", msg),
            MasarError::MalformedProviderResponse(msg) => {
                write!(f, "Routing provider returned incomplete data: {}", msg)
            }
            MasarError::NetworkError(msg) => write!(f, "Network error while contacting routing provider: {}", msg),

            MasarError::PermissionDenied => write!(f, "Location permission denied"),
            MasarError::PositionUnavailable(msg) => write!(f, "Position unavailable: {}", msg),
            MasarError::LocationTimeout => write!(f, "Location request timed out"),

            MasarError::NoActiveRide => write!(f, "No active ride for this session"),
            MasarError::RideAlreadyAssigned => write!(f, "Ride is no longer awaiting a driver"),
            MasarError::RideNotCancellable(status) => {
                write!(f, "Ride cannot be cancelled from status {}", status)
            }
            MasarError::RideNotInProgress(status) => {
                write!(f, "Ride cannot be completed from status {}", status)
            }

            MasarError::InvalidApiKeyUpdate => {
                write!(f, "API key update rejected: key must not be empty")
            }
            MasarError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for MasarError {}

impl IntoResponse for MasarError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            MasarError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            MasarError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            MasarError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            MasarError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),

            MasarError::InvalidCoordinates(_) => (StatusCode::BAD_REQUEST, "invalid_coordinates"),
            MasarError::DistanceTooLarge { .. } => (StatusCode::BAD_REQUEST, "distance_too_large"),
            MasarError::InvalidApiKey => (StatusCode::BAD_GATEWAY, "invalid_api_key"),
            MasarError::PointNotOnRoad => (StatusCode::UNPROCESSABLE_ENTITY, "point_not_on_road"),
            MasarError::NoRouteFound(_) => (StatusCode::UNPROCESSABLE_ENTITY, "no_route_found"),
            MasarError::MalformedProviderResponse(_) => (StatusCode::BAD_GATEWAY, "malformed_provider_response"),
            MasarError::NetworkError(_) => (StatusCode::BAD_GATEWAY, "network_error"),

            MasarError::PermissionDenied => (StatusCode::FORBIDDEN, "location_permission_denied"),
            MasarError::PositionUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "position_unavailable"),
            MasarError::LocationTimeout => (StatusCode::GATEWAY_TIMEOUT, "location_timeout"),

            MasarError::NoActiveRide => (StatusCode::NOT_FOUND, "no_active_ride"),
            MasarError::RideAlreadyAssigned => (StatusCode::CONFLICT, "ride_already_assigned"),
            MasarError::RideNotCancellable(_) => (StatusCode::CONFLICT, "ride_not_cancellable"),
            MasarError::RideNotInProgress(_) => (StatusCode::CONFLICT, "ride_not_in_progress"),

            MasarError::InvalidApiKeyUpdate => (StatusCode::BAD_REQUEST, "invalid_api_key_update"),

            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type MasarResult<T> = Result<T, MasarError>;

// Conversion implementations for common error types
impl From<reqwest::Error> for MasarError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts and connection failures are both transport-level here;
        // the route domain only distinguishes "could not reach the provider".
        MasarError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for MasarError {
    fn from(err: serde_json::Error) -> Self {
        MasarError::MalformedProviderResponse(err.to_string())
    }
}

// Helper functions for creating common errors
impl MasarError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        MasarError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        MasarError::Unauthorized(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        MasarError::NotFound(resource.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        MasarError::InternalServer(msg.into())
    }

    pub fn invalid_coordinates(msg: impl Into<String>) -> Self {
        MasarError::InvalidCoordinates(msg.into())
    }

    pub fn malformed_response(msg: impl Into<String>) -> Self {
        MasarError::MalformedProviderResponse(msg.into())
    }

    /// Transient geolocation failures are retried; permission denial is not.
    pub fn is_transient_location_error(&self) -> bool {
        matches!(
            self,
            MasarError::PositionUnavailable(_) | MasarError::LocationTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MasarError::DistanceTooLarge { distance_km: 2150.4 };
        assert_eq!(
            error.to_string(),
            "Distance between points (2150 km) is too large to route"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(MasarError::LocationTimeout.is_transient_location_error());
        assert!(MasarError::PositionUnavailable("weak signal".to_string())
            .is_transient_location_error());
        assert!(!MasarError::PermissionDenied.is_transient_location_error());
        assert!(!MasarError::InvalidApiKey.is_transient_location_error());
    }

    #[test]
    fn test_helper_functions() {
        assert!(matches!(MasarError::bad_request("test"), MasarError::BadRequest(_)));
        assert!(matches!(MasarError::not_found("test"), MasarError::NotFound(_)));
        assert!(matches!(
            MasarError::invalid_coordinates("test"),
            MasarError::InvalidCoordinates(_)
        ));
    }
}
