// src/models/route.rs
use serde::{Deserialize, Serialize};

/// A bare coordinate pair. Latitude first, matching the map layer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite numbers. NaN/inf coordinates
    /// come from uninitialised map state and must never reach the provider.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// The (0,0) pair is a common GPS/init bug signature, not a real fix.
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// A coordinate with a human-readable place name (pickup/dropoff points).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NamedLocation {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

impl NamedLocation {
    pub fn point(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// One turn-by-turn instruction within a route segment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Step {
    pub distance_m: f64,
    pub duration_s: f64,
    pub maneuver: ManeuverType,
    pub instruction: String,
    pub name: String,
    /// Start/end indices into the route polyline; the start index is the
    /// maneuver point used for distance-to-turn calculations.
    pub way_points: (usize, usize),
}

/// Maneuver codes as emitted by the directions provider.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(from = "u8", into = "u8")]
pub enum ManeuverType {
    Left,
    Right,
    SharpLeft,
    SharpRight,
    SlightLeft,
    SlightRight,
    Straight,
    EnterRoundabout,
    Other(u8),
}

impl From<u8> for ManeuverType {
    fn from(code: u8) -> Self {
        match code {
            0 => ManeuverType::Left,
            1 => ManeuverType::Right,
            2 => ManeuverType::SharpLeft,
            3 => ManeuverType::SharpRight,
            4 => ManeuverType::SlightLeft,
            5 => ManeuverType::SlightRight,
            6 => ManeuverType::Straight,
            7 => ManeuverType::EnterRoundabout,
            other => ManeuverType::Other(other),
        }
    }
}

impl From<ManeuverType> for u8 {
    fn from(maneuver: ManeuverType) -> Self {
        match maneuver {
            ManeuverType::Left => 0,
            ManeuverType::Right => 1,
            ManeuverType::SharpLeft => 2,
            ManeuverType::SharpRight => 3,
            ManeuverType::SlightLeft => 4,
            ManeuverType::SlightRight => 5,
            ManeuverType::Straight => 6,
            ManeuverType::EnterRoundabout => 7,
            ManeuverType::Other(code) => code,
        }
    }
}

/// A computed route. Ephemeral: recomputed on demand, never persisted
/// beyond the session that requested it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteInfo {
    pub distance_km: f64,
    pub duration_min: f64,
    pub polyline: Vec<LatLng>,
    pub steps: Option<Vec<Step>>,
}

impl RouteInfo {
    /// Degenerate route for start/end points that are effectively the same
    /// place. Keeps a two-point polyline so the map layer can still draw it.
    pub fn zero_length(start: LatLng, end: LatLng) -> Self {
        Self {
            distance_km: 0.0,
            duration_min: 0.0,
            polyline: vec![start, end],
            steps: None,
        }
    }
}

/// A geocoding hit offered to the user while typing a destination.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationSuggestion {
    pub name: String,
    pub coordinates: LatLng,
}
