// src/models/ride.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::route::{LatLng, NamedLocation, RouteInfo};
use crate::models::user::VehicleType;
use crate::utils::id_generator::{IdGenerator, IdType};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Idle,        // No ride active for the session
    Requested,   // Customer submitted, waiting for driver acceptance
    Accepted,    // Driver accepted, not yet moving
    PickingUp,   // Driver en route to the pickup point
    InProgress,  // Customer on board, meter running
    Completed,   // Trip finished, final fare recorded
    Cancelled,   // Ride abandoned before the trip started
}

impl RideStatus {
    /// Completed and Cancelled rides accept no further status writes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// States a customer may still back out of. A ride mid-trip completes
    /// or is force-completed, never silently cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            RideStatus::Requested | RideStatus::Accepted | RideStatus::PickingUp
        )
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RideStatus::Idle => "IDLE",
            RideStatus::Requested => "REQUESTED",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::PickingUp => "PICKING_UP",
            RideStatus::InProgress => "IN_PROGRESS",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

/// One trip instance. Exactly one ride is active per session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ride {
    pub id: String,
    pub customer_id: String,
    pub driver_id: Option<String>,
    pub start_location: NamedLocation,
    pub end_location: NamedLocation,
    pub status: RideStatus,
    pub vehicle_type: VehicleType,
    pub estimated_fare: i64,
    pub final_fare: Option<i64>,

    // Frozen from the route computed at request time
    pub distance_km: f64,
    pub duration_min: f64,
    pub polyline: Vec<LatLng>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_scheduled: bool,
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Optional deferred dispatch for a ride request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideSchedule {
    pub is_scheduled: bool,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideRequest {
    pub customer_id: String,
    pub start: NamedLocation,
    pub end: NamedLocation,
    pub vehicle_type: VehicleType,
    pub route: RouteInfo,
    pub schedule: Option<RideSchedule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RideStatusUpdate {
    pub status: RideStatus,
}

/// Derived meter readout, recomputed every tick while a ride is in
/// progress and discarded when the ride ends.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LiveTripData {
    pub distance_traveled_km: f64,
    pub time_elapsed_s: f64,
    pub current_fare: i64,
}

impl Ride {
    pub fn new(request: RideRequest, estimated_fare: i64) -> Self {
        let schedule = request.schedule.unwrap_or(RideSchedule {
            is_scheduled: false,
            time: None,
        });

        Self {
            id: IdGenerator::generate(IdType::Ride),
            customer_id: request.customer_id,
            driver_id: None,
            start_location: request.start,
            end_location: request.end,
            status: RideStatus::Requested,
            vehicle_type: request.vehicle_type,
            estimated_fare,
            final_fare: None,
            distance_km: request.route.distance_km,
            duration_min: request.route.duration_min,
            polyline: request.route.polyline,
            created_at: Utc::now(),
            completed_at: None,
            is_scheduled: schedule.is_scheduled,
            scheduled_time: schedule.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(!RideStatus::InProgress.is_terminal());
        assert!(!RideStatus::Requested.is_terminal());
    }

    #[test]
    fn test_cancellable_states() {
        assert!(RideStatus::Requested.is_cancellable());
        assert!(RideStatus::Accepted.is_cancellable());
        assert!(RideStatus::PickingUp.is_cancellable());
        assert!(!RideStatus::InProgress.is_cancellable());
        assert!(!RideStatus::Completed.is_cancellable());
        assert!(!RideStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_new_ride_freezes_route() {
        let route = RouteInfo {
            distance_km: 5.0,
            duration_min: 12.0,
            polyline: vec![LatLng::new(33.5, 36.3), LatLng::new(33.6, 36.4)],
            steps: None,
        };
        let request = RideRequest {
            customer_id: "usr-250828-abc12".to_string(),
            start: NamedLocation { lat: 33.5, lng: 36.3, name: "Umayyad Square".to_string() },
            end: NamedLocation { lat: 33.6, lng: 36.4, name: "Mezzeh".to_string() },
            vehicle_type: VehicleType::NormalCar,
            route: route.clone(),
            schedule: None,
        };

        let ride = Ride::new(request, 6700);
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.estimated_fare, 6700);
        assert_eq!(ride.distance_km, 5.0);
        assert_eq!(ride.duration_min, 12.0);
        assert_eq!(ride.polyline, route.polyline);
        assert!(ride.driver_id.is_none());
        assert!(!ride.is_scheduled);
    }
}
