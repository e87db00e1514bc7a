// src/services/ride_service.rs
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing;

use crate::errors::{MasarError, MasarResult};
use crate::models::ride::{LiveTripData, Ride, RideRequest, RideStatus};
use crate::models::route::LatLng;
use crate::models::user::Driver;
use crate::services::fare_meter::FareMeter;
use crate::services::pricing_service::PricingService;

/// How long a cancelled ride stays visible before the session resets.
const CANCEL_GRACE: Duration = Duration::from_secs(3);
/// How long a completed ride stays visible before a new booking cycle.
const COMPLETE_GRACE: Duration = Duration::from_secs(5);

#[async_trait]
pub trait RideOperations: Send + Sync {
    async fn request_ride(&self, request: RideRequest) -> MasarResult<Ride>;
    async fn accept_ride(&self, driver: &Driver) -> MasarResult<Ride>;
    async fn reject_ride(&self) -> MasarResult<()>;
    async fn update_ride_status(&self, new_status: RideStatus) -> MasarResult<Ride>;
    async fn cancel_ride(&self) -> MasarResult<Ride>;
    async fn complete_ride(&self) -> MasarResult<Ride>;
    async fn current_ride(&self) -> Option<Ride>;
}

/// Session-scoped ride store and lifecycle state machine. Owns the single
/// active ride; the fare meter and live driver location are derived views,
/// never independently authoritative.
pub struct RideService {
    pricing_service: Arc<PricingService>,
    fare_meter: Arc<FareMeter>,
    ride: Arc<RwLock<Option<Ride>>>,
    driver_location: Arc<RwLock<Option<LatLng>>>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl RideService {
    pub fn new(pricing_service: Arc<PricingService>, fare_meter: Arc<FareMeter>) -> Self {
        Self {
            pricing_service,
            fare_meter,
            ride: Arc::new(RwLock::new(None)),
            driver_location: Arc::new(RwLock::new(None)),
            cleanup: Mutex::new(None),
        }
    }

    pub async fn update_driver_location(&self, location: LatLng) {
        *self.driver_location.write().await = Some(location);
    }

    pub async fn driver_live_location(&self) -> Option<LatLng> {
        *self.driver_location.read().await
    }

    pub async fn live_trip_data(&self) -> Option<LiveTripData> {
        self.fare_meter.live_trip_data().await
    }

    /// The point the driver is currently heading to: pickup before the
    /// trip starts, dropoff once it is in progress. None when no leg of
    /// an active ride is being driven.
    pub async fn leg_destination(&self) -> Option<LatLng> {
        let ride = self.ride.read().await;
        let ride = ride.as_ref()?;
        match ride.status {
            RideStatus::Accepted | RideStatus::PickingUp => Some(ride.start_location.point()),
            RideStatus::InProgress => Some(ride.end_location.point()),
            _ => None,
        }
    }

    /// Clear the ride after a grace delay so the UI can show the terminal
    /// notice first. Guarded by ride id so a stale cleanup never clobbers
    /// a newer booking.
    async fn schedule_clear(&self, ride_id: String, delay: Duration) {
        let mut cleanup = self.cleanup.lock().await;
        if let Some(previous) = cleanup.take() {
            previous.abort();
        }

        let ride = self.ride.clone();
        let driver_location = self.driver_location.clone();
        let fare_meter = self.fare_meter.clone();
        *cleanup = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut slot = ride.write().await;
            match slot.as_ref() {
                Some(current) if current.id == ride_id => {
                    tracing::info!("Ride {} cleared, session ready for a new booking", ride_id);
                    *slot = None;
                    drop(slot);
                    *driver_location.write().await = None;
                    fare_meter.stop().await;
                }
                _ => {
                    tracing::debug!("Skipping stale cleanup for ride {}", ride_id);
                }
            }
        }));
    }
}

#[async_trait]
impl RideOperations for RideService {
    async fn request_ride(&self, request: RideRequest) -> MasarResult<Ride> {
        if request.customer_id.trim().is_empty() {
            return Err(MasarError::unauthorized(
                "ride request without an authenticated customer",
            ));
        }

        let mut slot = self.ride.write().await;
        if let Some(existing) = slot.as_ref() {
            // A terminal ride still in its grace window is replaced; an
            // active one is not (single-ride session model).
            if !existing.status.is_terminal() {
                return Err(MasarError::Conflict(format!(
                    "a ride is already active with status {}",
                    existing.status
                )));
            }
            if let Some(previous) = self.cleanup.lock().await.take() {
                previous.abort();
            }
        }

        let estimated_fare = self
            .pricing_service
            .estimate_fare(
                request.vehicle_type,
                request.route.distance_km,
                request.route.duration_min,
            )
            .await;

        let ride = Ride::new(request, estimated_fare);
        tracing::info!(
            "Ride {} requested by {}: {:.2} km, estimated fare {}",
            ride.id,
            ride.customer_id,
            ride.distance_km,
            ride.estimated_fare
        );

        // Any leftover meter readout belongs to a previous trip
        self.fare_meter.stop().await;

        *slot = Some(ride.clone());
        Ok(ride)
    }

    async fn accept_ride(&self, driver: &Driver) -> MasarResult<Ride> {
        let mut slot = self.ride.write().await;
        let ride = slot.as_mut().ok_or(MasarError::NoActiveRide)?;

        // Double-accept guard: only a ride still waiting can be taken
        if ride.status != RideStatus::Requested {
            return Err(MasarError::RideAlreadyAssigned);
        }

        ride.status = RideStatus::Accepted;
        ride.driver_id = Some(driver.id.clone());
        tracing::info!("Ride {} accepted by driver {}", ride.id, driver.id);
        Ok(ride.clone())
    }

    async fn reject_ride(&self) -> MasarResult<()> {
        let mut slot = self.ride.write().await;
        let ride = slot.as_ref().ok_or(MasarError::NoActiveRide)?;

        if ride.status != RideStatus::Requested {
            return Err(MasarError::RideAlreadyAssigned);
        }

        // Single-driver mock: a rejected request is discarded, not requeued
        tracing::info!("Ride {} rejected, discarding request", ride.id);
        *slot = None;
        Ok(())
    }

    async fn update_ride_status(&self, new_status: RideStatus) -> MasarResult<Ride> {
        let mut slot = self.ride.write().await;
        let ride = slot.as_mut().ok_or(MasarError::NoActiveRide)?;

        // Terminal guard: completed/cancelled rides accept no further
        // status writes; the call is an idempotent no-op.
        if ride.status.is_terminal() {
            tracing::debug!(
                "Ignoring status update to {} for terminal ride {}",
                new_status,
                ride.id
            );
            return Ok(ride.clone());
        }

        let was_in_progress = ride.status == RideStatus::InProgress;
        ride.status = new_status;
        tracing::info!("Ride {} status updated to {}", ride.id, new_status);

        let ride = ride.clone();
        drop(slot);

        if new_status == RideStatus::InProgress && !was_in_progress {
            self.fare_meter
                .start(
                    ride.distance_km,
                    ride.duration_min,
                    ride.vehicle_type,
                    self.pricing_service.clone(),
                )
                .await;
        } else if was_in_progress && new_status != RideStatus::InProgress {
            self.fare_meter.stop().await;
        }

        Ok(ride)
    }

    async fn cancel_ride(&self) -> MasarResult<Ride> {
        let mut slot = self.ride.write().await;
        let ride = slot.as_mut().ok_or(MasarError::NoActiveRide)?;

        // A ride mid-trip completes or is force-completed, never cancelled
        if !ride.status.is_cancellable() {
            return Err(MasarError::RideNotCancellable(ride.status.to_string()));
        }

        ride.status = RideStatus::Cancelled;
        tracing::info!("Ride {} cancelled", ride.id);

        let ride = ride.clone();
        drop(slot);

        *self.driver_location.write().await = None;
        self.fare_meter.stop().await;
        self.schedule_clear(ride.id.clone(), CANCEL_GRACE).await;

        Ok(ride)
    }

    async fn complete_ride(&self) -> MasarResult<Ride> {
        let mut slot = self.ride.write().await;
        let ride = slot.as_mut().ok_or(MasarError::NoActiveRide)?;

        if ride.status != RideStatus::InProgress {
            return Err(MasarError::RideNotInProgress(ride.status.to_string()));
        }

        // Prefer the last metered fare; fall back to an estimate over the
        // actually elapsed trip time when the meter has nothing.
        let final_fare = match self.fare_meter.live_trip_data().await {
            Some(live) => live.current_fare,
            None => {
                let elapsed_min = self
                    .fare_meter
                    .elapsed_min()
                    .await
                    .unwrap_or(ride.duration_min);
                self.pricing_service
                    .estimate_fare(ride.vehicle_type, ride.distance_km, elapsed_min)
                    .await
            }
        };

        ride.status = RideStatus::Completed;
        ride.final_fare = Some(final_fare);
        ride.completed_at = Some(Utc::now());
        tracing::info!("Ride {} completed, final fare {}", ride.id, final_fare);

        let ride = ride.clone();
        drop(slot);

        self.fare_meter.stop().await;
        *self.driver_location.write().await = None;
        self.schedule_clear(ride.id.clone(), COMPLETE_GRACE).await;

        Ok(ride)
    }

    async fn current_ride(&self) -> Option<Ride> {
        self.ride.read().await.clone()
    }
}
