// src/services/fare_meter.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing;

use crate::models::ride::LiveTripData;
use crate::models::user::VehicleType;
use crate::services::pricing_service::{PricingService, VehiclePricing};

const TICK_PERIOD: Duration = Duration::from_secs(1);

struct MeterTask {
    handle: JoinHandle<()>,
    started_at: Instant,
}

/// Live trip meter. Runs only while a ride is in progress; one timer
/// instance at a time, and every start pairs with a stop on the state
/// transition that ends the trip.
///
/// Traveled distance is simulated by interpolating the planned route
/// distance against elapsed time; there is no trusted live-odometer feed
/// in this system.
pub struct FareMeter {
    live: Arc<RwLock<Option<LiveTripData>>>,
    task: Mutex<Option<MeterTask>>,
}

impl FareMeter {
    pub fn new() -> Self {
        Self {
            live: Arc::new(RwLock::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Start metering a trip. Restarting replaces any running meter.
    /// Rates are read from the pricing table on every tick, so an admin
    /// price change takes effect mid-trip.
    pub async fn start(
        &self,
        total_distance_km: f64,
        total_duration_min: f64,
        vehicle_type: VehicleType,
        pricing: Arc<PricingService>,
    ) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.handle.abort();
        }

        let started_at = Instant::now();
        let live = self.live.clone();

        // Seed the meter so the display is never blank on the first tick
        *live.write().await = Some(LiveTripData {
            distance_traveled_km: 0.0,
            time_elapsed_s: 0.0,
            current_fare: pricing.base_fare(vehicle_type).await,
        });

        tracing::info!(
            "Fare meter started: {:.2} km planned over {:.1} min",
            total_distance_km,
            total_duration_min
        );

        let total_duration_s = total_duration_min * 60.0;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval fires immediately; the first real tick is one period in
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let time_elapsed_s = started_at.elapsed().as_secs_f64();

                let progress = if total_duration_s > 0.0 {
                    (time_elapsed_s / total_duration_s).min(1.0)
                } else {
                    1.0
                };
                let distance_traveled_km = total_distance_km * progress;

                let rates = pricing.vehicle_pricing(vehicle_type).await.unwrap_or(
                    VehiclePricing {
                        base_fare: 0.0,
                        per_km: 0.0,
                        per_minute: 0.0,
                    },
                );
                let fare = rates.base_fare
                    + distance_traveled_km * rates.per_km
                    + (time_elapsed_s / 60.0) * rates.per_minute;

                *live.write().await = Some(LiveTripData {
                    distance_traveled_km,
                    time_elapsed_s,
                    current_fare: fare.round() as i64,
                });
            }
        });

        *task = Some(MeterTask { handle, started_at });
    }

    /// Stop the meter and discard the live readout.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.handle.abort();
            tracing::info!("Fare meter stopped");
        }
        *self.live.write().await = None;
    }

    pub async fn live_trip_data(&self) -> Option<LiveTripData> {
        *self.live.read().await
    }

    /// Minutes since the trip started, while the meter is running.
    pub async fn elapsed_min(&self) -> Option<f64> {
        self.task
            .lock()
            .await
            .as_ref()
            .map(|task| task.started_at.elapsed().as_secs_f64() / 60.0)
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

impl Default for FareMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing_service::default_pricing;

    // Default NORMAL_CAR rates: base 3000, per_km 500, per_minute 100
    fn pricing() -> Arc<PricingService> {
        Arc::new(PricingService::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_meter_seeds_with_base_fare() {
        let meter = FareMeter::new();
        meter
            .start(10.0, 20.0, VehicleType::NormalCar, pricing())
            .await;

        let live = meter.live_trip_data().await.unwrap();
        assert_eq!(live.distance_traveled_km, 0.0);
        assert_eq!(live.time_elapsed_s, 0.0);
        assert_eq!(live.current_fare, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_meter_at_half_duration() {
        // 10 km over 20 min; at 10 min the trip is half done:
        // fare = 3000 + 5*500 + 10*100 = 6500
        let meter = FareMeter::new();
        meter
            .start(10.0, 20.0, VehicleType::NormalCar, pricing())
            .await;

        tokio::time::sleep(Duration::from_millis(600_500)).await;

        let live = meter.live_trip_data().await.unwrap();
        assert!((live.distance_traveled_km - 5.0).abs() < 0.01, "got {}", live.distance_traveled_km);
        assert!((live.time_elapsed_s - 600.0).abs() < 1.0, "got {}", live.time_elapsed_s);
        assert!((live.current_fare - 6500).abs() <= 2, "got {}", live.current_fare);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distance_caps_at_route_total() {
        let meter = FareMeter::new();
        meter
            .start(10.0, 20.0, VehicleType::NormalCar, pricing())
            .await;

        // Twice the planned duration: distance stops at 10 km, time keeps accruing
        tokio::time::sleep(Duration::from_millis(2_400_500)).await;

        let live = meter.live_trip_data().await.unwrap();
        assert!((live.distance_traveled_km - 10.0).abs() < 1e-9);
        assert!(live.time_elapsed_s > 2300.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_live_data() {
        let meter = FareMeter::new();
        meter
            .start(10.0, 20.0, VehicleType::NormalCar, pricing())
            .await;
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert!(meter.live_trip_data().await.is_some());

        meter.stop().await;
        assert!(meter.live_trip_data().await.is_none());
        assert!(!meter.is_running().await);

        // A new trip restarts cleanly from zero
        meter
            .start(4.0, 8.0, VehicleType::NormalCar, pricing())
            .await;
        let live = meter.live_trip_data().await.unwrap();
        assert_eq!(live.time_elapsed_s, 0.0);
        assert_eq!(live.current_fare, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pricing_update_reaches_running_meter() {
        let pricing = pricing();
        let meter = FareMeter::new();
        meter
            .start(10.0, 20.0, VehicleType::NormalCar, pricing.clone())
            .await;

        tokio::time::sleep(Duration::from_millis(600_500)).await;
        let before = meter.live_trip_data().await.unwrap().current_fare;
        assert!((before - 6500).abs() <= 2, "got {}", before);

        // Admin doubles the rates mid-trip; the next tick uses them
        let mut settings = default_pricing();
        settings.insert(
            VehicleType::NormalCar,
            VehiclePricing { base_fare: 3000.0, per_km: 1000.0, per_minute: 200.0 },
        );
        pricing.update_pricing(settings).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        let after = meter.live_trip_data().await.unwrap().current_fare;
        // ~3000 + 5*1000 + 10*200 = 10000 at the half-way mark
        assert!(after > 9500, "got {}", after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_route_is_fully_traveled() {
        let meter = FareMeter::new();
        meter
            .start(0.0, 0.0, VehicleType::NormalCar, pricing())
            .await;
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        let live = meter.live_trip_data().await.unwrap();
        assert_eq!(live.distance_traveled_km, 0.0);
        assert!(live.time_elapsed_s >= 2.0);
    }
}
