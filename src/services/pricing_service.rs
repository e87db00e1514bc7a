// src/services/pricing_service.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing;

use crate::models::user::VehicleType;

/// Per-vehicle-class fare formula inputs, in whole currency units
/// except the per-unit rates which may be fractional.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct VehiclePricing {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
}

pub type PricingSettings = HashMap<VehicleType, VehiclePricing>;

/// Default price table. Admin updates replace it wholesale and take
/// effect on the next fare computation; there is no versioning and no
/// retroactive lock on already-issued estimates.
pub fn default_pricing() -> PricingSettings {
    HashMap::from([
        (VehicleType::NormalCar, VehiclePricing { base_fare: 3000.0, per_km: 500.0, per_minute: 100.0 }),
        (VehicleType::AcCar, VehiclePricing { base_fare: 4000.0, per_km: 600.0, per_minute: 125.0 }),
        (VehicleType::PublicCar, VehiclePricing { base_fare: 2500.0, per_km: 450.0, per_minute: 90.0 }),
        (VehicleType::Vip, VehiclePricing { base_fare: 10000.0, per_km: 1200.0, per_minute: 300.0 }),
        (VehicleType::Microbus, VehiclePricing { base_fare: 6000.0, per_km: 700.0, per_minute: 150.0 }),
        (VehicleType::Motorcycle, VehiclePricing { base_fare: 1500.0, per_km: 300.0, per_minute: 75.0 }),
    ])
}

pub struct PricingService {
    settings: RwLock<PricingSettings>,
}

impl PricingService {
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(default_pricing()),
        }
    }

    pub fn with_settings(settings: PricingSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// round(base + distance * per_km + duration * per_minute), as whole
    /// currency units. Unknown vehicle types price to zero rather than
    /// erroring; fare computation never fails.
    pub async fn estimate_fare(
        &self,
        vehicle_type: VehicleType,
        distance_km: f64,
        duration_min: f64,
    ) -> i64 {
        let settings = self.settings.read().await;
        let Some(pricing) = settings.get(&vehicle_type) else {
            tracing::warn!("No pricing configured for {:?}, quoting zero fare", vehicle_type);
            return 0;
        };

        let fare = pricing.base_fare
            + distance_km * pricing.per_km
            + duration_min * pricing.per_minute;
        fare.round() as i64
    }

    pub async fn base_fare(&self, vehicle_type: VehicleType) -> i64 {
        let settings = self.settings.read().await;
        settings
            .get(&vehicle_type)
            .map(|p| p.base_fare.round() as i64)
            .unwrap_or(0)
    }

    pub async fn vehicle_pricing(&self, vehicle_type: VehicleType) -> Option<VehiclePricing> {
        self.settings.read().await.get(&vehicle_type).copied()
    }

    pub async fn settings(&self) -> PricingSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_pricing(&self, new_settings: PricingSettings) {
        tracing::info!("Updating pricing table ({} vehicle classes)", new_settings.len());
        *self.settings.write().await = new_settings;
    }
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_estimate() {
        // round(3000 + 5*500 + 12*100) = 6700
        let pricing = PricingService::new();
        let fare = pricing.estimate_fare(VehicleType::NormalCar, 5.0, 12.0).await;
        assert_eq!(fare, 6700);
    }

    #[tokio::test]
    async fn test_unknown_vehicle_quotes_zero() {
        let pricing = PricingService::with_settings(HashMap::new());
        let fare = pricing.estimate_fare(VehicleType::Vip, 10.0, 20.0).await;
        assert_eq!(fare, 0);
    }

    #[tokio::test]
    async fn test_fare_is_monotonic() {
        let pricing = PricingService::new();
        let mut previous = 0;
        for km in [1.0, 2.5, 5.0, 12.0, 40.0] {
            let fare = pricing.estimate_fare(VehicleType::AcCar, km, 10.0).await;
            assert!(fare >= previous, "fare decreased at {} km", km);
            previous = fare;
        }

        let short = pricing.estimate_fare(VehicleType::AcCar, 5.0, 8.0).await;
        let long = pricing.estimate_fare(VehicleType::AcCar, 5.0, 30.0).await;
        assert!(long >= short);
    }

    #[tokio::test]
    async fn test_update_takes_effect_immediately() {
        let pricing = PricingService::new();
        let mut settings = default_pricing();
        settings.insert(
            VehicleType::NormalCar,
            VehiclePricing { base_fare: 5000.0, per_km: 1000.0, per_minute: 200.0 },
        );
        pricing.update_pricing(settings).await;

        let fare = pricing.estimate_fare(VehicleType::NormalCar, 5.0, 12.0).await;
        assert_eq!(fare, 5000 + 5000 + 2400);
    }

    #[tokio::test]
    async fn test_fare_rounds_to_whole_units() {
        let pricing = PricingService::with_settings(HashMap::from([(
            VehicleType::Motorcycle,
            VehiclePricing { base_fare: 100.0, per_km: 33.3, per_minute: 0.0 },
        )]));
        let fare = pricing.estimate_fare(VehicleType::Motorcycle, 1.0, 0.0).await;
        assert_eq!(fare, 133);
    }
}
