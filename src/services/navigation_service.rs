// src/services/navigation_service.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;
use tracing;

use crate::models::route::{LatLng, RouteInfo, Step};
use crate::utils::geo::haversine_m;

/// The device must come within this distance of a step's maneuver point
/// before guidance advances to the next instruction.
pub const STEP_ADVANCE_THRESHOLD_M: f64 = 25.0;

/// Guidance for the upcoming maneuver, recomputed on each position update.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverGuidance {
    pub step_index: usize,
    pub current_step: Step,
    pub next_step: Option<Step>,
    pub distance_to_next_maneuver_m: f64,
}

#[derive(Debug, Clone)]
struct NavigationProgress {
    route: RouteInfo,
    current_step: usize,
}

/// Turn-by-turn progress over an active route. Step advancement is
/// monotonic: the index never moves backwards, and the departure step
/// (index 0) is never skipped by proximity alone.
pub struct NavigationService {
    progress: RwLock<Option<NavigationProgress>>,
}

impl Default for NavigationService {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationService {
    pub fn new() -> Self {
        Self {
            progress: RwLock::new(None),
        }
    }

    /// Install the route to navigate. The step index resets only when the
    /// route actually changed; re-submitting the same route (a refresh of
    /// identical geometry) preserves progress.
    pub async fn set_route(&self, route: RouteInfo) {
        let mut progress = self.progress.write().await;
        if let Some(current) = progress.as_mut() {
            if current.route.polyline == route.polyline {
                current.route = route;
                return;
            }
        }
        tracing::debug!(
            "Navigation route set: {} steps",
            route.steps.as_ref().map_or(0, |steps| steps.len())
        );
        *progress = Some(NavigationProgress {
            route,
            current_step: 0,
        });
    }

    pub async fn clear(&self) {
        *self.progress.write().await = None;
    }

    /// Feed a device position and get guidance for the maneuver ahead.
    /// Returns None when no route is installed or the route has no steps.
    pub async fn update(&self, position: LatLng) -> Option<ManeuverGuidance> {
        let mut progress = self.progress.write().await;
        let progress = progress.as_mut()?;
        let steps = progress.route.steps.as_ref()?;
        if steps.is_empty() {
            return None;
        }

        let mut index = progress.current_step.min(steps.len() - 1);

        // Advance once the device is on top of the current maneuver point.
        // Index 0 is the departure instruction and is never left behind by
        // proximity alone, so waiting at the pickup does not skip it.
        if index > 0 && index + 1 < steps.len() {
            if let Some(point) = step_maneuver_point(&progress.route, &steps[index]) {
                if haversine_m(position, point) < STEP_ADVANCE_THRESHOLD_M {
                    index += 1;
                }
            }
        }
        progress.current_step = index;

        let current_step = steps[index].clone();
        let next_step = steps.get(index + 1).cloned();
        // Distance shown to the user is to the upcoming turn, not the one
        // just made; the last step has nothing ahead of it.
        let distance_to_next_maneuver_m = next_step
            .as_ref()
            .and_then(|step| step_maneuver_point(&progress.route, step))
            .map_or(0.0, |point| haversine_m(position, point));

        Some(ManeuverGuidance {
            step_index: index,
            current_step,
            next_step,
            distance_to_next_maneuver_m,
        })
    }

    pub async fn current_step_index(&self) -> Option<usize> {
        self.progress
            .read()
            .await
            .as_ref()
            .map(|progress| progress.current_step)
    }
}

fn step_maneuver_point(route: &RouteInfo, step: &Step) -> Option<LatLng> {
    route.polyline.get(step.way_points.0).copied()
}

/// "850 m" below one kilometre, "1.2 km" above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{} m", distance_m.round() as i64)
    } else {
        format!("{:.1} km", distance_m / 1000.0)
    }
}

/// "12 min" below an hour, "1 h 5 min" above.
pub fn format_duration_min(duration_min: f64) -> String {
    let total = duration_min.round() as i64;
    if total < 60 {
        format!("{} min", total)
    } else {
        format!("{} h {} min", total / 60, total % 60)
    }
}

/// Arrival time for a trip of the given remaining duration, from now.
pub fn estimated_arrival(duration_min: f64) -> DateTime<Utc> {
    Utc::now() + ChronoDuration::seconds((duration_min * 60.0).round() as i64)
}
