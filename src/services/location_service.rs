// src/services/location_service.rs
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing;

use crate::errors::{MasarError, MasarResult};
use crate::models::route::LatLng;

/// Fixes reported with worse accuracy than this are discarded so the
/// displayed position does not jump around on weak GPS signal.
pub const MIN_ACCURACY_METERS: f64 = 100.0;

/// Backoff before re-establishing the watch after a transient error.
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Continuous-tracking options: always a fresh, high-accuracy fix, with a
/// generous timeout to allow a GPS lock.
pub const TRACKING_OPTIONS: PositionOptions = PositionOptions {
    enable_high_accuracy: true,
    timeout: Duration::from_secs(20),
    maximum_age: Duration::ZERO,
};

/// First phase of startup acquisition: coarse but fast, cached fixes allowed.
pub const QUICK_FIX_OPTIONS: PositionOptions = PositionOptions {
    enable_high_accuracy: false,
    timeout: Duration::from_secs(5),
    maximum_age: Duration::from_secs(60),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

/// One device fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub point: LatLng,
    pub accuracy_m: f64,
    pub heading: Option<f64>,
}

/// Device geolocation abstraction: yields the next available fix under the
/// given options, or a geolocation-domain error.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn next_position(&self, options: PositionOptions) -> MasarResult<Position>;
}

/// Continuous position watcher with accuracy filtering and automatic
/// re-establishment after transient failures. Permission denial is
/// terminal: tracking stops until the caller explicitly restarts it.
pub struct LocationTracker {
    source: Arc<dyn PositionSource>,
    latest: Arc<RwLock<Option<Position>>>,
    terminal_error: Arc<RwLock<Option<MasarError>>>,
    updates: watch::Sender<Option<Position>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocationTracker {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            source,
            latest: Arc::new(RwLock::new(None)),
            terminal_error: Arc::new(RwLock::new(None)),
            updates,
            task: Mutex::new(None),
        }
    }

    /// Begin watching. A second call while already tracking is a no-op.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        *self.terminal_error.write().await = None;

        let source = self.source.clone();
        let latest = self.latest.clone();
        let terminal_error = self.terminal_error.clone();
        let updates = self.updates.clone();

        tracing::info!("Location tracking started");
        *task = Some(tokio::spawn(async move {
            loop {
                // The options timeout is enforced here too, so a hung
                // source falls into the transient-retry path instead of
                // stalling the watch forever.
                let fix = match tokio::time::timeout(
                    TRACKING_OPTIONS.timeout,
                    source.next_position(TRACKING_OPTIONS),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(MasarError::LocationTimeout),
                };

                match fix {
                    Ok(position) if position.accuracy_m > MIN_ACCURACY_METERS => {
                        tracing::warn!(
                            "Ignoring inaccurate fix: {:.1} m (threshold {} m)",
                            position.accuracy_m,
                            MIN_ACCURACY_METERS
                        );
                    }
                    Ok(position) => {
                        *latest.write().await = Some(position);
                        updates.send_replace(Some(position));
                    }
                    Err(err) if err.is_transient_location_error() => {
                        tracing::warn!(
                            "Position watch error ({}), re-establishing in {:?}",
                            err,
                            RETRY_BACKOFF
                        );
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                    Err(err) => {
                        tracing::error!("Position watch stopped: {}", err);
                        *terminal_error.write().await = Some(err);
                        break;
                    }
                }
            }
        }));
    }

    /// Tear down the watch and any pending retry immediately.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
            tracing::info!("Location tracking stopped");
        }
    }

    pub async fn is_tracking(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn latest_position(&self) -> Option<Position> {
        *self.latest.read().await
    }

    /// Set when the watch loop gave up (permission denied); cleared on restart.
    pub async fn terminal_error(&self) -> Option<MasarError> {
        self.terminal_error.read().await.clone()
    }

    /// Live feed of accepted fixes for anyone rendering the driver marker.
    pub fn subscribe(&self) -> watch::Receiver<Option<Position>> {
        self.updates.subscribe()
    }

    /// Two-phase single-shot acquisition: a quick coarse fix for immediate
    /// feedback, falling back to a slow high-accuracy fix if the quick
    /// attempt fails.
    pub async fn acquire_position(&self) -> MasarResult<Position> {
        match self.fix_with(QUICK_FIX_OPTIONS).await {
            Ok(position) => {
                *self.latest.write().await = Some(position);
                Ok(position)
            }
            Err(err) => {
                tracing::debug!("Quick fix failed ({}), trying high accuracy", err);
                let position = self.fix_with(TRACKING_OPTIONS).await?;
                *self.latest.write().await = Some(position);
                Ok(position)
            }
        }
    }

    /// Single fix with the timeout from the options enforced here, so a
    /// hung source still resolves to a LocationTimeout.
    async fn fix_with(&self, options: PositionOptions) -> MasarResult<Position> {
        match tokio::time::timeout(options.timeout, self.source.next_position(options)).await {
            Ok(result) => result,
            Err(_) => Err(MasarError::LocationTimeout),
        }
    }
}
