//! Periodic beacon position tracking.
//!
//! Each tick takes the latest observer fix and one RSSI sample from the
//! connected beacon, converts the sample to a distance, builds the sampled
//! candidate ring and lets the configured selector pick one point. The
//! resulting [`PositionEstimate`] is published on a `watch` channel.
//!
//! Ticks are independent: nothing is averaged or remembered between them
//! except what the selector itself keeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{oneshot, watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::bluetooth::{BeaconManager, BluetoothError};
use crate::error::LocatorError;
use crate::estimator::PositionEstimator;
use crate::location::LocationSource;
use crate::selection::{CandidateSelector, SelectionStrategy};
use crate::types::PositionEstimate;

/// Default time between ticks.
pub const DEFAULT_TRACKING_INTERVAL: Duration = Duration::from_secs(5);

/// Tracking errors.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// No beacon is connected.
    #[error("No beacon is connected. Connect to a beacon before tracking.")]
    NotConnected,

    /// No observer fix has been received yet.
    #[error("No location fix available yet")]
    NoLocationFix,

    /// The estimator produced no candidates to pick from.
    #[error("Estimator produced no candidates (sample count is zero)")]
    NoCandidates,

    /// A supplied coordinate is not finite or out of range.
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate {
        /// Supplied latitude.
        latitude: f64,
        /// Supplied longitude.
        longitude: f64,
    },

    /// A supplied accuracy is negative or not finite.
    #[error("Invalid location accuracy: {0}")]
    InvalidAccuracy(f64),

    /// Reading the beacon failed.
    #[error(transparent)]
    Bluetooth(BluetoothError),
}

impl From<BluetoothError> for TrackingError {
    fn from(err: BluetoothError) -> Self {
        match err {
            BluetoothError::NotConnected => Self::NotConnected,
            other => Self::Bluetooth(other),
        }
    }
}

impl TrackingError {
    /// Returns `true` for states that resolve once the user connects a
    /// beacon or a fix arrives.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        matches!(self, Self::NotConnected | Self::NoLocationFix)
    }
}

/// Drives the estimator from live readings.
pub struct Tracker {
    session_id: Uuid,
    beacons: Arc<BeaconManager>,
    location: Arc<dyn LocationSource>,
    estimator: RwLock<PositionEstimator>,
    selector: Mutex<Box<dyn CandidateSelector>>,
    latest: watch::Sender<Option<PositionEstimate>>,
}

impl Tracker {
    /// Create a tracker with a fresh session id.
    pub fn new(
        beacons: Arc<BeaconManager>,
        location: Arc<dyn LocationSource>,
        estimator: PositionEstimator,
        selector: Box<dyn CandidateSelector>,
    ) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            session_id: Uuid::new_v4(),
            beacons,
            location,
            estimator: RwLock::new(estimator),
            selector: Mutex::new(selector),
            latest,
        }
    }

    /// Identifier stamped on every estimate from this tracker.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Receiver for published estimates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<PositionEstimate>> {
        self.latest.subscribe()
    }

    /// The most recently published estimate.
    #[must_use]
    pub fn latest(&self) -> Option<PositionEstimate> {
        self.latest.borrow().clone()
    }

    /// The estimator currently in use.
    pub async fn estimator(&self) -> PositionEstimator {
        *self.estimator.read().await
    }

    /// Replace the estimator used from the next tick on.
    pub async fn set_estimator(&self, estimator: PositionEstimator) {
        *self.estimator.write().await = estimator;
    }

    /// Replace the selector with a fresh one for `strategy`.
    pub async fn set_strategy(&self, strategy: SelectionStrategy) {
        *self.selector.lock().await = strategy.build();
    }

    /// Produce and publish one estimate.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::NoLocationFix`] before the first fix,
    /// [`TrackingError::NotConnected`] without a connected beacon, or the
    /// radio's error if the RSSI read fails.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn tick(&self) -> Result<PositionEstimate, TrackingError> {
        let observer = self
            .location
            .current_fix()
            .await
            .ok_or(TrackingError::NoLocationFix)?;
        let (beacon, rssi_dbm) = self.beacons.read_connected_rssi().await?;

        let estimator = self.estimator().await;
        let distance_m = estimator.distance_meters(f64::from(rssi_dbm));
        let candidates = estimator.candidates(observer.coordinate, f64::from(rssi_dbm));

        let selected_index = self
            .selector
            .lock()
            .await
            .select(&candidates)
            .ok_or(TrackingError::NoCandidates)?;
        let estimated = candidates[selected_index];

        debug!(
            address = %beacon.address,
            rssi_dbm,
            distance_m,
            selected_index,
            %estimated,
            "Position estimated"
        );

        let estimate = PositionEstimate {
            session_id: self.session_id,
            beacon,
            observer,
            rssi_dbm,
            distance_m,
            candidates,
            selected_index,
            estimated,
            estimated_at_utc: Utc::now(),
        };
        self.latest.send_replace(Some(estimate.clone()));
        Ok(estimate)
    }

    /// Tick every `period` until `shutdown` fires or its sender is dropped.
    ///
    /// Failed ticks are logged and skipped; the previous estimate stays
    /// published.
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            session_id = %self.session_id,
            period_ms = period.as_millis(),
            "Tracking started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => match self.tick().await {
                    Ok(_) => {}
                    Err(e) if e.is_waiting() => debug!(reason = %e, "Tracking idle"),
                    Err(e) => log_tick_failure(&LocatorError::from(e)),
                },
                _ = &mut shutdown => break,
            }
        }

        info!(session_id = %self.session_id, "Tracking stopped");
    }
}

fn log_tick_failure(err: &LocatorError) {
    if err.is_recoverable() {
        warn!(error = %err, code = err.error_code(), "Tracking tick failed, retrying");
    } else {
        error!(
            error = %err,
            code = err.error_code(),
            bluetooth = err.is_bluetooth_error(),
            "Tracking tick failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::{MockBeacon, MockRadio};
    use crate::estimator::{Coordinate, PathLossModel};
    use crate::location::SharedLocation;
    use crate::selection::FirstSelector;

    const TAG: &str = "AA:BB:CC:DD:EE:02";

    struct Fixture {
        radio: Arc<MockRadio>,
        beacons: Arc<BeaconManager>,
        location: Arc<SharedLocation>,
        tracker: Arc<Tracker>,
    }

    fn fixture(sample_count: usize) -> Fixture {
        let radio = Arc::new(MockRadio::new().with_beacon(MockBeacon::new(TAG, Some("Tag"), -70)));
        let beacons = Arc::new(BeaconManager::new(radio.clone()));
        let location = Arc::new(SharedLocation::new());
        let tracker = Arc::new(Tracker::new(
            beacons.clone(),
            location.clone(),
            PositionEstimator::new(PathLossModel::default(), sample_count),
            Box::new(FirstSelector),
        ));
        Fixture {
            radio,
            beacons,
            location,
            tracker,
        }
    }

    #[tokio::test]
    async fn test_tick_requires_fix_and_connection() {
        let f = fixture(8);
        assert!(matches!(f.tracker.tick().await, Err(TrackingError::NoLocationFix)));

        f.location
            .update(Coordinate::new(40.0, -75.0), None)
            .await
            .unwrap();
        assert!(matches!(f.tracker.tick().await, Err(TrackingError::NotConnected)));
        assert!(f.tracker.latest().is_none());
    }

    #[tokio::test]
    async fn test_tick_publishes_estimate() {
        let f = fixture(8);
        let mut rx = f.tracker.subscribe();
        f.location
            .update(Coordinate::new(40.0, -75.0), Some(5.0))
            .await
            .unwrap();
        f.beacons.connect(TAG).await.unwrap();

        let estimate = f.tracker.tick().await.unwrap();
        assert_eq!(estimate.rssi_dbm, -70);
        assert!((estimate.distance_m - 31.622_776_6).abs() < 1e-6);
        assert_eq!(estimate.candidates.len(), 8);
        assert_eq!(estimate.selected_index, 0);
        assert_eq!(estimate.estimated, estimate.candidates[0]);
        assert!((estimate.estimated.longitude - (-74.999_629_2)).abs() < 1e-7);
        assert_eq!(estimate.session_id, f.tracker.session_id());

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&estimate));
    }

    #[tokio::test]
    async fn test_tick_uses_fresh_rssi() {
        let f = fixture(8);
        f.location
            .update(Coordinate::new(40.0, -75.0), None)
            .await
            .unwrap();
        f.beacons.connect(TAG).await.unwrap();

        let far = f.tracker.tick().await.unwrap();
        f.radio.set_rssi(TAG, -40).await;
        let near = f.tracker.tick().await.unwrap();

        assert!(near.distance_m < far.distance_m);
        assert_eq!(near.distance_m, 1.0);
    }

    #[tokio::test]
    async fn test_zero_sample_count_yields_no_candidates() {
        let f = fixture(0);
        f.location
            .update(Coordinate::new(40.0, -75.0), None)
            .await
            .unwrap();
        f.beacons.connect(TAG).await.unwrap();
        assert!(matches!(f.tracker.tick().await, Err(TrackingError::NoCandidates)));
    }

    #[tokio::test]
    async fn test_set_estimator_applies_to_next_tick() {
        let f = fixture(8);
        f.location
            .update(Coordinate::new(40.0, -75.0), None)
            .await
            .unwrap();
        f.beacons.connect(TAG).await.unwrap();

        f.tracker
            .set_estimator(PositionEstimator::new(
                PathLossModel {
                    reference_rssi_dbm: -70.0,
                    path_loss_exponent: 2.0,
                },
                4,
            ))
            .await;
        let estimate = f.tracker.tick().await.unwrap();
        assert_eq!(estimate.distance_m, 1.0);
        assert_eq!(estimate.candidates.len(), 4);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(8);
        f.location
            .update(Coordinate::new(40.0, -75.0), None)
            .await
            .unwrap();
        f.beacons.connect(TAG).await.unwrap();

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(
            f.tracker
                .clone()
                .run(Duration::from_millis(10), stop_rx),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(f.tracker.latest().is_some());
    }

    #[test]
    fn test_not_connected_maps_from_bluetooth() {
        let err: TrackingError = BluetoothError::NotConnected.into();
        assert!(matches!(err, TrackingError::NotConnected));
        assert!(err.is_waiting());

        let err: TrackingError = BluetoothError::AdapterNotFound.into();
        assert!(!err.is_waiting());
    }
}
