//! Observer location fixes.
//!
//! The locator does not own a GPS receiver. Fixes are pushed in by whatever
//! does (a phone client, a gpsd bridge) and the tracker reads the latest one
//! on each tick.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::estimator::Coordinate;
use crate::tracker::TrackingError;
use crate::types::LocationFix;

/// Something that can report where the observer is.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// The most recent fix, if one exists.
    async fn current_fix(&self) -> Option<LocationFix>;
}

/// Push-fed location source holding the latest fix.
#[derive(Debug, Default)]
pub struct SharedLocation {
    latest: RwLock<Option<LocationFix>>,
}

impl SharedLocation {
    /// A source with no fix yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new fix taken now.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidCoordinate`] if the coordinate is not
    /// finite, out of range or at a pole, or [`TrackingError::InvalidAccuracy`] if the
    /// accuracy is negative or not finite.
    pub async fn update(
        &self,
        coordinate: Coordinate,
        accuracy_m: Option<f64>,
    ) -> Result<LocationFix, TrackingError> {
        // Ring projection divides by cos(latitude), so poles cannot anchor a ring.
        if !coordinate.is_valid() || coordinate.latitude.abs() >= 90.0 {
            return Err(TrackingError::InvalidCoordinate {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            });
        }
        if let Some(accuracy) = accuracy_m {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(TrackingError::InvalidAccuracy(accuracy));
            }
        }

        let fix = LocationFix {
            coordinate,
            accuracy_m,
            recorded_at_utc: Utc::now(),
        };
        *self.latest.write().await = Some(fix);
        debug!(%coordinate, ?accuracy_m, "Location fix updated");
        Ok(fix)
    }
}

#[async_trait]
impl LocationSource for SharedLocation {
    async fn current_fix(&self) -> Option<LocationFix> {
        *self.latest.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_without_fix() {
        assert!(SharedLocation::new().current_fix().await.is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_fix() {
        let source = SharedLocation::new();
        source.update(Coordinate::new(1.0, 2.0), None).await.unwrap();
        source
            .update(Coordinate::new(40.0, -75.0), Some(3.0))
            .await
            .unwrap();

        let fix = source.current_fix().await.unwrap();
        assert_eq!(fix.coordinate, Coordinate::new(40.0, -75.0));
        assert_eq!(fix.accuracy_m, Some(3.0));
    }

    #[tokio::test]
    async fn test_rejects_invalid_coordinate() {
        let source = SharedLocation::new();
        let err = source
            .update(Coordinate::new(120.0, 0.0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::InvalidCoordinate { .. }));
        assert!(source.current_fix().await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_poles() {
        let source = SharedLocation::new();
        for latitude in [90.0, -90.0] {
            let err = source
                .update(Coordinate::new(latitude, 10.0), None)
                .await
                .unwrap_err();
            assert!(matches!(err, TrackingError::InvalidCoordinate { .. }));
        }
        assert!(source.current_fix().await.is_none());

        source
            .update(Coordinate::new(89.9, 10.0), None)
            .await
            .unwrap();
        assert!(source.current_fix().await.is_some());
    }

    #[tokio::test]
    async fn test_rejects_negative_accuracy() {
        let source = SharedLocation::new();
        let err = source
            .update(Coordinate::new(0.0, 0.0), Some(-1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::InvalidAccuracy(_)));
    }
}
