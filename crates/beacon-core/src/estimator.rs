//! RSSI distance and position estimation.
//!
//! Turns a single signal-strength reading into a ring of candidate
//! coordinates around the observer:
//!
//! 1. [`estimate_distance`] converts RSSI to meters with the log-distance
//!    path-loss model.
//! 2. A local planar frame around the observer projects `(distance, bearing)`
//!    pairs to latitude/longitude.
//! 3. A [`BearingPolicy`] decides which bearings are projected: a full
//!    1-degree sweep, `N` equally spaced samples, or one caller-supplied angle.
//!
//! Bearings follow the planar convention: 0 degrees points east and angles
//! grow counter-clockwise (north is 90 degrees).
//!
//! The projection is a flat-Earth approximation. It is only meaningful for
//! distances of tens to low hundreds of meters and away from the poles. At
//! `|latitude| == 90` the longitude scale divides by zero and the resulting
//! non-finite values are returned as-is.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Expected RSSI at one meter from the beacon (dBm).
pub const DEFAULT_REFERENCE_RSSI_DBM: f64 = -40.0;

/// Free-space path-loss exponent.
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

/// Number of candidates produced by [`estimate_ring_sampled`] by default.
pub const DEFAULT_SAMPLE_COUNT: usize = 8;

/// Meters per degree of latitude used by the planar frame.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 110_540.0;

/// Meters per degree of longitude at the equator used by the planar frame.
pub const METERS_PER_DEGREE_LONGITUDE: f64 = 111_320.0;

/// Bearings covered by a full sweep, one per degree.
pub const FULL_SWEEP_BEARINGS: u16 = 360;

/// Decimal places kept by the sampled ring (about 1.1 cm at the equator).
pub const SAMPLED_DECIMAL_PLACES: i32 = 7;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "latitude": 40.0, "longitude": -75.0 }))]
pub struct Coordinate {
    /// Latitude in decimal degrees, -90 to 90.
    #[schema(example = 40.0)]
    pub latitude: f64,

    /// Longitude in decimal degrees, -180 to 180.
    #[schema(example = -75.0)]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and within WGS84 ranges.
    ///
    /// The estimator never calls this; it is for callers that accept
    /// coordinates from the outside world.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Round both components to `places` decimal places.
    #[must_use]
    pub fn rounded(&self, places: i32) -> Self {
        Self {
            latitude: round_to(self.latitude, places),
            longitude: round_to(self.longitude, places),
        }
    }

    /// Format both components with exactly seven decimal places.
    #[must_use]
    pub fn to_fixed_strings(&self) -> (String, String) {
        (
            format!("{:.7}", self.latitude),
            format!("{:.7}", self.longitude),
        )
    }

    /// East/north offset in meters of `other` relative to `self`, using the
    /// same scale factors as the projection.
    #[must_use]
    pub fn planar_offset_meters(&self, other: &Self) -> (f64, f64) {
        let frame = LocalFrame::new(*self);
        (
            (other.longitude - self.longitude) / frame.lng_per_meter,
            (other.latitude - self.latitude) / frame.lat_per_meter,
        )
    }

    /// Straight-line planar distance in meters between `self` and `other`.
    #[must_use]
    pub fn planar_distance_meters(&self, other: &Self) -> f64 {
        let (east, north) = self.planar_offset_meters(other);
        east.hypot(north)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.latitude, self.longitude)
    }
}

/// Log-distance path-loss model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PathLossModel {
    /// Expected RSSI at one meter (dBm).
    #[schema(example = -40.0)]
    pub reference_rssi_dbm: f64,

    /// Environmental attenuation; 2 is free space.
    #[schema(example = 2.0)]
    pub path_loss_exponent: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_rssi_dbm: DEFAULT_REFERENCE_RSSI_DBM,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

impl PathLossModel {
    /// Distance in meters for a single RSSI reading.
    #[must_use]
    pub fn distance_meters(&self, rssi_dbm: f64) -> f64 {
        estimate_distance(rssi_dbm, self.reference_rssi_dbm, self.path_loss_exponent)
    }
}

/// Estimate distance in meters from a single RSSI reading.
///
/// `10 ^ ((reference - rssi) / (10 * exponent))`. A reading equal to the
/// reference yields exactly one meter. No validation is performed; extreme
/// inputs produce very large or near-zero distances.
#[must_use]
pub fn estimate_distance(rssi_dbm: f64, reference_rssi_dbm: f64, path_loss_exponent: f64) -> f64 {
    10f64.powf((reference_rssi_dbm - rssi_dbm) / (10.0 * path_loss_exponent))
}

/// Which bearings to project around the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BearingPolicy {
    /// Every integer bearing from 0 to 359 degrees, full precision.
    FullSweep,
    /// `n` equally spaced bearings starting at 0, rounded to
    /// [`SAMPLED_DECIMAL_PLACES`].
    Sampled(usize),
    /// One bearing in degrees, full precision.
    Single(f64),
}

impl BearingPolicy {
    /// Bearings in degrees, in increasing order.
    #[must_use]
    pub fn bearings(&self) -> Vec<f64> {
        match *self {
            Self::FullSweep => (0..FULL_SWEEP_BEARINGS).map(f64::from).collect(),
            Self::Sampled(count) => {
                let step = 360.0 / count as f64;
                (0..count).map(|i| step * i as f64).collect()
            }
            Self::Single(bearing) => vec![bearing],
        }
    }

    const fn decimal_places(&self) -> Option<i32> {
        match self {
            Self::Sampled(_) => Some(SAMPLED_DECIMAL_PLACES),
            Self::FullSweep | Self::Single(_) => None,
        }
    }
}

/// Planar frame anchored at an observer, with per-meter scale factors
/// computed once.
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    origin: Coordinate,
    lat_per_meter: f64,
    lng_per_meter: f64,
}

impl LocalFrame {
    fn new(origin: Coordinate) -> Self {
        Self {
            origin,
            lat_per_meter: 1.0 / METERS_PER_DEGREE_LATITUDE,
            lng_per_meter: 1.0
                / (METERS_PER_DEGREE_LONGITUDE * origin.latitude.to_radians().cos()),
        }
    }

    fn project(&self, distance_m: f64, bearing_deg: f64) -> Coordinate {
        let bearing = bearing_deg.to_radians();
        let delta_east = distance_m * bearing.cos();
        let delta_north = distance_m * bearing.sin();

        Coordinate {
            latitude: self.origin.latitude + delta_north * self.lat_per_meter,
            longitude: self.origin.longitude + delta_east * self.lng_per_meter,
        }
    }
}

/// Project `distance_m` around `observer` at every bearing the policy yields.
///
/// The returned candidates are ordered by increasing bearing.
#[must_use]
pub fn estimate(observer: Coordinate, distance_m: f64, policy: BearingPolicy) -> Vec<Coordinate> {
    let frame = LocalFrame::new(observer);
    let places = policy.decimal_places();

    policy
        .bearings()
        .into_iter()
        .map(|bearing| {
            let candidate = frame.project(distance_m, bearing);
            places.map_or(candidate, |p| candidate.rounded(p))
        })
        .collect()
}

/// 360 candidates, one per integer bearing; index `i` is bearing `i`.
#[must_use]
pub fn estimate_ring(observer: Coordinate, distance_m: f64) -> Vec<Coordinate> {
    estimate(observer, distance_m, BearingPolicy::FullSweep)
}

/// `sample_count` equally spaced candidates rounded to seven decimal places.
///
/// A `sample_count` of zero yields an empty set.
#[must_use]
pub fn estimate_ring_sampled(
    observer: Coordinate,
    distance_m: f64,
    sample_count: usize,
) -> Vec<Coordinate> {
    estimate(observer, distance_m, BearingPolicy::Sampled(sample_count))
}

/// A single unrounded candidate at `bearing_deg`.
#[must_use]
pub fn estimate_single_position(
    observer: Coordinate,
    distance_m: f64,
    bearing_deg: f64,
) -> Coordinate {
    LocalFrame::new(observer).project(distance_m, bearing_deg)
}

/// Estimator bound to a path-loss model and a sample count.
///
/// This is what the tracker drives on every tick: one RSSI reading in, one
/// sampled candidate ring out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionEstimator {
    model: PathLossModel,
    sample_count: usize,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new(PathLossModel::default(), DEFAULT_SAMPLE_COUNT)
    }
}

impl PositionEstimator {
    /// Create an estimator.
    #[must_use]
    pub const fn new(model: PathLossModel, sample_count: usize) -> Self {
        Self {
            model,
            sample_count,
        }
    }

    /// The path-loss model in use.
    #[must_use]
    pub const fn model(&self) -> PathLossModel {
        self.model
    }

    /// Number of candidates produced per reading.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Distance in meters for one RSSI reading.
    #[must_use]
    pub fn distance_meters(&self, rssi_dbm: f64) -> f64 {
        self.model.distance_meters(rssi_dbm)
    }

    /// Sampled candidate ring for one RSSI reading.
    #[must_use]
    pub fn candidates(&self, observer: Coordinate, rssi_dbm: f64) -> Vec<Coordinate> {
        estimate_ring_sampled(observer, self.distance_meters(rssi_dbm), self.sample_count)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVER: Coordinate = Coordinate::new(40.0, -75.0);

    #[test]
    fn test_distance_is_one_meter_at_reference() {
        assert_eq!(estimate_distance(-40.0, -40.0, 2.0), 1.0);
        assert_eq!(estimate_distance(-59.0, -59.0, 3.5), 1.0);
    }

    #[test]
    fn test_distance_concrete_reading() {
        let d = estimate_distance(-70.0, DEFAULT_REFERENCE_RSSI_DBM, DEFAULT_PATH_LOSS_EXPONENT);
        assert!((d - 31.622_776_6).abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_non_negative_and_strictly_decreasing() {
        let model = PathLossModel::default();
        let mut previous = f64::INFINITY;
        for rssi in -120..=20 {
            let d = model.distance_meters(f64::from(rssi));
            assert!(d >= 0.0);
            assert!(d < previous, "distance must shrink as rssi grows (rssi {rssi})");
            previous = d;
        }
    }

    #[test]
    fn test_full_ring_has_one_candidate_per_degree() {
        let ring = estimate_ring(OBSERVER, 25.0);
        assert_eq!(ring.len(), 360);
        for (bearing, candidate) in ring.iter().enumerate() {
            let single = estimate_single_position(OBSERVER, 25.0, bearing as f64);
            assert_eq!(*candidate, single);
        }
    }

    #[test]
    fn test_ring_points_lie_at_distance() {
        for &distance in &[1.0, 31.622_776_6, 150.0] {
            for candidate in estimate_ring(OBSERVER, distance) {
                let recovered = OBSERVER.planar_distance_meters(&candidate);
                assert!(
                    (recovered - distance).abs() < 1e-6,
                    "expected {distance}, got {recovered}"
                );
            }
        }
    }

    #[test]
    fn test_zero_distance_ring_collapses_to_observer() {
        let ring = estimate_ring(OBSERVER, 0.0);
        assert_eq!(ring.len(), 360);
        assert!(ring.iter().all(|c| *c == OBSERVER));
    }

    #[test]
    fn test_sampled_ring_matches_full_ring_within_rounding() {
        let distance = 42.0;
        let full = estimate_ring(OBSERVER, distance);
        let sampled = estimate_ring_sampled(OBSERVER, distance, DEFAULT_SAMPLE_COUNT);
        assert_eq!(sampled.len(), 8);

        for (i, candidate) in sampled.iter().enumerate() {
            let reference = full[i * 45];
            assert!((candidate.latitude - reference.latitude).abs() <= 0.5e-7 + 1e-12);
            assert!((candidate.longitude - reference.longitude).abs() <= 0.5e-7 + 1e-12);
        }
    }

    #[test]
    fn test_sampled_ring_formats_to_seven_decimals() {
        for candidate in estimate_ring_sampled(OBSERVER, 31.622_776_6, 8) {
            let (lat, lng) = candidate.to_fixed_strings();
            for text in [lat, lng] {
                let decimals = text.split('.').nth(1).map_or(0, str::len);
                assert_eq!(decimals, 7, "{text}");
            }
        }
    }

    #[test]
    fn test_sampled_ring_with_zero_samples_is_empty() {
        assert!(estimate_ring_sampled(OBSERVER, 10.0, 0).is_empty());
    }

    #[test]
    fn test_sampled_bearings_are_evenly_spaced() {
        assert_eq!(BearingPolicy::Sampled(4).bearings(), vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(BearingPolicy::Sampled(3).bearings(), vec![0.0, 120.0, 240.0]);
    }

    #[test]
    fn test_bearing_zero_moves_east_only() {
        let candidate = estimate_single_position(OBSERVER, 31.622_776_6, 0.0);
        assert_eq!(candidate.latitude, OBSERVER.latitude);
        assert!(candidate.longitude > OBSERVER.longitude);
        assert!((candidate.longitude - (-74.999_629_2)).abs() < 1e-7);
    }

    #[test]
    fn test_bearing_ninety_moves_north() {
        let candidate = estimate_single_position(OBSERVER, 110.54, 90.0);
        assert!((candidate.latitude - 40.001).abs() < 1e-12);
        assert!((candidate.longitude - OBSERVER.longitude).abs() < 1e-12);
    }

    #[test]
    fn test_pole_propagates_non_finite_longitude() {
        let pole = Coordinate::new(90.0, 0.0);
        let candidate = estimate_single_position(pole, 10.0, 0.0);
        assert!(!candidate.longitude.is_finite() || candidate.longitude.abs() > 1e9);
    }

    #[test]
    fn test_estimation_is_deterministic() {
        assert_eq!(estimate_ring(OBSERVER, 12.5), estimate_ring(OBSERVER, 12.5));
        assert_eq!(
            estimate_ring_sampled(OBSERVER, 12.5, 8),
            estimate_ring_sampled(OBSERVER, 12.5, 8)
        );
        assert_eq!(
            estimate_single_position(OBSERVER, 12.5, 33.0),
            estimate_single_position(OBSERVER, 12.5, 33.0)
        );
    }

    #[test]
    fn test_position_estimator_uses_model_and_sample_count() {
        let estimator = PositionEstimator::new(
            PathLossModel {
                reference_rssi_dbm: -59.0,
                path_loss_exponent: 2.0,
            },
            4,
        );
        assert_eq!(estimator.distance_meters(-59.0), 1.0);
        let candidates = estimator.candidates(OBSERVER, -79.0);
        assert_eq!(candidates.len(), 4);
        // Seven-decimal rounding shifts longitude by up to ~4.3 mm at this latitude.
        assert!((OBSERVER.planar_distance_meters(&candidates[0]) - 10.0).abs() < 1e-2);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(OBSERVER.is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(OBSERVER.to_string(), "(40.0000000, -75.0000000)");
    }
}
