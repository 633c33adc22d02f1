//! Picking one point out of a candidate ring.
//!
//! The estimator only says where the beacon could be. Which of those
//! equally plausible points gets shown is a presentation choice, made here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::estimator::Coordinate;

/// Chooses one candidate per tick.
pub trait CandidateSelector: Send {
    /// Index of the chosen candidate, or `None` when `candidates` is empty.
    fn select(&mut self, candidates: &[Coordinate]) -> Option<usize>;
}

/// Uniformly random choice.
#[derive(Debug)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed, for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSelector for RandomSelector {
    fn select(&mut self, candidates: &[Coordinate]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.rng.gen_range(0..candidates.len()))
    }
}

/// Always the first candidate (bearing 0).
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstSelector;

impl CandidateSelector for FirstSelector {
    fn select(&mut self, candidates: &[Coordinate]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

/// The candidate closest to the previously selected point.
///
/// Keeps the displayed point from jumping around the ring between ticks.
/// The first pick falls back to index 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestToPreviousSelector {
    previous: Option<Coordinate>,
}

impl CandidateSelector for NearestToPreviousSelector {
    fn select(&mut self, candidates: &[Coordinate]) -> Option<usize> {
        let index = match self.previous {
            None => {
                if candidates.is_empty() {
                    return None;
                }
                0
            }
            Some(previous) => candidates
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    previous
                        .planar_distance_meters(a)
                        .total_cmp(&previous.planar_distance_meters(b))
                })
                .map(|(i, _)| i)?,
        };
        self.previous = Some(candidates[index]);
        Some(index)
    }
}

/// Configurable selection strategy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// [`RandomSelector`].
    #[default]
    Random,
    /// [`FirstSelector`].
    First,
    /// [`NearestToPreviousSelector`].
    NearestToPrevious,
}

impl SelectionStrategy {
    /// Build a fresh selector for this strategy.
    #[must_use]
    pub fn build(self) -> Box<dyn CandidateSelector> {
        match self {
            Self::Random => Box::new(RandomSelector::new()),
            Self::First => Box::new(FirstSelector),
            Self::NearestToPrevious => Box::new(NearestToPreviousSelector::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::estimate_ring_sampled;

    fn ring() -> Vec<Coordinate> {
        estimate_ring_sampled(Coordinate::new(40.0, -75.0), 30.0, 8)
    }

    #[test]
    fn test_empty_candidates_select_nothing() {
        assert_eq!(RandomSelector::with_seed(1).select(&[]), None);
        assert_eq!(FirstSelector.select(&[]), None);
        assert_eq!(NearestToPreviousSelector::default().select(&[]), None);
    }

    #[test]
    fn test_random_selector_stays_in_bounds() {
        let candidates = ring();
        let mut selector = RandomSelector::with_seed(7);
        for _ in 0..200 {
            let i = selector.select(&candidates).unwrap();
            assert!(i < candidates.len());
        }
    }

    #[test]
    fn test_random_selector_is_reproducible_with_seed() {
        let candidates = ring();
        let mut a = RandomSelector::with_seed(42);
        let mut b = RandomSelector::with_seed(42);
        for _ in 0..20 {
            assert_eq!(a.select(&candidates), b.select(&candidates));
        }
    }

    #[test]
    fn test_first_selector() {
        assert_eq!(FirstSelector.select(&ring()), Some(0));
    }

    #[test]
    fn test_nearest_to_previous_tracks_last_pick() {
        let mut selector = NearestToPreviousSelector::default();
        let observer = Coordinate::new(40.0, -75.0);

        let first = estimate_ring_sampled(observer, 30.0, 8);
        assert_eq!(selector.select(&first), Some(0));

        // Same ring rotated by one sample: the old index 0 is now index 1.
        let mut rotated = first.clone();
        rotated.rotate_right(1);
        assert_eq!(selector.select(&rotated), Some(1));
    }

    #[test]
    fn test_strategy_deserializes_snake_case() {
        let s: SelectionStrategy = serde_json::from_str("\"nearest_to_previous\"").unwrap();
        assert_eq!(s, SelectionStrategy::NearestToPrevious);
        assert_eq!(SelectionStrategy::default(), SelectionStrategy::Random);
    }
}
