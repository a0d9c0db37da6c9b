//! Accumulator: entity identity tag plus running statistics.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, GridIndex, RegionKey};
use crate::error::AccumError;
use crate::record::MetricsRecord;
use crate::statistics::Statistics;

/// Running verification statistics owned by exactly one entity.
///
/// The identity is fixed at construction. Statistics only grow through
/// [`update`](Self::update), [`update_pair`](Self::update_pair) and
/// [`merge`](Self::merge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    entity: Entity,
    stats: Statistics,
}

impl Accumulator {
    pub fn new(entity: Entity, thresholds: &[f64]) -> Self {
        Self {
            entity,
            stats: Statistics::new(thresholds),
        }
    }

    pub fn gridpoint(index: GridIndex, lat: f64, lon: f64, thresholds: &[f64]) -> Self {
        Self::new(Entity::gridpoint(index, lat, lon), thresholds)
    }

    pub fn region(key: RegionKey, region_name: impl Into<String>, thresholds: &[f64]) -> Self {
        Self::new(Entity::region(key, region_name), thresholds)
    }

    pub fn station(station_id: impl Into<String>, lat: f64, lon: f64, thresholds: &[f64]) -> Self {
        Self::new(Entity::station(station_id, lat, lon), thresholds)
    }

    /// Same identity and thresholds, zeroed statistics.
    pub fn fresh(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            stats: self.stats.empty_like(),
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn n_samples(&self) -> u64 {
        self.stats.n_samples()
    }

    pub fn thresholds(&self) -> &[f64] {
        self.stats.thresholds()
    }

    /// See [`Statistics::update`].
    pub fn update(
        &mut self,
        forecasts: &[f64],
        observations: &[f64],
        probabilistic: Option<&[f64]>,
    ) -> Result<usize, AccumError> {
        self.stats.update(forecasts, observations, probabilistic)
    }

    /// Folds one scalar pair; returns `false` if it was missing.
    #[inline]
    pub fn update_pair(&mut self, forecast: f64, observation: f64) -> bool {
        self.stats.update_pair(forecast, observation)
    }

    /// Merges another accumulator of the same entity into this one.
    ///
    /// # Errors
    ///
    /// Checked in order: [`AccumError::KindMismatch`],
    /// [`AccumError::EntityMismatch`], [`AccumError::ThresholdMismatch`].
    /// Nothing is modified on error.
    pub fn merge(&mut self, other: &Accumulator) -> Result<(), AccumError> {
        if self.kind() != other.kind() {
            return Err(AccumError::KindMismatch {
                left: self.kind(),
                right: other.kind(),
            });
        }
        if !self.entity.same_entity(&other.entity) {
            return Err(AccumError::EntityMismatch {
                left: self.entity.key_string(),
                right: other.entity.key_string(),
            });
        }
        self.stats.merge(&other.stats)
    }

    /// Derives the final metrics. Does not mutate; may be called repeatedly.
    pub fn compute_metrics(&self) -> MetricsRecord {
        MetricsRecord::from_statistics(self.entity.clone(), &self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Score;
    use approx::assert_abs_diff_eq;

    fn filled(sum_forecast: f64, n: usize) -> Accumulator {
        let mut acc = Accumulator::gridpoint(GridIndex::new(0, 0), 40.0, -100.0, &[5.0]);
        let f = vec![sum_forecast / n as f64; n];
        let o = vec![1.0; n];
        acc.update(&f, &o, None).unwrap();
        acc
    }

    #[test]
    fn test_merge_counts_and_sums() {
        let mut a = filled(100.0, 10);
        let b = filled(60.0, 5);
        a.merge(&b).unwrap();
        assert_eq!(a.n_samples(), 15);
        assert_abs_diff_eq!(a.stats().sum_forecast(), 160.0, epsilon = 1e-9);
    }

    #[test]
    fn test_merge_rejects_other_kind() {
        let mut a = filled(1.0, 1);
        let b = Accumulator::region(RegionKey::new("cwa", "LOT"), "Chicago", &[5.0]);
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(
            err,
            AccumError::KindMismatch {
                left: EntityKind::Gridpoint,
                right: EntityKind::Region
            }
        ));
    }

    #[test]
    fn test_merge_rejects_other_entity() {
        let mut a = Accumulator::station("KORD", 41.98, -87.9, &[]);
        let b = Accumulator::station("KMDW", 41.78, -87.75, &[]);
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(err, AccumError::EntityMismatch { .. }));
    }

    #[test]
    fn test_merge_rejects_other_thresholds() {
        let mut a = filled(1.0, 1);
        let b = Accumulator::gridpoint(GridIndex::new(0, 0), 40.0, -100.0, &[5.0, 10.0]);
        let before = a.clone();
        assert!(matches!(
            a.merge(&b),
            Err(AccumError::ThresholdMismatch { .. })
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_fresh_keeps_identity() {
        let a = filled(10.0, 2);
        let fresh = a.fresh();
        assert!(fresh.entity().same_entity(a.entity()));
        assert_eq!(fresh.thresholds(), a.thresholds());
        assert_eq!(fresh.n_samples(), 0);
    }

    #[test]
    fn test_compute_metrics_is_repeatable() {
        let mut acc = Accumulator::region(RegionKey::new("zone", "ILZ014"), "Cook", &[2.0]);
        acc.update(&[1.0, 2.0, 3.0], &[1.5, 2.5, 2.5], None).unwrap();
        let first = acc.compute_metrics();
        let second = acc.compute_metrics();
        assert_eq!(first.n_samples, second.n_samples);
        assert_abs_diff_eq!(first.score(Score::Rmse), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(first.score(Score::Bias), -1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(acc.n_samples(), 3);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let acc = filled(12.0, 3);
        let json = serde_json::to_string(&acc).unwrap();
        let back: Accumulator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, acc);
    }
}
