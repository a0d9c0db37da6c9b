//! Accumulator maps owned by one processing pass.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use gridver_accum::{
    AccumError, Accumulator, Entity, EntityKind, GridIndex, MetricsRecord, RegionKey, Score,
    normalize_thresholds,
};
use gridver_metrics::{CompletenessConfig, CompletenessReport, MetricsCalculator};
use gridver_spatial::{RegionManager, SpatialIndex, StationManager};
use ndarray::Array2;
use serde::Serialize;

use crate::error::WorkflowError;

pub type GridpointMap = BTreeMap<GridIndex, Accumulator>;
pub type RegionalMap = BTreeMap<RegionKey, Accumulator>;
pub type StationMap = BTreeMap<String, Accumulator>;

/// Gridpoint, regional and station accumulators for one variable and
/// temporal group.
///
/// Gridpoint accumulators are created on first use. Regional and station
/// accumulators are seeded up front; data for a region or station that was
/// not seeded is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PassAccumulators {
    thresholds: Vec<f64>,
    gridpoints: GridpointMap,
    regions: RegionalMap,
    stations: StationMap,
}

impl PassAccumulators {
    /// Empty maps; `thresholds` are normalised.
    pub fn new(thresholds: &[f64]) -> Self {
        Self {
            thresholds: normalize_thresholds(thresholds),
            gridpoints: GridpointMap::new(),
            regions: RegionalMap::new(),
            stations: StationMap::new(),
        }
    }

    /// Seeds one regional accumulator per region of every indexed type.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Spatial`] if an indexed region type is not
    /// loaded in `regions`.
    pub fn with_regions(
        mut self,
        regions: &RegionManager,
        index: &SpatialIndex,
    ) -> Result<Self, WorkflowError> {
        for region_type in index.region_types() {
            for region in regions.regions(region_type)? {
                let key = RegionKey::new(region_type.as_str(), region.id());
                let acc = Accumulator::region(key.clone(), region.name(), &self.thresholds);
                self.regions.insert(key, acc);
            }
        }
        Ok(self)
    }

    /// Seeds one station accumulator per loaded station.
    pub fn with_stations(mut self, stations: &StationManager) -> Self {
        for station in stations.stations() {
            let acc = Accumulator::new(station.entity(), &self.thresholds);
            self.stations.insert(station.station_id.clone(), acc);
        }
        self
    }

    /// Rebuilds maps from a flat accumulator list, keyed by entity.
    ///
    /// # Errors
    ///
    /// Returns [`AccumError::ThresholdMismatch`] for an accumulator with a
    /// different threshold set, or a merge error if two entries share a key
    /// but cannot be merged.
    pub fn from_accumulators(
        thresholds: &[f64],
        accumulators: impl IntoIterator<Item = Accumulator>,
    ) -> Result<Self, WorkflowError> {
        let mut pass = Self::new(thresholds);
        for acc in accumulators {
            pass.insert(acc)?;
        }
        Ok(pass)
    }

    /// Every accumulator: gridpoints, then regions, then stations.
    pub fn into_accumulators(self) -> Vec<Accumulator> {
        self.gridpoints
            .into_values()
            .chain(self.regions.into_values())
            .chain(self.stations.into_values())
            .collect()
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn gridpoints(&self) -> &GridpointMap {
        &self.gridpoints
    }

    pub fn regions(&self) -> &RegionalMap {
        &self.regions
    }

    pub fn stations(&self) -> &StationMap {
        &self.stations
    }

    pub fn gridpoints_mut(&mut self) -> &mut GridpointMap {
        &mut self.gridpoints
    }

    pub fn regions_mut(&mut self) -> &mut RegionalMap {
        &mut self.regions
    }

    pub fn stations_mut(&mut self) -> &mut StationMap {
        &mut self.stations
    }

    /// Accumulator for `index`, created with the given coordinates if absent.
    pub fn gridpoint_entry(&mut self, index: GridIndex, lat: f64, lon: f64) -> &mut Accumulator {
        gridpoint_entry(&mut self.gridpoints, &self.thresholds, index, lat, lon)
    }

    /// Mutable access to all three maps at once.
    pub(crate) fn split_mut(
        &mut self,
    ) -> (&[f64], &mut GridpointMap, &mut RegionalMap, &mut StationMap) {
        (
            &self.thresholds,
            &mut self.gridpoints,
            &mut self.regions,
            &mut self.stations,
        )
    }

    /// Same thresholds and seeded entities, zeroed statistics, no gridpoints.
    pub fn fresh(&self) -> Self {
        Self {
            thresholds: self.thresholds.clone(),
            gridpoints: GridpointMap::new(),
            regions: fresh_map(&self.regions),
            stations: fresh_map(&self.stations),
        }
    }

    pub fn total_samples(&self) -> u64 {
        self.gridpoints.values().map(Accumulator::n_samples).sum()
    }

    /// Merges `other` entity by entity; entities only in `other` are copied.
    ///
    /// # Errors
    ///
    /// Returns [`AccumError::ThresholdMismatch`] (checked before anything is
    /// modified) or the first per-entity merge error.
    pub fn merge(&mut self, other: &PassAccumulators) -> Result<(), WorkflowError> {
        self.check_thresholds(&other.thresholds)?;
        merge_map(&mut self.gridpoints, &other.gridpoints)?;
        merge_map(&mut self.regions, &other.regions)?;
        merge_map(&mut self.stations, &other.stations)?;
        Ok(())
    }

    /// Consuming [`merge`](Self::merge), for reductions.
    pub fn merged(mut self, other: PassAccumulators) -> Result<Self, WorkflowError> {
        self.check_thresholds(&other.thresholds)?;
        for acc in other.into_accumulators() {
            self.insert(acc)?;
        }
        Ok(self)
    }

    /// Final metrics for every entity, unfiltered.
    pub fn compute_metrics(&self) -> PassMetrics {
        self.compute_metrics_with(&MetricsCalculator::new())
    }

    /// Final metrics for every entity, filtered by `calculator`.
    pub fn compute_metrics_with(&self, calculator: &MetricsCalculator) -> PassMetrics {
        let records = |accs: Vec<&Accumulator>| -> Vec<MetricsRecord> {
            accs.into_iter()
                .map(|acc| calculator.compute_from_accumulator(acc))
                .collect()
        };
        PassMetrics {
            gridpoints: records(self.gridpoints.values().collect()),
            regions: records(self.regions.values().collect()),
            stations: records(self.stations.values().collect()),
        }
    }

    fn check_thresholds(&self, other: &[f64]) -> Result<(), AccumError> {
        let same = self.thresholds.len() == other.len()
            && self
                .thresholds
                .iter()
                .zip(other)
                .all(|(a, b)| a.to_bits() == b.to_bits());
        if same {
            Ok(())
        } else {
            Err(AccumError::ThresholdMismatch {
                left: self.thresholds.clone(),
                right: other.to_vec(),
            })
        }
    }

    fn insert(&mut self, acc: Accumulator) -> Result<(), WorkflowError> {
        self.check_thresholds(acc.thresholds())?;
        match acc.entity().clone() {
            Entity::Gridpoint { index, .. } => insert_or_merge(&mut self.gridpoints, index, acc),
            Entity::Region { key, .. } => insert_or_merge(&mut self.regions, key, acc),
            Entity::Station { station_id, .. } => {
                insert_or_merge(&mut self.stations, station_id, acc)
            }
        }
    }
}

pub(crate) fn gridpoint_entry<'m>(
    gridpoints: &'m mut GridpointMap,
    thresholds: &[f64],
    index: GridIndex,
    lat: f64,
    lon: f64,
) -> &'m mut Accumulator {
    gridpoints
        .entry(index)
        .or_insert_with(|| Accumulator::gridpoint(index, lat, lon, thresholds))
}

fn fresh_map<K: Ord + Clone>(map: &BTreeMap<K, Accumulator>) -> BTreeMap<K, Accumulator> {
    map.iter().map(|(k, acc)| (k.clone(), acc.fresh())).collect()
}

fn merge_map<K: Ord + Clone>(
    into: &mut BTreeMap<K, Accumulator>,
    from: &BTreeMap<K, Accumulator>,
) -> Result<(), AccumError> {
    for (key, acc) in from {
        match into.get_mut(key) {
            Some(existing) => existing.merge(acc)?,
            None => {
                into.insert(key.clone(), acc.clone());
            }
        }
    }
    Ok(())
}

fn insert_or_merge<K: Ord>(
    map: &mut BTreeMap<K, Accumulator>,
    key: K,
    acc: Accumulator,
) -> Result<(), WorkflowError> {
    match map.entry(key) {
        Entry::Occupied(mut slot) => slot.get_mut().merge(&acc)?,
        Entry::Vacant(slot) => {
            slot.insert(acc);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PassMetrics
// ---------------------------------------------------------------------------

/// Metrics records of one pass, ready for an output sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassMetrics {
    pub gridpoints: Vec<MetricsRecord>,
    pub regions: Vec<MetricsRecord>,
    pub stations: Vec<MetricsRecord>,
}

impl PassMetrics {
    /// One score laid out on an `(nj, ni)` grid; cells without a record are NaN.
    pub fn score_grid(&self, score: Score, ni: usize, nj: usize) -> Array2<f64> {
        let mut grid = Array2::from_elem((nj, ni), f64::NAN);
        for record in &self.gridpoints {
            if let Entity::Gridpoint { index, .. } = &record.entity
                && index.i < ni
                && index.j < nj
            {
                grid[(index.j, index.i)] = record.score(score);
            }
        }
        grid
    }

    /// Sample-count completeness of each entity kind that has records.
    pub fn completeness(&self, config: &CompletenessConfig) -> Vec<CompletenessReport> {
        [
            (EntityKind::Gridpoint, &self.gridpoints),
            (EntityKind::Region, &self.regions),
            (EntityKind::Station, &self.stations),
        ]
        .into_iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(kind, records)| config.check(kind, records.iter()))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridver_spatial::Station;

    fn pass_with_station() -> PassAccumulators {
        let mut stations = StationManager::new();
        stations
            .load_stations([Station::new("KORD", 41.98, -87.9)])
            .unwrap();
        PassAccumulators::new(&[5.0, 1.0]).with_stations(&stations)
    }

    #[test]
    fn test_gridpoint_entry_is_get_or_insert() {
        let mut pass = PassAccumulators::new(&[1.0]);
        let idx = GridIndex::new(3, 4);
        pass.gridpoint_entry(idx, 40.0, -90.0).update_pair(2.0, 1.0);
        // coordinates of an existing entry never change
        pass.gridpoint_entry(idx, 0.0, 0.0).update_pair(3.0, 1.0);
        let acc = &pass.gridpoints()[&idx];
        assert_eq!(acc.n_samples(), 2);
        assert_eq!(acc.entity(), &Entity::gridpoint(idx, 40.0, -90.0));
        assert_eq!(pass.total_samples(), 2);
    }

    #[test]
    fn test_fresh_keeps_templates() {
        let mut pass = pass_with_station();
        pass.gridpoint_entry(GridIndex::new(0, 0), 0.0, 0.0)
            .update_pair(1.0, 1.0);
        pass.stations_mut()
            .get_mut("KORD")
            .unwrap()
            .update_pair(1.0, 2.0);

        let fresh = pass.fresh();
        assert!(fresh.gridpoints().is_empty());
        assert_eq!(fresh.stations().len(), 1);
        assert_eq!(fresh.stations()["KORD"].n_samples(), 0);
        assert_eq!(fresh.thresholds(), &[1.0, 5.0]);
    }

    #[test]
    fn test_merge_by_key() {
        let mut a = pass_with_station();
        let mut b = a.fresh();
        a.gridpoint_entry(GridIndex::new(0, 0), 0.0, 0.0)
            .update_pair(1.0, 2.0);
        b.gridpoint_entry(GridIndex::new(0, 0), 0.0, 0.0)
            .update_pair(3.0, 2.0);
        b.gridpoint_entry(GridIndex::new(1, 0), 0.0, 1.0)
            .update_pair(3.0, 2.0);
        b.stations_mut()
            .get_mut("KORD")
            .unwrap()
            .update_pair(4.0, 4.0);

        let owned = a.clone().merged(b.clone()).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a, owned);
        assert_eq!(a.gridpoints().len(), 2);
        assert_eq!(a.gridpoints()[&GridIndex::new(0, 0)].n_samples(), 2);
        assert_eq!(a.stations()["KORD"].n_samples(), 1);
        assert_relative_eq!(a.gridpoints()[&GridIndex::new(0, 0)].stats().bias(), 0.0);
    }

    #[test]
    fn test_merge_rejects_other_thresholds() {
        let mut a = PassAccumulators::new(&[1.0]);
        let b = PassAccumulators::new(&[2.0]);
        assert!(matches!(
            a.merge(&b),
            Err(WorkflowError::Accum(AccumError::ThresholdMismatch { .. }))
        ));
    }

    #[test]
    fn test_flat_round_trip() {
        let mut pass = pass_with_station();
        pass.gridpoint_entry(GridIndex::new(2, 1), 1.0, 2.0)
            .update_pair(1.0, 2.0);
        let thresholds = pass.thresholds().to_vec();
        let rebuilt =
            PassAccumulators::from_accumulators(&thresholds, pass.clone().into_accumulators())
                .unwrap();
        assert_eq!(rebuilt, pass);
    }

    #[test]
    fn test_metrics_grid_and_completeness() {
        let mut pass = PassAccumulators::new(&[1.0]);
        pass.gridpoint_entry(GridIndex::new(1, 0), 0.0, 0.0)
            .update(&[1.0, 2.0, 3.0], &[1.5, 2.5, 2.5], None)
            .unwrap();
        let metrics = pass.compute_metrics();
        assert_eq!(metrics.gridpoints.len(), 1);
        assert!(metrics.regions.is_empty());

        let grid = metrics.score_grid(Score::Mae, 2, 2);
        assert_relative_eq!(grid[(0, 1)], 0.5);
        assert!(grid[(0, 0)].is_nan());

        let reports = metrics.completeness(&CompletenessConfig::default());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, EntityKind::Gridpoint);
        // 3 samples < default minimum of 5
        assert!(!reports[0].is_complete());
    }
}
