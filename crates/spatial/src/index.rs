//! Precomputed gridpoint <-> region mapping.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use gridver_accum::{GridIndex, RegionKey};
use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::info;

use crate::bbox::BoundingBox;
use crate::error::SpatialError;
use crate::grid::GridManager;
use crate::regions::RegionManager;

/// Read-only mapping between gridpoints and the regions containing them.
///
/// Built once per grid and region set with one point-in-region test per
/// `(gridpoint, region type)`; every lookup afterwards is a hash lookup or
/// a binary search. Each region key is stored once and gridpoints refer to
/// it by position, so lookups never allocate. Gridpoints outside every
/// region are not stored.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    region_types: Vec<String>,
    /// Sorted; positions are the region ids used below.
    regions: Vec<RegionKey>,
    gridpoint_regions: HashMap<GridIndex, Vec<usize>>,
    /// Parallel to `regions`.
    region_gridpoints: Vec<BTreeSet<GridIndex>>,
}

type RowHits = Vec<(GridIndex, Vec<usize>)>;

impl SpatialIndex {
    /// Indexes every cell of `(nj, ni)` coordinate arrays.
    ///
    /// `region_types` defaults to every type loaded in `regions`.
    ///
    /// # Errors
    ///
    /// [`SpatialError::CoordinateShape`] if the arrays differ in shape,
    /// [`SpatialError::UnknownRegionType`] for a type that is not loaded,
    /// [`SpatialError::AmbiguousRegion`] under the error-on-overlap policy.
    pub fn build(
        regions: &RegionManager,
        lats: ArrayView2<'_, f64>,
        lons: ArrayView2<'_, f64>,
        region_types: Option<&[String]>,
    ) -> Result<Self, SpatialError> {
        let (nj, ni) = lats.dim();
        Self::build_window(regions, lats, lons, 0..ni, 0..nj, region_types)
    }

    /// Indexes the grid's cells, restricted to `bbox` when given.
    ///
    /// # Errors
    ///
    /// [`SpatialError::CoordinatesUnavailable`] if the grid has no
    /// coordinates, [`SpatialError::BboxOutsideGrid`] if `bbox` misses the
    /// grid, plus the errors of [`build`](Self::build).
    pub fn build_for_grid(
        regions: &RegionManager,
        grid: &GridManager,
        bbox: Option<&BoundingBox>,
        region_types: Option<&[String]>,
    ) -> Result<Self, SpatialError> {
        let (lats, lons) = grid.coordinates()?;
        let (i_range, j_range) = match bbox {
            Some(bbox) => grid.bbox_index_range(bbox)?,
            None => (0..grid.ni(), 0..grid.nj()),
        };
        Self::build_window(regions, lats, lons, i_range, j_range, region_types)
    }

    #[tracing::instrument(skip(regions, lats, lons, region_types))]
    fn build_window(
        regions: &RegionManager,
        lats: ArrayView2<'_, f64>,
        lons: ArrayView2<'_, f64>,
        i_range: Range<usize>,
        j_range: Range<usize>,
        region_types: Option<&[String]>,
    ) -> Result<Self, SpatialError> {
        if lats.dim() != lons.dim() {
            return Err(SpatialError::CoordinateShape {
                name: "longitude",
                expected: lats.dim(),
                got: lons.dim(),
            });
        }
        let mut types: Vec<String> = Vec::new();
        for region_type in region_types.unwrap_or(regions.loaded_region_types()) {
            if !types.contains(region_type) {
                types.push(region_type.clone());
            }
        }

        let mut keys = Vec::new();
        for region_type in &types {
            for region in regions.regions(region_type)? {
                keys.push(RegionKey::new(region_type.as_str(), region.id()));
            }
        }
        keys.sort();

        info!(
            n_rows = j_range.len(),
            n_cols = i_range.len(),
            n_region_types = types.len(),
            n_regions = keys.len(),
            "building spatial index"
        );

        let rows: Vec<RowHits> = j_range
            .into_par_iter()
            .map(|j| -> Result<RowHits, SpatialError> {
                let mut hits = Vec::new();
                for i in i_range.clone() {
                    let (lat, lon) = (lats[(j, i)], lons[(j, i)]);
                    let mut found = Vec::new();
                    for region_type in &types {
                        if let Some(region) = regions.get_region_for_point(lat, lon, region_type)?
                            && let Some(pos) = position(&keys, region_type, region.id())
                        {
                            found.push(pos);
                        }
                    }
                    if !found.is_empty() {
                        hits.push((GridIndex::new(i, j), found));
                    }
                }
                Ok(hits)
            })
            .collect::<Result<_, _>>()?;

        let mut region_gridpoints = vec![BTreeSet::new(); keys.len()];
        let mut gridpoint_regions = HashMap::new();
        for (index, found) in rows.into_iter().flatten() {
            for &pos in &found {
                region_gridpoints[pos].insert(index);
            }
            gridpoint_regions.insert(index, found);
        }

        info!(n_indexed = gridpoint_regions.len(), "spatial index built");
        Ok(Self {
            region_types: types,
            regions: keys,
            gridpoint_regions,
            region_gridpoints,
        })
    }

    /// Region types covered by this index.
    pub fn region_types(&self) -> &[String] {
        &self.region_types
    }

    /// Every indexed region, sorted by type then id.
    pub fn region_keys(&self) -> &[RegionKey] {
        &self.regions
    }

    /// Id of the `region_type` region containing `index`, if any.
    pub fn get_region_for_gridpoint(&self, index: GridIndex, region_type: &str) -> Option<&str> {
        self.regions_for_gridpoint(index)
            .find(|key| key.region_type == region_type)
            .map(|key| key.region_id.as_str())
    }

    /// Every region containing `index`, one per region type at most.
    pub fn regions_for_gridpoint(&self, index: GridIndex) -> impl Iterator<Item = &RegionKey> {
        self.gridpoint_regions
            .get(&index)
            .into_iter()
            .flatten()
            .map(|&pos| &self.regions[pos])
    }

    /// Gridpoints inside one region; `None` if the region is not indexed.
    pub fn get_gridpoints_for_region(
        &self,
        region_type: &str,
        region_id: &str,
    ) -> Option<&BTreeSet<GridIndex>> {
        let pos = position(&self.regions, region_type, region_id)?;
        Some(&self.region_gridpoints[pos])
    }

    /// All region ids of a type, including regions that contain no gridpoint.
    pub fn all_regions(&self, region_type: &str) -> Vec<&str> {
        self.regions
            .iter()
            .filter(|key| key.region_type == region_type)
            .map(|key| key.region_id.as_str())
            .collect()
    }

    /// Number of gridpoints inside at least one region.
    pub fn n_indexed_gridpoints(&self) -> usize {
        self.gridpoint_regions.len()
    }
}

fn position(keys: &[RegionKey], region_type: &str, region_id: &str) -> Option<usize> {
    keys.binary_search_by(|key| {
        (key.region_type.as_str(), key.region_id.as_str()).cmp(&(region_type, region_id))
    })
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::{OverlapPolicy, Region};
    use geo::polygon;
    use ndarray::Array2;

    fn square(id: &str, lat0: f64, lat1: f64, lon0: f64, lon1: f64) -> Region {
        let poly = polygon![
            (x: lon0, y: lat0),
            (x: lon1, y: lat0),
            (x: lon1, y: lat1),
            (x: lon0, y: lat1),
            (x: lon0, y: lat0),
        ];
        Region::new(id, id, poly)
    }

    /// 6 x 4 grid at 0.5-degree spacing from (30, -100).
    fn grid() -> GridManager {
        let lats = Array2::from_shape_fn((4, 6), |(j, _)| 30.0 + 0.5 * j as f64);
        let lons = Array2::from_shape_fn((4, 6), |(_, i)| -100.0 + 0.5 * i as f64);
        GridManager::new(6, 4).unwrap().with_coordinates(lats, lons).unwrap()
    }

    fn regions() -> RegionManager {
        let mut rm = RegionManager::new();
        rm.load_regions(
            "cwa",
            [
                square("W", 29.9, 31.6, -100.1, -99.1),
                square("E", 29.9, 31.6, -98.9, -97.4),
                square("EMPTY", 50.0, 51.0, 0.0, 1.0),
            ],
        )
        .unwrap();
        rm.load_regions("rfc", [square("ALL", 0.0, 90.0, -180.0, 0.0)])
            .unwrap();
        rm
    }

    #[test]
    fn test_bidirectional_lookup() {
        let index = SpatialIndex::build_for_grid(&regions(), &grid(), None, None).unwrap();
        // i in 0..=1 -> W (lon -100, -99.5); i in 3..=5 -> E; i = 2 (lon -99) in neither
        assert_eq!(index.get_region_for_gridpoint(GridIndex::new(1, 2), "cwa"), Some("W"));
        assert_eq!(index.get_region_for_gridpoint(GridIndex::new(4, 0), "cwa"), Some("E"));
        assert_eq!(index.get_region_for_gridpoint(GridIndex::new(2, 0), "cwa"), None);
        assert_eq!(index.get_region_for_gridpoint(GridIndex::new(2, 0), "rfc"), Some("ALL"));

        let west = index.get_gridpoints_for_region("cwa", "W").unwrap();
        assert_eq!(west.len(), 8);
        assert!(west.contains(&GridIndex::new(1, 2)));
        assert_eq!(index.get_gridpoints_for_region("cwa", "E").unwrap().len(), 12);
        assert!(index.get_gridpoints_for_region("cwa", "EMPTY").unwrap().is_empty());
        assert_eq!(index.get_gridpoints_for_region("rfc", "ALL").unwrap().len(), 24);
        assert_eq!(index.all_regions("cwa"), vec!["E", "EMPTY", "W"]);
        assert_eq!(index.n_indexed_gridpoints(), 24);
    }

    #[test]
    fn test_regions_for_gridpoint_share_keys() {
        let index = SpatialIndex::build_for_grid(&regions(), &grid(), None, None).unwrap();
        let keys: Vec<&RegionKey> = index.regions_for_gridpoint(GridIndex::new(4, 1)).collect();
        assert_eq!(keys, vec![&RegionKey::new("cwa", "E"), &RegionKey::new("rfc", "ALL")]);
        assert_eq!(index.regions_for_gridpoint(GridIndex::new(40, 40)).count(), 0);

        // both lookups hand out the same stored key
        let a = index.regions_for_gridpoint(GridIndex::new(0, 0)).next().unwrap();
        let b = index.regions_for_gridpoint(GridIndex::new(1, 0)).next().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(index.region_keys().len(), 4);
    }

    #[test]
    fn test_repeated_region_type_is_indexed_once() {
        let twice = vec!["cwa".to_string(), "cwa".to_string()];
        let index = SpatialIndex::build_for_grid(&regions(), &grid(), None, Some(&twice)).unwrap();
        assert_eq!(index.region_types(), &["cwa".to_string()]);
        assert_eq!(index.regions_for_gridpoint(GridIndex::new(0, 0)).count(), 1);
        assert_eq!(index.get_gridpoints_for_region("cwa", "W").unwrap().len(), 8);
    }

    #[test]
    fn test_restricted_types_and_bbox() {
        let only_cwa = vec!["cwa".to_string()];
        let bbox = BoundingBox::new(30.0, 30.5, -100.0, -97.5).unwrap();
        let index = SpatialIndex::build_for_grid(&regions(), &grid(), Some(&bbox), Some(&only_cwa))
            .unwrap();
        assert_eq!(index.region_types(), &only_cwa);
        assert_eq!(index.get_gridpoints_for_region("cwa", "W").unwrap().len(), 4);
        assert!(index.get_gridpoints_for_region("rfc", "ALL").is_none());
        assert_eq!(index.get_region_for_gridpoint(GridIndex::new(0, 3), "cwa"), None);
    }

    #[test]
    fn test_errors_propagate() {
        let bbox = BoundingBox::new(60.0, 61.0, 0.0, 1.0).unwrap();
        assert!(matches!(
            SpatialIndex::build_for_grid(&regions(), &grid(), Some(&bbox), None),
            Err(SpatialError::BboxOutsideGrid { .. })
        ));
        assert!(matches!(
            SpatialIndex::build_for_grid(&regions(), &GridManager::new(2, 2).unwrap(), None, None),
            Err(SpatialError::CoordinatesUnavailable)
        ));
        let unknown = vec!["zone".to_string()];
        assert!(matches!(
            SpatialIndex::build_for_grid(&regions(), &grid(), None, Some(&unknown)),
            Err(SpatialError::UnknownRegionType { .. })
        ));

        let mut overlapping =
            RegionManager::new().with_overlap_policy(OverlapPolicy::ErrorOnOverlap);
        overlapping
            .load_regions(
                "cwa",
                [
                    square("A", 29.0, 32.0, -101.0, -98.0),
                    square("B", 29.0, 32.0, -99.0, -96.0),
                ],
            )
            .unwrap();
        assert!(matches!(
            SpatialIndex::build_for_grid(&overlapping, &grid(), None, None),
            Err(SpatialError::AmbiguousRegion { .. })
        ));
    }
}
