//! Named region polygons grouped by region type.

use std::collections::{BTreeMap, HashSet};

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use gridver_accum::RegionKey;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SpatialError;

/// How a point inside several regions of one type is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The first region in declaration order wins.
    #[default]
    FirstMatch,
    /// Overlaps are reported as [`SpatialError::AmbiguousRegion`].
    ErrorOnOverlap,
}

/// One named polygon (or multipolygon) boundary.
///
/// Coordinates are `x = lon`, `y = lat`.
#[derive(Debug, Clone)]
pub struct Region {
    id: String,
    name: String,
    boundary: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl Region {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        boundary: impl Into<MultiPolygon<f64>>,
    ) -> Self {
        let boundary = boundary.into();
        let bounds = boundary.bounding_rect();
        Self {
            id: id.into(),
            name: name.into(),
            boundary,
            bounds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    /// `true` if the point is inside the boundary or on it.
    pub fn covers(&self, lat: f64, lon: f64) -> bool {
        if !lat.is_finite() || !lon.is_finite() {
            return false;
        }
        let Some(bounds) = self.bounds else {
            return false;
        };
        let (min, max) = (bounds.min(), bounds.max());
        if lon < min.x || lon > max.x || lat < min.y || lat > max.y {
            return false;
        }
        self.boundary.coordinate_position(&Coord { x: lon, y: lat }) != CoordPos::Outside
    }
}

/// Identity of a loaded region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionInfo {
    pub region_type: String,
    pub region_id: String,
    pub region_name: String,
}

impl RegionInfo {
    pub fn key(&self) -> RegionKey {
        RegionKey::new(self.region_type.clone(), self.region_id.clone())
    }
}

/// Region sets keyed by region type (e.g. `"cwa"`, `"rfc"`, `"zone"`).
#[derive(Debug, Clone, Default)]
pub struct RegionManager {
    regions: BTreeMap<String, Vec<Region>>,
    region_types: Vec<String>,
    overlap_policy: OverlapPolicy,
}

impl RegionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    /// Loads (or replaces) the regions of one type, keeping their order.
    ///
    /// Returns the number of regions loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::DuplicateRegion`] if two regions share an id;
    /// nothing is loaded in that case.
    pub fn load_regions(
        &mut self,
        region_type: impl Into<String>,
        regions: impl IntoIterator<Item = Region>,
    ) -> Result<usize, SpatialError> {
        let region_type = region_type.into();
        let regions: Vec<Region> = regions.into_iter().collect();

        let mut seen = HashSet::with_capacity(regions.len());
        for region in &regions {
            if !seen.insert(region.id.as_str()) {
                return Err(SpatialError::DuplicateRegion {
                    region_type,
                    region_id: region.id.clone(),
                });
            }
        }

        let n = regions.len();
        info!(region_type = %region_type, n_regions = n, "loaded regions");
        if !self.region_types.contains(&region_type) {
            self.region_types.push(region_type.clone());
        }
        self.regions.insert(region_type, regions);
        Ok(n)
    }

    /// Region types in load order.
    pub fn loaded_region_types(&self) -> &[String] {
        &self.region_types
    }

    /// Regions of one type in declaration order.
    pub fn regions(&self, region_type: &str) -> Result<&[Region], SpatialError> {
        self.regions
            .get(region_type)
            .map(Vec::as_slice)
            .ok_or_else(|| SpatialError::UnknownRegionType {
                region_type: region_type.to_string(),
            })
    }

    pub fn list_regions(&self, region_type: &str) -> Result<Vec<RegionInfo>, SpatialError> {
        Ok(self
            .regions(region_type)?
            .iter()
            .map(|r| info_for(region_type, r))
            .collect())
    }

    /// The region of `region_type` containing the point, if any.
    ///
    /// Boundary points count as inside. Overlaps are resolved by the
    /// manager's [`OverlapPolicy`].
    ///
    /// # Errors
    ///
    /// [`SpatialError::UnknownRegionType`] if the type is not loaded;
    /// [`SpatialError::AmbiguousRegion`] under
    /// [`OverlapPolicy::ErrorOnOverlap`] when several regions match.
    pub fn get_region_for_point(
        &self,
        lat: f64,
        lon: f64,
        region_type: &str,
    ) -> Result<Option<&Region>, SpatialError> {
        let regions = self.regions(region_type)?;
        let mut matches = regions.iter().filter(|r| r.covers(lat, lon));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if self.overlap_policy == OverlapPolicy::ErrorOnOverlap
            && let Some(second) = matches.next()
        {
            let mut region_ids = vec![first.id.clone(), second.id.clone()];
            region_ids.extend(matches.map(|r| r.id.clone()));
            return Err(SpatialError::AmbiguousRegion {
                region_type: region_type.to_string(),
                lat,
                lon,
                region_ids,
            });
        }
        Ok(Some(first))
    }

    /// Like [`get_region_for_point`](Self::get_region_for_point) but
    /// returns an owned [`RegionInfo`].
    pub fn region_info_for_point(
        &self,
        lat: f64,
        lon: f64,
        region_type: &str,
    ) -> Result<Option<RegionInfo>, SpatialError> {
        Ok(self
            .get_region_for_point(lat, lon, region_type)?
            .map(|r| info_for(region_type, r)))
    }

    /// Region id for every point of two equally shaped coordinate arrays.
    ///
    /// # Errors
    ///
    /// [`SpatialError::CoordinateShape`] if the shapes differ, plus the
    /// errors of [`get_region_for_point`](Self::get_region_for_point).
    pub fn get_regions_for_points(
        &self,
        lats: ArrayView2<'_, f64>,
        lons: ArrayView2<'_, f64>,
        region_type: &str,
    ) -> Result<Array2<Option<String>>, SpatialError> {
        if lats.dim() != lons.dim() {
            return Err(SpatialError::CoordinateShape {
                name: "longitude",
                expected: lats.dim(),
                got: lons.dim(),
            });
        }
        let mut out = Array2::from_elem(lats.dim(), None);
        for (pos, &lat) in lats.indexed_iter() {
            out[pos] = self
                .get_region_for_point(lat, lons[pos], region_type)?
                .map(|r| r.id.clone());
        }
        Ok(out)
    }
}

fn info_for(region_type: &str, region: &Region) -> RegionInfo {
    RegionInfo {
        region_type: region_type.to_string(),
        region_id: region.id.clone(),
        region_name: region.name.clone(),
    }
}
