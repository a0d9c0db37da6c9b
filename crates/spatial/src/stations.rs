//! Observation stations and their nearest grid cells.

use std::collections::HashMap;

use gridver_accum::{Entity, GridIndex};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bbox::BoundingBox;
use crate::error::SpatialError;
use crate::grid::Chunk;

/// Station metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    pub station_name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub network: Option<String>,
}

impl Station {
    /// A station named after its id, without elevation or network.
    pub fn new(station_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        let station_id = station_id.into();
        Self {
            station_name: station_id.clone(),
            station_id,
            lat,
            lon,
            elevation: None,
            network: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = name.into();
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Accumulator identity for this station.
    pub fn entity(&self) -> Entity {
        Entity::Station {
            station_id: self.station_id.clone(),
            station_name: self.station_name.clone(),
            lat: self.lat,
            lon: self.lon,
            elevation: self.elevation,
            network: self.network.clone(),
        }
    }
}

/// Nearest cell of `(nj, ni)` coordinate arrays by planar lat/lon distance.
///
/// Ties go to the first cell in row-major order; cells with non-finite
/// coordinates are skipped. `None` if no cell qualifies.
pub fn nearest_gridpoint(
    lat: f64,
    lon: f64,
    lats: ArrayView2<'_, f64>,
    lons: ArrayView2<'_, f64>,
) -> Option<GridIndex> {
    let mut best: Option<(f64, GridIndex)> = None;
    for ((j, i), &glat) in lats.indexed_iter() {
        let glon = lons[(j, i)];
        let d2 = (glat - lat).powi(2) + (glon - lon).powi(2);
        if !d2.is_finite() {
            continue;
        }
        if best.is_none_or(|(b, _)| d2 < b) {
            best = Some((d2, GridIndex::new(i, j)));
        }
    }
    best.map(|(_, index)| index)
}

/// Station list with a station-to-gridpoint mapping.
#[derive(Debug, Clone, Default)]
pub struct StationManager {
    stations: Vec<Station>,
    by_id: HashMap<String, usize>,
    nearest: HashMap<String, GridIndex>,
}

impl StationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the station list. Any previous grid mapping is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::DuplicateStation`] if two stations share an
    /// id; the manager is left unchanged in that case.
    pub fn load_stations(
        &mut self,
        stations: impl IntoIterator<Item = Station>,
    ) -> Result<usize, SpatialError> {
        let stations: Vec<Station> = stations.into_iter().collect();
        let mut by_id = HashMap::with_capacity(stations.len());
        for (pos, station) in stations.iter().enumerate() {
            if by_id.insert(station.station_id.clone(), pos).is_some() {
                return Err(SpatialError::DuplicateStation {
                    station_id: station.station_id.clone(),
                });
            }
        }
        info!(n_stations = stations.len(), "loaded stations");
        self.stations = stations;
        self.by_id = by_id;
        self.nearest.clear();
        Ok(self.stations.len())
    }

    /// Maps every station to its nearest grid cell.
    ///
    /// Returns the number of stations mapped; stations for which no cell
    /// has finite coordinates stay unmapped.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CoordinateShape`] if the arrays differ in shape.
    #[tracing::instrument(skip_all, fields(n_stations = self.stations.len()))]
    pub fn map_to_grid(
        &mut self,
        lats: ArrayView2<'_, f64>,
        lons: ArrayView2<'_, f64>,
    ) -> Result<usize, SpatialError> {
        if lats.dim() != lons.dim() {
            return Err(SpatialError::CoordinateShape {
                name: "longitude",
                expected: lats.dim(),
                got: lons.dim(),
            });
        }
        self.nearest = self
            .stations
            .par_iter()
            .filter_map(|s| {
                nearest_gridpoint(s.lat, s.lon, lats, lons).map(|idx| (s.station_id.clone(), idx))
            })
            .collect();
        info!(n_mapped = self.nearest.len(), "mapped stations to gridpoints");
        Ok(self.nearest.len())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, station_id: &str) -> Option<&Station> {
        self.by_id.get(station_id).map(|&pos| &self.stations[pos])
    }

    pub fn get_nearest_gridpoint(&self, station_id: &str) -> Option<GridIndex> {
        self.nearest.get(station_id).copied()
    }

    pub fn stations_in_bbox(&self, bbox: &BoundingBox) -> Vec<&Station> {
        self.stations
            .iter()
            .filter(|s| bbox.contains(s.lat, s.lon))
            .collect()
    }

    pub fn filter_by_network(&self, network: &str) -> Vec<&Station> {
        self.stations
            .iter()
            .filter(|s| s.network.as_deref() == Some(network))
            .collect()
    }

    /// Mapped stations whose nearest cell lies inside `chunk`, in load order.
    pub fn stations_in_chunk(&self, chunk: &Chunk) -> Vec<(&Station, GridIndex)> {
        self.stations
            .iter()
            .filter_map(|s| {
                let idx = self.nearest.get(&s.station_id)?;
                chunk.contains(*idx).then_some((s, *idx))
            })
            .collect()
    }
}
