//! Input contracts: gridded field readers and station observation sources.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use gridver_spatial::{Chunk, SpatialError};
use gridver_temporal::TimeEntry;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// A 2-D field with matching latitude/longitude arrays, shape `(nj, ni)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    values: Array2<f64>,
    lats: Array2<f64>,
    lons: Array2<f64>,
    units: Option<String>,
}

impl Field {
    /// # Errors
    ///
    /// Returns [`SpatialError::CoordinateShape`] if either coordinate array
    /// differs in shape from `values`.
    pub fn new(
        values: Array2<f64>,
        lats: Array2<f64>,
        lons: Array2<f64>,
    ) -> Result<Self, SpatialError> {
        for (name, coord) in [("latitude", &lats), ("longitude", &lons)] {
            if coord.dim() != values.dim() {
                return Err(SpatialError::CoordinateShape {
                    name,
                    expected: values.dim(),
                    got: coord.dim(),
                });
            }
        }
        Ok(Self {
            values,
            lats,
            lons,
            units: None,
        })
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn lats(&self) -> ArrayView2<'_, f64> {
        self.lats.view()
    }

    pub fn lons(&self) -> ArrayView2<'_, f64> {
        self.lons.view()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// `(nj, ni)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// What a [`FieldReader`] is asked for.
///
/// Forecast readers key on the entry's init date, init hour and lead;
/// reference readers key on its valid time.
#[derive(Debug, Clone, Copy)]
pub struct FieldRequest<'a> {
    pub time: &'a TimeEntry,
    pub variable: &'a str,
    /// Index window to read; `None` for the whole grid.
    pub window: Option<Chunk>,
}

/// Source of gridded forecast or reference fields.
///
/// Returns `None` for anything it cannot provide, including windows outside
/// its domain and fetch failures or timeouts. Implementations must be
/// shareable across the worker pool.
pub trait FieldReader: Sync {
    fn read_field(&self, request: &FieldRequest<'_>) -> Option<Field>;
}

impl<R: FieldReader + ?Sized> FieldReader for &R {
    fn read_field(&self, request: &FieldRequest<'_>) -> Option<Field> {
        (**self).read_field(request)
    }
}

/// One observed value at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationObservation {
    pub station_id: String,
    pub value: f64,
}

/// Source of point observations at a valid time.
pub trait ObservationSource: Sync {
    /// Observations for `station_ids` at `valid_time`. Stations without a
    /// report are simply absent from the result.
    fn observations(
        &self,
        valid_time: NaiveDateTime,
        variable: &str,
        station_ids: &[&str],
    ) -> Vec<StationObservation>;
}

impl<S: ObservationSource + ?Sized> ObservationSource for &S {
    fn observations(
        &self,
        valid_time: NaiveDateTime,
        variable: &str,
        station_ids: &[&str],
    ) -> Vec<StationObservation> {
        (**self).observations(valid_time, variable, station_ids)
    }
}

/// Indexes observations by station id; later duplicates win.
pub(crate) fn observations_by_station(
    observations: Vec<StationObservation>,
) -> HashMap<String, f64> {
    observations
        .into_iter()
        .map(|o| (o.station_id, o.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_shape_checks() {
        let values = Array2::zeros((2, 3));
        let ok = Field::new(values.clone(), Array2::zeros((2, 3)), Array2::zeros((2, 3))).unwrap();
        assert_eq!(ok.shape(), (2, 3));
        assert_eq!(ok.units(), None);
        assert_eq!(ok.with_units("K").units(), Some("K"));

        let err = Field::new(values, Array2::zeros((2, 3)), Array2::zeros((3, 2))).unwrap_err();
        assert_eq!(
            err,
            SpatialError::CoordinateShape {
                name: "longitude",
                expected: (2, 3),
                got: (3, 2),
            }
        );
    }

    #[test]
    fn test_observations_by_station() {
        let map = observations_by_station(vec![
            StationObservation {
                station_id: "A".to_string(),
                value: 1.0,
            },
            StationObservation {
                station_id: "A".to_string(),
                value: 2.0,
            },
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["A"], 2.0);
    }
}
