//! Latitude/longitude bounding box.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpatialError;

/// Axis-aligned lat/lon box. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidBoundingBox`] if any edge is not finite
    /// or a minimum exceeds its maximum.
    pub fn new(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, SpatialError> {
        let bbox = Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Re-checks a box built directly from its public fields (e.g. deserialised).
    pub fn validate(&self) -> Result<(), SpatialError> {
        let finite = [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(SpatialError::InvalidBoundingBox { bbox: *self });
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lat {}..{}, lon {}..{}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
