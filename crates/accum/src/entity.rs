//! Verification entity identity: gridpoints, regions and stations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer `(i, j)` index of a grid cell. `i` runs along a row, `j` across rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridIndex {
    pub i: usize,
    pub j: usize,
}

impl GridIndex {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// `(region_type, region_id)` pair, e.g. `("forecast-zone", "LOT")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionKey {
    pub region_type: String,
    pub region_id: String,
}

impl RegionKey {
    pub fn new(region_type: impl Into<String>, region_id: impl Into<String>) -> Self {
        Self {
            region_type: region_type.into(),
            region_id: region_id.into(),
        }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region_type, self.region_id)
    }
}

/// The three shapes of verification entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gridpoint,
    Region,
    Station,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Gridpoint => "gridpoint",
            EntityKind::Region => "region",
            EntityKind::Station => "station",
        };
        f.write_str(name)
    }
}

/// Identity of the entity an accumulator belongs to.
///
/// Only the key fields (`index`, `(region_type, region_id)`, `station_id`)
/// take part in equality checks during merges; coordinates, names and
/// station metadata are informational and may be NaN. All fields are fixed
/// at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Gridpoint {
        index: GridIndex,
        #[serde(with = "crate::nonfinite")]
        lat: f64,
        #[serde(with = "crate::nonfinite")]
        lon: f64,
    },
    Region {
        key: RegionKey,
        region_name: String,
    },
    Station {
        station_id: String,
        station_name: String,
        #[serde(with = "crate::nonfinite")]
        lat: f64,
        #[serde(with = "crate::nonfinite")]
        lon: f64,
        #[serde(with = "crate::nonfinite::option", default)]
        elevation: Option<f64>,
        network: Option<String>,
    },
}

impl Entity {
    /// Gridpoint identity at `index` with informational coordinates.
    pub fn gridpoint(index: GridIndex, lat: f64, lon: f64) -> Self {
        Entity::Gridpoint { index, lat, lon }
    }

    /// Region identity.
    pub fn region(key: RegionKey, region_name: impl Into<String>) -> Self {
        Entity::Region {
            key,
            region_name: region_name.into(),
        }
    }

    /// Station identity without elevation or network metadata.
    pub fn station(station_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        let station_id = station_id.into();
        Entity::Station {
            station_name: station_id.clone(),
            station_id,
            lat,
            lon,
            elevation: None,
            network: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Gridpoint { .. } => EntityKind::Gridpoint,
            Entity::Region { .. } => EntityKind::Region,
            Entity::Station { .. } => EntityKind::Station,
        }
    }

    /// Returns `true` if both identities share a kind and a key.
    pub fn same_entity(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Gridpoint { index: a, .. }, Entity::Gridpoint { index: b, .. }) => a == b,
            (Entity::Region { key: a, .. }, Entity::Region { key: b, .. }) => a == b,
            (
                Entity::Station { station_id: a, .. },
                Entity::Station { station_id: b, .. },
            ) => a == b,
            _ => false,
        }
    }

    /// Human-readable identity key, used in logs and error messages.
    pub fn key_string(&self) -> String {
        match self {
            Entity::Gridpoint { index, .. } => index.to_string(),
            Entity::Region { key, .. } => key.to_string(),
            Entity::Station { station_id, .. } => station_id.clone(),
        }
    }
}
