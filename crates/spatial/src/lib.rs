//! Grid chunking, region polygons and station mapping.
//!
//! [`GridManager`] partitions an `ni x nj` grid into row-major rectangular
//! [`Chunk`]s, optionally restricted to a [`BoundingBox`]. [`RegionManager`]
//! holds named polygons per region type and answers point-in-region queries;
//! [`SpatialIndex`] runs those queries once over the whole grid and caches
//! both directions of the gridpoint-region mapping. [`StationManager`] maps
//! stations to their nearest grid cell.

mod bbox;
mod error;
pub mod grid;
pub mod index;
pub mod regions;
pub mod stations;

pub use bbox::BoundingBox;
pub use error::SpatialError;
pub use grid::{Chunk, DEFAULT_CHUNK_SIZE, GridInfo, GridManager};
pub use index::SpatialIndex;
pub use regions::{OverlapPolicy, Region, RegionInfo, RegionManager};
pub use stations::{Station, StationManager, nearest_gridpoint};
