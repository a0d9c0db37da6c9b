//! Error types for the gridver-spatial crate.

use crate::bbox::BoundingBox;

/// Error type for all fallible operations in the gridver-spatial crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    /// Returned when a grid is declared with a zero dimension.
    #[error("grid dimensions must be positive, got ni={ni}, nj={nj}")]
    InvalidGridSize { ni: usize, nj: usize },

    /// Returned when a chunk size has a zero dimension.
    #[error("chunk size must be positive, got ({chunk_i}, {chunk_j})")]
    InvalidChunkSize { chunk_i: usize, chunk_j: usize },

    /// Returned when a bounding box is inverted or not finite.
    #[error("invalid bounding box {bbox}")]
    InvalidBoundingBox { bbox: BoundingBox },

    /// Returned when an operation needs grid coordinates that were never set.
    #[error("grid coordinates are not available")]
    CoordinatesUnavailable,

    /// Returned when a coordinate array does not match the grid shape.
    #[error("{name} array has shape {got:?}, expected {expected:?} (nj, ni)")]
    CoordinateShape {
        /// Which array was rejected.
        name: &'static str,
        /// Required `(nj, ni)` shape.
        expected: (usize, usize),
        /// Shape that was supplied.
        got: (usize, usize),
    },

    /// Returned when no grid cell lies inside the requested bounding box.
    #[error("bounding box {bbox} does not intersect the grid")]
    BboxOutsideGrid { bbox: BoundingBox },

    /// Returned when a region type is queried before being loaded.
    #[error("region type '{region_type}' is not loaded")]
    UnknownRegionType { region_type: String },

    /// Returned when two regions of one type share an id.
    #[error("duplicate region id '{region_id}' in region type '{region_type}'")]
    DuplicateRegion {
        region_type: String,
        region_id: String,
    },

    /// Returned under the error-on-overlap policy when a point lies in more
    /// than one region of a type.
    #[error(
        "point ({lat}, {lon}) lies in several '{region_type}' regions: {}",
        region_ids.join(", ")
    )]
    AmbiguousRegion {
        region_type: String,
        lat: f64,
        lon: f64,
        /// Ids of every matching region, in declaration order.
        region_ids: Vec<String>,
    },

    /// Returned when two stations share an id.
    #[error("duplicate station id '{station_id}'")]
    DuplicateStation { station_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_chunk_size() {
        let err = SpatialError::InvalidChunkSize {
            chunk_i: 0,
            chunk_j: 100,
        };
        assert_eq!(err.to_string(), "chunk size must be positive, got (0, 100)");
    }

    #[test]
    fn display_coordinate_shape() {
        let err = SpatialError::CoordinateShape {
            name: "latitude",
            expected: (3, 4),
            got: (4, 3),
        };
        assert_eq!(
            err.to_string(),
            "latitude array has shape (4, 3), expected (3, 4) (nj, ni)"
        );
    }

    #[test]
    fn display_bbox_outside_grid() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let err = SpatialError::BboxOutsideGrid { bbox };
        assert_eq!(
            err.to_string(),
            "bounding box [lat 10..20, lon 30..40] does not intersect the grid"
        );
    }

    #[test]
    fn display_ambiguous_region() {
        let err = SpatialError::AmbiguousRegion {
            region_type: "zone".to_string(),
            lat: 41.5,
            lon: -88.0,
            region_ids: vec!["ILZ013".to_string(), "ILZ014".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "point (41.5, -88) lies in several 'zone' regions: ILZ013, ILZ014"
        );
    }

    #[test]
    fn display_unknown_region_type() {
        let err = SpatialError::UnknownRegionType {
            region_type: "rfc".to_string(),
        };
        assert_eq!(err.to_string(), "region type 'rfc' is not loaded");
    }

    #[test]
    fn display_duplicates() {
        let err = SpatialError::DuplicateRegion {
            region_type: "cwa".to_string(),
            region_id: "LOT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate region id 'LOT' in region type 'cwa'"
        );
        let err = SpatialError::DuplicateStation {
            station_id: "KORD".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate station id 'KORD'");
    }

    #[test]
    fn error_is_send_sync_and_std_error() {
        fn assert_bounds<T: Send + Sync + std::error::Error>() {}
        assert_bounds::<SpatialError>();
    }
}
