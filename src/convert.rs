//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};
use ndarray::Array2;

use gridver_metrics::{CompletenessConfig, MetricsCalculator};
use gridver_spatial::{BoundingBox, GridManager};
use gridver_temporal::{HourGroup, TimeManager, parse_date};
use gridver_workflow::ChunkingConfig;

use crate::config::*;

/// Builds a [`GridManager`] with chunk size and, when configured, regular
/// lat/lon coordinates.
pub fn build_grid(grid: &GridToml) -> Result<GridManager> {
    let mut manager =
        GridManager::new(grid.ni, grid.nj)?.with_chunk_size(grid.chunk_i, grid.chunk_j)?;
    if let Some(coords) = &grid.coordinates {
        let (lats, lons) = regular_coordinates(grid.ni, grid.nj, coords)?;
        manager.set_coordinates(lats, lons)?;
    }
    Ok(manager)
}

/// Latitude and longitude arrays of shape `(nj, ni)` for a regular grid.
pub fn regular_coordinates(
    ni: usize,
    nj: usize,
    coords: &RegularCoordinatesToml,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let values = [coords.lat_start, coords.lat_step, coords.lon_start, coords.lon_step];
    if values.iter().any(|v| !v.is_finite()) {
        bail!("grid coordinates must be finite, got {coords:?}");
    }
    let lats =
        Array2::from_shape_fn((nj, ni), |(j, _)| coords.lat_start + j as f64 * coords.lat_step);
    let lons =
        Array2::from_shape_fn((nj, ni), |(_, i)| coords.lon_start + i as f64 * coords.lon_step);
    Ok((lats, lons))
}

pub fn build_bbox(bbox: &BboxToml) -> Result<BoundingBox> {
    BoundingBox::new(bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon)
        .context("invalid [grid.bbox]")
}

fn build_hour_groups(groups: &[HourGroupToml]) -> Vec<HourGroup> {
    groups
        .iter()
        .map(|g| HourGroup::new(&g.id, g.hours.iter().copied()))
        .collect()
}

/// Builds a [`TimeManager`] from the `[temporal]` section.
pub fn build_time_manager(temporal: &TemporalToml) -> Result<TimeManager> {
    let start = parse_date(&temporal.start_date).context("invalid [temporal].start_date")?;
    let end = parse_date(&temporal.end_date).context("invalid [temporal].end_date")?;
    let manager = TimeManager::new(
        start,
        end,
        build_hour_groups(&temporal.init_groups),
        build_hour_groups(&temporal.fhour_groups),
    )?;
    Ok(manager)
}

pub fn build_chunking_config(memory: &MemoryToml) -> ChunkingConfig {
    ChunkingConfig::default()
        .with_max_chunk_memory_mb(memory.max_chunk_memory_mb)
        .with_num_variables(memory.num_variables)
}

/// Metric calculator for the requested names; all metrics when none are listed.
pub fn build_calculator(verification: &VerificationToml) -> Result<MetricsCalculator> {
    if verification.metrics.is_empty() {
        return Ok(MetricsCalculator::new());
    }
    MetricsCalculator::from_names(&verification.metrics).context("invalid [verification].metrics")
}

pub fn build_completeness_config(completeness: &CompletenessToml) -> Result<CompletenessConfig> {
    let config = CompletenessConfig::default()
        .with_min_gridpoint_samples(completeness.min_gridpoint_samples)
        .with_min_region_samples(completeness.min_region_samples)
        .with_min_station_samples(completeness.min_station_samples);
    config.validate().context("invalid [completeness]")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridver_metrics::MetricKind;

    fn grid_toml(coordinates: Option<RegularCoordinatesToml>) -> GridToml {
        GridToml {
            ni: 4,
            nj: 3,
            chunk_i: 2,
            chunk_j: 2,
            coordinates,
            bbox: None,
        }
    }

    #[test]
    fn test_build_grid_with_coordinates() {
        let grid = build_grid(&grid_toml(Some(RegularCoordinatesToml {
            lat_start: 30.0,
            lat_step: 0.5,
            lon_start: -100.0,
            lon_step: 0.25,
        })))
        .unwrap();
        assert_eq!(grid.chunk_size(), (2, 2));
        let (lats, lons) = grid.coordinates().unwrap();
        assert_eq!(lats.dim(), (3, 4));
        assert_eq!(lats[(2, 0)], 31.0);
        assert_eq!(lons[(0, 3)], -99.25);
    }

    #[test]
    fn test_build_grid_without_coordinates() {
        let grid = build_grid(&grid_toml(None)).unwrap();
        assert!(!grid.has_coordinates());
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() {
        let coords = RegularCoordinatesToml {
            lat_start: f64::NAN,
            lat_step: 0.5,
            lon_start: 0.0,
            lon_step: 0.5,
        };
        assert!(regular_coordinates(2, 2, &coords).is_err());
    }

    #[test]
    fn test_inverted_bbox_is_rejected() {
        let bbox = BboxToml {
            min_lat: 40.0,
            max_lat: 30.0,
            min_lon: -100.0,
            max_lon: -90.0,
        };
        let err = build_bbox(&bbox).unwrap_err();
        assert!(format!("{err:#}").starts_with("invalid [grid.bbox]"));
    }

    #[test]
    fn test_build_time_manager() {
        let temporal = TemporalToml {
            start_date: "2024-02-28".to_string(),
            end_date: "2024-03-01".to_string(),
            init_groups: vec![HourGroupToml {
                id: "00Z".to_string(),
                hours: vec![0, 12],
            }],
            fhour_groups: vec![HourGroupToml {
                id: "day1".to_string(),
                hours: vec![24],
            }],
        };
        let time = build_time_manager(&temporal).unwrap();
        assert_eq!(time.date_range().len(), 3);
        assert_eq!(time.n_times(), 6);

        let bad = TemporalToml {
            start_date: "2024-13-01".to_string(),
            ..temporal
        };
        let err = build_time_manager(&bad).unwrap_err();
        assert!(format!("{err:#}").starts_with("invalid [temporal].start_date"));
    }

    #[test]
    fn test_build_calculator() {
        let mut verification = VerificationToml {
            variable: "TMP".to_string(),
            thresholds: vec![],
            metrics: vec![],
        };
        assert!(build_calculator(&verification).unwrap().requested().is_none());

        verification.metrics = vec!["mae".to_string(), "csi".to_string()];
        let calc = build_calculator(&verification).unwrap();
        assert!(calc.wants(MetricKind::Mae));
        assert!(!calc.wants(MetricKind::Rmse));

        verification.metrics = vec!["skill".to_string()];
        assert!(build_calculator(&verification).is_err());
    }

    #[test]
    fn test_zero_minimum_is_rejected() {
        let completeness = CompletenessToml {
            min_region_samples: 0,
            ..CompletenessToml::default()
        };
        assert!(build_completeness_config(&completeness).is_err());
        let ok = build_completeness_config(&CompletenessToml::default()).unwrap();
        assert_eq!(ok.min_station_samples(), 10);
    }
}
