use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level Gridver configuration (`gridver.toml`).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridverConfig {
    /// Grid dimensions, chunking and optional coordinates.
    pub grid: GridToml,

    /// Verification period and hour groups.
    pub temporal: TemporalToml,

    /// Memory ceiling for chunk sizing.
    #[serde(default)]
    pub memory: MemoryToml,

    /// Variable, thresholds and requested metrics.
    pub verification: VerificationToml,

    /// Minimum sample counts.
    #[serde(default)]
    pub completeness: CompletenessToml,
}

impl GridverConfig {
    /// Reads and parses a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&toml_str).context("failed to parse TOML config")
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridToml {
    pub ni: usize,
    pub nj: usize,
    #[serde(default = "default_chunk_dim")]
    pub chunk_i: usize,
    #[serde(default = "default_chunk_dim")]
    pub chunk_j: usize,
    /// Regular lat/lon coordinates; required when `bbox` is set.
    #[serde(default)]
    pub coordinates: Option<RegularCoordinatesToml>,
    #[serde(default)]
    pub bbox: Option<BboxToml>,
}

fn default_chunk_dim() -> usize {
    gridver_spatial::DEFAULT_CHUNK_SIZE
}

/// Cell `(j, i)` sits at `lat_start + j * lat_step`, `lon_start + i * lon_step`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegularCoordinatesToml {
    pub lat_start: f64,
    pub lat_step: f64,
    pub lon_start: f64,
    pub lon_step: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BboxToml {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemporalToml {
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_init_groups")]
    pub init_groups: Vec<HourGroupToml>,
    pub fhour_groups: Vec<HourGroupToml>,
}

fn default_init_groups() -> Vec<HourGroupToml> {
    vec![HourGroupToml {
        id: "00Z".to_string(),
        hours: vec![0],
    }]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourGroupToml {
    pub id: String,
    pub hours: Vec<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryToml {
    #[serde(default = "default_max_chunk_memory_mb")]
    pub max_chunk_memory_mb: f64,
    #[serde(default = "default_num_variables")]
    pub num_variables: usize,
}

impl Default for MemoryToml {
    fn default() -> Self {
        Self {
            max_chunk_memory_mb: default_max_chunk_memory_mb(),
            num_variables: default_num_variables(),
        }
    }
}

fn default_max_chunk_memory_mb() -> f64 {
    1000.0
}
fn default_num_variables() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationToml {
    pub variable: String,
    #[serde(default)]
    pub thresholds: Vec<f64>,
    /// Metric names to report; empty means all.
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletenessToml {
    #[serde(default = "default_min_gridpoint_samples")]
    pub min_gridpoint_samples: u64,
    #[serde(default = "default_min_region_samples")]
    pub min_region_samples: u64,
    #[serde(default = "default_min_station_samples")]
    pub min_station_samples: u64,
}

impl Default for CompletenessToml {
    fn default() -> Self {
        Self {
            min_gridpoint_samples: default_min_gridpoint_samples(),
            min_region_samples: default_min_region_samples(),
            min_station_samples: default_min_station_samples(),
        }
    }
}

fn default_min_gridpoint_samples() -> u64 {
    5
}
fn default_min_region_samples() -> u64 {
    50
}
fn default_min_station_samples() -> u64 {
    10
}
