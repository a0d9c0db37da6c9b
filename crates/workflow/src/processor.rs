//! Folding one chunk of paired fields into accumulators.

use std::fmt;

use gridver_accum::is_missing;
use gridver_spatial::{Chunk, SpatialIndex, StationManager};
use gridver_temporal::TimeEntry;
use serde::Serialize;
use tracing::{debug, warn};

use crate::pass::{GridpointMap, PassAccumulators, RegionalMap, StationMap, gridpoint_entry};
use crate::quality::{FieldQuality, QualityChecks, UnitsMismatch, check_field, check_units};
use crate::reader::{Field, FieldReader, FieldRequest, ObservationSource, observations_by_station};
use crate::warnings::WarningCategory;

/// Which of the two paired fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Forecast,
    Reference,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Forecast => f.write_str("forecast"),
            FieldRole::Reference => f.write_str("reference"),
        }
    }
}

/// Why a chunk contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Unavailable {
        role: FieldRole,
    },
    ShapeMismatch {
        forecast: (usize, usize),
        reference: (usize, usize),
    },
    /// The fields do not match the requested chunk window.
    WindowMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    AllMissing {
        role: FieldRole,
    },
}

impl SkipReason {
    pub fn category(&self) -> WarningCategory {
        match self {
            SkipReason::Unavailable { .. } => WarningCategory::FileAvailability,
            _ => WarningCategory::DataQuality,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unavailable { role } => write!(f, "{role} field not available"),
            SkipReason::ShapeMismatch {
                forecast,
                reference,
            } => write!(
                f,
                "shape mismatch: forecast {forecast:?} vs reference {reference:?}"
            ),
            SkipReason::WindowMismatch { expected, got } => {
                write!(f, "field shape {got:?} does not match chunk shape {expected:?}")
            }
            SkipReason::AllMissing { role } => write!(f, "{role} field is entirely missing"),
        }
    }
}

/// A quality problem that did not prevent processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    Field {
        role: FieldRole,
        quality: FieldQuality,
    },
    /// Forecast and reference look like they are in different units.
    Units { mismatch: UnitsMismatch },
}

impl QualityIssue {
    pub fn category(&self) -> WarningCategory {
        WarningCategory::DataQuality
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::Field { role, quality } => {
                let mut problems = Vec::new();
                if quality.has_infinite {
                    problems.push("infinite values".to_string());
                }
                if quality.out_of_range {
                    problems.push("values outside expected range".to_string());
                }
                if quality.n_outliers > 0 {
                    problems.push(format!("{} outliers", quality.n_outliers));
                }
                write!(f, "{role} field has {}", problems.join(" and "))
            }
            QualityIssue::Units { mismatch } => {
                write!(f, "possible unit mismatch")?;
                if mismatch.declared_differ()
                    && let (Some(fc), Some(rf)) =
                        (&mismatch.forecast_units, &mismatch.reference_units)
                {
                    write!(f, ": forecast in {fc}, reference in {rf}")?;
                }
                if mismatch.scale_suspect()
                    && let Some(ratio) = mismatch.scale_ratio
                {
                    write!(f, " (forecast/reference scale ratio {ratio:.3})")?;
                }
                Ok(())
            }
        }
    }
}

/// Result of processing one chunk at one time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Processed {
        /// Valid gridpoint pairs folded in.
        n_pairs: usize,
        n_station_pairs: usize,
        issues: Vec<QualityIssue>,
    },
    Skipped {
        reason: SkipReason,
    },
    /// The reference was unusable, so nothing gridded was folded, but the
    /// forecast was still paired with station observations.
    StationsOnly {
        reason: SkipReason,
        n_station_pairs: usize,
    },
}

impl ChunkOutcome {
    /// `true` when the gridded fold did not happen.
    pub fn is_skipped(&self) -> bool {
        matches!(self, ChunkOutcome::Skipped { .. } | ChunkOutcome::StationsOnly { .. })
    }
}

/// Reads paired forecast and reference windows and folds them into
/// gridpoint, regional and station accumulators.
///
/// Absent, mismatched or entirely missing fields skip the chunk with a
/// warning; no accumulator is touched in that case.
#[derive(Clone, Copy)]
pub struct ChunkProcessor<'a> {
    forecast: &'a dyn FieldReader,
    reference: &'a dyn FieldReader,
    spatial_index: Option<&'a SpatialIndex>,
    stations: Option<(&'a StationManager, &'a dyn ObservationSource)>,
    checks: QualityChecks,
}

impl fmt::Debug for ChunkProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkProcessor")
            .field("has_spatial_index", &self.spatial_index.is_some())
            .field("has_stations", &self.stations.is_some())
            .field("checks", &self.checks)
            .finish()
    }
}

impl<'a> ChunkProcessor<'a> {
    pub fn new(forecast: &'a dyn FieldReader, reference: &'a dyn FieldReader) -> Self {
        Self {
            forecast,
            reference,
            spatial_index: None,
            stations: None,
            checks: QualityChecks::default(),
        }
    }

    /// Enables regional accumulation.
    pub fn with_spatial_index(mut self, index: &'a SpatialIndex) -> Self {
        self.spatial_index = Some(index);
        self
    }

    /// Enables station verification. Stations must already be mapped to the grid.
    pub fn with_stations(
        mut self,
        stations: &'a StationManager,
        observations: &'a dyn ObservationSource,
    ) -> Self {
        self.stations = Some((stations, observations));
        self
    }

    /// Flags (but still processes) fields with finite values outside `[lo, hi]`.
    pub fn with_expected_range(mut self, lo: f64, hi: f64) -> Self {
        self.checks.expected_range = Some((lo, hi));
        self
    }

    /// Flags (but still processes) fields with values more than `k`
    /// standard deviations from their mean.
    pub fn with_outlier_sigma(mut self, k: f64) -> Self {
        self.checks.outlier_sigma = Some(k);
        self
    }

    pub fn spatial_index(&self) -> Option<&'a SpatialIndex> {
        self.spatial_index
    }

    /// Folds one chunk at one time into gridpoint and, when both an index
    /// and a regional map are given, regional accumulators.
    pub fn process_chunk(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
        thresholds: &[f64],
        gridpoints: &mut GridpointMap,
        regions: Option<&mut RegionalMap>,
    ) -> ChunkOutcome {
        let (forecast, reference, issues) = match self.read_pair(chunk, time, variable) {
            Ok(fields) => fields,
            Err(reason) => return self.skip(chunk, time, reason),
        };
        let n_pairs =
            self.fold_fields(chunk, &forecast, &reference, thresholds, gridpoints, regions);
        debug!(
            chunk_id = chunk.chunk_id,
            valid_time = %time.valid_time,
            n_pairs,
            "processed chunk"
        );
        ChunkOutcome::Processed {
            n_pairs,
            n_station_pairs: 0,
            issues,
        }
    }

    /// Pairs station observations with `forecast` at each station's nearest
    /// gridpoint inside `chunk`. Returns the number of pairs folded in.
    ///
    /// Does nothing unless stations were configured.
    pub fn process_stations(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
        forecast: &Field,
        stations: &mut StationMap,
    ) -> usize {
        let Some((manager, source)) = self.stations else {
            return 0;
        };
        let in_chunk = manager.stations_in_chunk(chunk);
        if in_chunk.is_empty() {
            return 0;
        }
        let ids: Vec<&str> = in_chunk.iter().map(|(s, _)| s.station_id.as_str()).collect();
        let reports = source.observations(time.valid_time, variable, &ids);
        let observed = observations_by_station(reports);
        let values = forecast.values();

        let mut n_pairs = 0;
        for (station, index) in in_chunk {
            let Some(&obs) = observed.get(&station.station_id) else {
                continue;
            };
            let Some(&fcst) = chunk.local_position(index).and_then(|pos| values.get(pos)) else {
                continue;
            };
            if let Some(acc) = stations.get_mut(&station.station_id)
                && acc.update_pair(fcst, obs)
            {
                n_pairs += 1;
            }
        }
        n_pairs
    }

    /// Reads the pair once and updates every map of `pass`.
    ///
    /// Station pairs need only the forecast: an unusable reference still
    /// skips the gridded fold but not the stations.
    pub fn process_task(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
        pass: &mut PassAccumulators,
    ) -> ChunkOutcome {
        let (forecast, forecast_quality) = match self.read_forecast(chunk, time, variable) {
            Ok(read) => read,
            Err(reason) => return self.skip(chunk, time, reason),
        };
        let (thresholds, gridpoints, regions, stations) = pass.split_mut();
        let n_station_pairs = self.process_stations(chunk, time, variable, &forecast, stations);
        let paired = self.read_reference(chunk, time, variable, &forecast, forecast_quality);
        let (reference, issues) = match paired {
            Ok(fields) => fields,
            Err(reason) if n_station_pairs > 0 => {
                warn!(
                    chunk_id = chunk.chunk_id,
                    time = %time,
                    n_station_pairs,
                    "skipping gridded pairs: {reason}"
                );
                return ChunkOutcome::StationsOnly {
                    reason,
                    n_station_pairs,
                };
            }
            Err(reason) => return self.skip(chunk, time, reason),
        };
        let n_pairs = self.fold_fields(
            chunk,
            &forecast,
            &reference,
            thresholds,
            gridpoints,
            Some(regions),
        );
        debug!(
            chunk_id = chunk.chunk_id,
            valid_time = %time.valid_time,
            n_pairs,
            n_station_pairs,
            "processed task"
        );
        ChunkOutcome::Processed {
            n_pairs,
            n_station_pairs,
            issues,
        }
    }

    fn skip(&self, chunk: &Chunk, time: &TimeEntry, reason: SkipReason) -> ChunkOutcome {
        warn!(chunk_id = chunk.chunk_id, time = %time, "skipping chunk: {reason}");
        ChunkOutcome::Skipped { reason }
    }

    fn read_pair(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
    ) -> Result<(Field, Field, Vec<QualityIssue>), SkipReason> {
        let (forecast, quality) = self.read_forecast(chunk, time, variable)?;
        let (reference, issues) = self.read_reference(chunk, time, variable, &forecast, quality)?;
        Ok((forecast, reference, issues))
    }

    fn request<'r>(chunk: &Chunk, time: &'r TimeEntry, variable: &'r str) -> FieldRequest<'r> {
        FieldRequest {
            time,
            variable,
            window: Some(*chunk),
        }
    }

    /// Forecast window, checked against the chunk shape, with its quality.
    fn read_forecast(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
    ) -> Result<(Field, FieldQuality), SkipReason> {
        let forecast = self
            .forecast
            .read_field(&Self::request(chunk, time, variable))
            .ok_or(SkipReason::Unavailable {
                role: FieldRole::Forecast,
            })?;
        if forecast.shape() != chunk.shape() {
            return Err(SkipReason::WindowMismatch {
                expected: chunk.shape(),
                got: forecast.shape(),
            });
        }
        let quality = check_field(forecast.values(), &self.checks);
        if quality.all_missing {
            return Err(SkipReason::AllMissing {
                role: FieldRole::Forecast,
            });
        }
        Ok((forecast, quality))
    }

    /// Reference window paired with `forecast`, plus every quality issue of
    /// the pair.
    fn read_reference(
        &self,
        chunk: &Chunk,
        time: &TimeEntry,
        variable: &str,
        forecast: &Field,
        forecast_quality: FieldQuality,
    ) -> Result<(Field, Vec<QualityIssue>), SkipReason> {
        let reference = self
            .reference
            .read_field(&Self::request(chunk, time, variable))
            .ok_or(SkipReason::Unavailable {
                role: FieldRole::Reference,
            })?;
        if forecast.shape() != reference.shape() {
            return Err(SkipReason::ShapeMismatch {
                forecast: forecast.shape(),
                reference: reference.shape(),
            });
        }

        let reference_quality = check_field(reference.values(), &self.checks);
        if reference_quality.all_missing {
            return Err(SkipReason::AllMissing {
                role: FieldRole::Reference,
            });
        }

        let mut issues = Vec::new();
        for (role, quality) in [
            (FieldRole::Forecast, forecast_quality),
            (FieldRole::Reference, reference_quality),
        ] {
            if !quality.is_valid() {
                issues.push(QualityIssue::Field { role, quality });
            }
        }
        if let Some(mismatch) = check_units(forecast, &reference) {
            issues.push(QualityIssue::Units { mismatch });
        }
        Ok((reference, issues))
    }

    fn fold_fields(
        &self,
        chunk: &Chunk,
        forecast: &Field,
        reference: &Field,
        thresholds: &[f64],
        gridpoints: &mut GridpointMap,
        regions: Option<&mut RegionalMap>,
    ) -> usize {
        let observed = reference.values();
        let (lats, lons) = (forecast.lats(), forecast.lons());
        let mut regional = match (regions, self.spatial_index) {
            (Some(regions), Some(index)) => Some((regions, index)),
            _ => None,
        };

        let mut n_pairs = 0;
        for ((j, i), &fcst) in forecast.values().indexed_iter() {
            let obs = observed[(j, i)];
            if is_missing(fcst) || is_missing(obs) {
                continue;
            }
            let index = chunk.global_index(i, j);
            gridpoint_entry(gridpoints, thresholds, index, lats[(j, i)], lons[(j, i)])
                .update_pair(fcst, obs);
            n_pairs += 1;

            if let Some((regions, spatial_index)) = regional.as_mut() {
                for key in spatial_index.regions_for_gridpoint(index) {
                    if let Some(acc) = regions.get_mut(key) {
                        acc.update_pair(fcst, obs);
                    }
                }
            }
        }
        n_pairs
    }
}
