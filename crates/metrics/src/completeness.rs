//! Minimum-sample completeness checks over computed metrics.

use gridver_accum::{EntityKind, MetricsRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MetricsError;

/// Minimum valid-sample counts per entity kind.
#[derive(Debug, Clone)]
pub struct CompletenessConfig {
    min_gridpoint_samples: u64,
    min_region_samples: u64,
    min_station_samples: u64,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            min_gridpoint_samples: 5,
            min_region_samples: 50,
            min_station_samples: 10,
        }
    }
}

impl CompletenessConfig {
    pub fn with_min_gridpoint_samples(mut self, n: u64) -> Self {
        self.min_gridpoint_samples = n;
        self
    }

    pub fn with_min_region_samples(mut self, n: u64) -> Self {
        self.min_region_samples = n;
        self
    }

    pub fn with_min_station_samples(mut self, n: u64) -> Self {
        self.min_station_samples = n;
        self
    }

    pub fn min_gridpoint_samples(&self) -> u64 {
        self.min_gridpoint_samples
    }

    pub fn min_region_samples(&self) -> u64 {
        self.min_region_samples
    }

    pub fn min_station_samples(&self) -> u64 {
        self.min_station_samples
    }

    /// Minimum for entities of `kind`.
    pub fn min_samples(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Gridpoint => self.min_gridpoint_samples,
            EntityKind::Region => self.min_region_samples,
            EntityKind::Station => self.min_station_samples,
        }
    }

    /// # Errors
    ///
    /// Returns [`MetricsError::InvalidMinSamples`] if any minimum is zero.
    pub fn validate(&self) -> Result<(), MetricsError> {
        for kind in [EntityKind::Gridpoint, EntityKind::Region, EntityKind::Station] {
            if self.min_samples(kind) == 0 {
                return Err(MetricsError::InvalidMinSamples { kind });
            }
        }
        Ok(())
    }

    /// Checks every record of `kind` against its minimum.
    ///
    /// Records of another kind are ignored.
    pub fn check<'a>(
        &self,
        kind: EntityKind,
        records: impl IntoIterator<Item = &'a MetricsRecord>,
    ) -> CompletenessReport {
        check_completeness(kind, records, self.min_samples(kind))
    }
}

/// One entity below its minimum sample count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsufficientEntity {
    pub entity_id: String,
    pub n_samples: u64,
}

/// Sample-count distribution over the checked entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessSummary {
    pub total_entities: usize,
    pub insufficient_count: usize,
    pub min_samples_found: u64,
    pub max_samples_found: u64,
    pub mean_samples: f64,
}

/// Completeness of one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessReport {
    pub kind: EntityKind,
    pub min_samples: u64,
    pub insufficient: Vec<InsufficientEntity>,
    pub summary: CompletenessSummary,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.insufficient.is_empty()
    }
}

/// Lists the entities of `kind` with fewer than `min_samples` samples.
pub fn check_completeness<'a>(
    kind: EntityKind,
    records: impl IntoIterator<Item = &'a MetricsRecord>,
    min_samples: u64,
) -> CompletenessReport {
    let mut insufficient = Vec::new();
    let mut total = 0usize;
    let mut min_found = u64::MAX;
    let mut max_found = 0u64;
    let mut sum = 0u64;

    for record in records.into_iter().filter(|r| r.entity.kind() == kind) {
        let n = record.n_samples;
        total += 1;
        min_found = min_found.min(n);
        max_found = max_found.max(n);
        sum += n;
        if n < min_samples {
            debug!(
                entity = %record.entity.key_string(),
                n_samples = n,
                min_samples,
                "insufficient samples"
            );
            insufficient.push(InsufficientEntity {
                entity_id: record.entity.key_string(),
                n_samples: n,
            });
        }
    }

    if !insufficient.is_empty() {
        warn!(
            %kind,
            count = insufficient.len(),
            total,
            min_samples,
            "entities have insufficient samples"
        );
    }

    let summary = CompletenessSummary {
        total_entities: total,
        insufficient_count: insufficient.len(),
        min_samples_found: if total == 0 { 0 } else { min_found },
        max_samples_found: max_found,
        mean_samples: if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        },
    };

    CompletenessReport {
        kind,
        min_samples,
        insufficient,
        summary,
    }
}
