//! Error types for the gridver-metrics crate.

use gridver_accum::{AccumError, EntityKind};

/// Error type for all fallible operations in the gridver-metrics crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// Returned when a requested metric name is not recognised.
    #[error("unknown metric '{name}' (expected one of: {expected})")]
    UnknownMetric {
        /// The name as given.
        name: String,
        /// Comma-separated list of accepted names.
        expected: String,
    },

    /// Returned when a reliability diagram is requested with zero bins.
    #[error("reliability diagram needs at least 1 bin, got {n_bins}")]
    InvalidBinCount { n_bins: usize },

    /// Returned when an ROC curve is requested with fewer than 2 thresholds.
    #[error("ROC curve needs at least 2 probability thresholds, got {n_thresholds}")]
    InvalidRocThresholds { n_thresholds: usize },

    /// Returned when a completeness minimum is zero.
    #[error("minimum sample count for {kind} entities must be at least 1")]
    InvalidMinSamples { kind: EntityKind },

    /// Propagated from the accumulator layer.
    #[error(transparent)]
    Accum(#[from] AccumError),
}
