//! Error types for the gridver-workflow crate.

use gridver_accum::AccumError;
use gridver_metrics::MetricsError;
use gridver_spatial::SpatialError;
use gridver_temporal::TemporalError;

/// Error type for all fallible operations in the gridver-workflow crate.
///
/// Missing or malformed input fields are not errors; they surface as
/// skipped chunks. Everything here aborts the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Accum(#[from] AccumError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Temporal(#[from] TemporalError),

    /// Returned when a configuration value is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        reason: String,
    },

    /// Returned when a checkpoint cannot be encoded, decoded or applied.
    #[error("checkpoint error: {reason}")]
    Checkpoint { reason: String },

    /// Returned when a task id is not part of the processing plan.
    #[error("unknown task id {task_id} (plan has {n_tasks} tasks)")]
    UnknownTask { task_id: usize, n_tasks: usize },
}
