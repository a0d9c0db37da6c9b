//! Verification scores over slices and accumulators.
//!
//! Array-level continuous, categorical and probabilistic scores, the
//! [`MetricsCalculator`] façade with metric filtering, and sample-count
//! completeness checks.

pub mod calculator;
pub mod categorical;
pub mod completeness;
pub mod continuous;
mod error;
pub mod probabilistic;

pub use calculator::{ArrayMetrics, MetricKind, MetricsCalculator};
pub use categorical::categorical_scores;
pub use completeness::{
    CompletenessConfig, CompletenessReport, CompletenessSummary, InsufficientEntity,
    check_completeness,
};
pub use error::MetricsError;
pub use probabilistic::{
    DEFAULT_RELIABILITY_BINS, DEFAULT_ROC_THRESHOLDS, ReliabilityDiagram, RocCurve,
    brier_score, brier_skill_score, reliability, roc_curve,
};
