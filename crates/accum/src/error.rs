//! Error types for the gridver-accum crate.

use crate::entity::EntityKind;

/// Error type for all fallible operations in the gridver-accum crate.
///
/// Every variant signals a malformed merge tree or a caller bug, never a data
/// condition: missing values are filtered silently and zero-sample metrics are
/// reported as NaN.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccumError {
    /// Returned when two accumulators destined for one merge were declared
    /// with different threshold sets.
    #[error("threshold sets differ: {left:?} vs {right:?}")]
    ThresholdMismatch {
        /// Thresholds of the receiving accumulator.
        left: Vec<f64>,
        /// Thresholds of the accumulator being merged in.
        right: Vec<f64>,
    },

    /// Returned when a gridpoint, region and station accumulator are mixed.
    #[error("cannot merge {right} accumulator into {left} accumulator")]
    KindMismatch {
        /// Kind of the receiving accumulator.
        left: EntityKind,
        /// Kind of the accumulator being merged in.
        right: EntityKind,
    },

    /// Returned when two accumulators of the same kind belong to different entities.
    #[error("cannot merge entity '{right}' into entity '{left}'")]
    EntityMismatch {
        /// Identity key of the receiving accumulator.
        left: String,
        /// Identity key of the accumulator being merged in.
        right: String,
    },

    /// Returned when a merge is requested over an empty list.
    #[error("cannot merge an empty list of accumulators")]
    EmptyInput,

    /// Returned when paired input slices have different lengths.
    #[error("{input} length {got} does not match forecast length {expected}")]
    LengthMismatch {
        /// Name of the offending input.
        input: &'static str,
        /// Length of the forecast slice.
        expected: usize,
        /// Length of the offending slice.
        got: usize,
    },
}
