//! Mergeable verification accumulators.
//!
//! An [`Accumulator`] pairs an [`Entity`] identity (gridpoint, region or
//! station) with [`Statistics`]: running sums, squared sums and one
//! [`ContingencyTable`] per threshold. Updating and merging are pure
//! additions, so partial accumulators built over any partition of the input
//! can be combined with [`merge_accumulators`] into the same final state.
//!
//! Non-finite values are treated as missing and never reach the sums.
//! Undefined scores (zero samples, zero denominators) are NaN in the
//! resulting [`MetricsRecord`].

pub mod accumulator;
pub mod contingency;
pub mod entity;
pub mod error;
pub mod merge;
pub mod nonfinite;
pub mod record;
pub mod statistics;

pub use accumulator::Accumulator;
pub use contingency::ContingencyTable;
pub use entity::{Entity, EntityKind, GridIndex, RegionKey};
pub use error::AccumError;
pub use merge::merge_accumulators;
pub use record::{CategoricalScores, MetricsRecord, Score};
pub use statistics::{
    BIAS_RATIO_EPSILON, ProbabilisticComponents, Statistics, Summary, is_missing,
    normalize_thresholds,
};
