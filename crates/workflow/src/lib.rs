//! Chunked streaming verification.
//!
//! A [`ChunkingStrategy`] crosses the grid's spatial chunks with the time
//! manager's temporal groups into a [`ProcessingPlan`]. For each chunk and
//! time, the [`ChunkProcessor`] reads paired forecast and reference windows
//! through [`FieldReader`]s and folds every valid pair into the gridpoint,
//! regional and station accumulators of a [`PassAccumulators`].
//!
//! The [`Runner`] spreads the chunks of a temporal group over the rayon
//! pool with one accumulator set per worker and merges the sets at the end.
//! Because accumulator merges are order-independent, the result matches a
//! sequential run. A [`Checkpoint`] captures a partial run as bytes so it
//! can resume without reprocessing completed chunks.

pub mod checkpoint;
pub mod chunking;
mod error;
pub mod pass;
pub mod processor;
pub mod quality;
pub mod reader;
pub mod runner;
pub mod warnings;

pub use checkpoint::Checkpoint;
pub use chunking::{
    BYTES_PER_VALUE, ChunkingConfig, ChunkingStrategy, FIELDS_PER_VARIABLE, ProcessingPlan, Task,
    bytes_to_mb, estimate_chunk_memory,
};
pub use error::WorkflowError;
pub use pass::{GridpointMap, PassAccumulators, PassMetrics, RegionalMap, StationMap};
pub use processor::{ChunkOutcome, ChunkProcessor, FieldRole, QualityIssue, SkipReason};
pub use quality::{
    FieldQuality, MAX_SCALE_RATIO, QualityChecks, UnitsMismatch, check_field, check_units,
    scale_ratio,
};
pub use reader::{Field, FieldReader, FieldRequest, ObservationSource, StationObservation};
pub use runner::{GroupRun, Runner};
pub use warnings::{WarningCategory, WarningEntry, WarningLog};
