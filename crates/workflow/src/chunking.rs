//! Processing plan: spatial chunks crossed with temporal groups.

use gridver_spatial::{BoundingBox, Chunk, GridManager};
use gridver_temporal::{GroupKey, TimeManager};
use serde::Serialize;
use tracing::info;

use crate::error::WorkflowError;

/// Bytes per stored value (`f64`).
pub const BYTES_PER_VALUE: u64 = 8;

/// Fields held per variable while a chunk is processed (forecast and reference).
pub const FIELDS_PER_VARIABLE: u64 = 2;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// ChunkingConfig
// ---------------------------------------------------------------------------

/// Memory ceiling and variable count used to size chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingConfig {
    max_chunk_memory_mb: f64,
    num_variables: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_memory_mb: 1000.0,
            num_variables: 1,
        }
    }
}

impl ChunkingConfig {
    /// Set the per-chunk memory ceiling in MiB.
    pub fn with_max_chunk_memory_mb(mut self, mb: f64) -> Self {
        self.max_chunk_memory_mb = mb;
        self
    }

    /// Set the number of variables loaded at once.
    pub fn with_num_variables(mut self, n: usize) -> Self {
        self.num_variables = n;
        self
    }

    pub fn max_chunk_memory_mb(&self) -> f64 {
        self.max_chunk_memory_mb
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidConfig`] for a non-positive or
    /// non-finite memory ceiling, or zero variables.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if !(self.max_chunk_memory_mb.is_finite() && self.max_chunk_memory_mb > 0.0) {
            return Err(WorkflowError::InvalidConfig {
                field: "max_chunk_memory_mb",
                reason: format!("must be positive, got {}", self.max_chunk_memory_mb),
            });
        }
        if self.num_variables == 0 {
            return Err(WorkflowError::InvalidConfig {
                field: "num_variables",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tasks and plan
// ---------------------------------------------------------------------------

/// One unit of work: a spatial chunk within a temporal group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub task_id: usize,
    pub chunk: Chunk,
    pub group: GroupKey,
}

/// Every spatial chunk crossed with every temporal group.
///
/// Tasks are numbered group-major: all chunks of the first group, then all
/// chunks of the second, and so on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingPlan {
    chunks: Vec<Chunk>,
    groups: Vec<GroupKey>,
}

impl ProcessingPlan {
    pub fn new(chunks: Vec<Chunk>, groups: Vec<GroupKey>) -> Self {
        Self { chunks, groups }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn groups(&self) -> &[GroupKey] {
        &self.groups
    }

    pub fn num_spatial_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn num_temporal_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn total_tasks(&self) -> usize {
        self.chunks.len() * self.groups.len()
    }

    /// # Errors
    ///
    /// Returns [`WorkflowError::UnknownTask`] if `task_id` is out of range.
    pub fn task(&self, task_id: usize) -> Result<Task, WorkflowError> {
        if task_id >= self.total_tasks() {
            return Err(WorkflowError::UnknownTask {
                task_id,
                n_tasks: self.total_tasks(),
            });
        }
        let n_chunks = self.chunks.len();
        Ok(Task {
            task_id,
            chunk: self.chunks[task_id % n_chunks],
            group: self.groups[task_id / n_chunks].clone(),
        })
    }

    /// All tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = Task> + '_ {
        self.groups.iter().enumerate().flat_map(move |(g, group)| {
            self.chunks.iter().enumerate().map(move |(c, chunk)| Task {
                task_id: g * self.chunks.len() + c,
                chunk: *chunk,
                group: group.clone(),
            })
        })
    }

    /// Largest chunk footprint in bytes for `num_variables` variables.
    pub fn peak_chunk_memory(&self, num_variables: usize) -> u64 {
        self.chunks
            .iter()
            .map(|c| estimate_chunk_memory(c, num_variables))
            .max()
            .unwrap_or(0)
    }
}

/// Expected bytes held while processing `chunk` for `num_variables` variables.
pub fn estimate_chunk_memory(chunk: &Chunk, num_variables: usize) -> u64 {
    chunk.n_cells() as u64 * num_variables as u64 * FIELDS_PER_VARIABLE * BYTES_PER_VALUE
}

/// Converts bytes to MiB.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

// ---------------------------------------------------------------------------
// ChunkingStrategy
// ---------------------------------------------------------------------------

/// Builds processing plans from a grid and a time manager.
#[derive(Debug, Clone)]
pub struct ChunkingStrategy<'a> {
    grid: &'a GridManager,
    time: &'a TimeManager,
    config: ChunkingConfig,
}

impl<'a> ChunkingStrategy<'a> {
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        grid: &'a GridManager,
        time: &'a TimeManager,
        config: ChunkingConfig,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        Ok(Self { grid, time, config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Spatial chunks (optionally restricted to `bbox`) crossed with the
    /// time manager's temporal groups.
    ///
    /// # Errors
    ///
    /// Propagates [`GridManager::get_chunks`] errors.
    pub fn get_processing_plan(
        &self,
        bbox: Option<&BoundingBox>,
    ) -> Result<ProcessingPlan, WorkflowError> {
        let chunks = self.grid.get_chunks(bbox)?;
        let groups = self.time.group_keys();
        let plan = ProcessingPlan::new(chunks, groups);
        info!(
            n_chunks = plan.num_spatial_chunks(),
            n_groups = plan.num_temporal_groups(),
            n_tasks = plan.total_tasks(),
            "built processing plan"
        );
        Ok(plan)
    }

    /// Shrinks `(ni, nj)` by the square root of the memory overshoot.
    ///
    /// Sizes within the ceiling are returned unchanged; shrunk dimensions
    /// are never below 1.
    pub fn adjust_chunk_size(&self, current: (usize, usize)) -> (usize, usize) {
        let (ni, nj) = current;
        let candidate = Chunk {
            chunk_id: 0,
            i_start: 0,
            i_end: ni,
            j_start: 0,
            j_end: nj,
        };
        let estimated_mb =
            bytes_to_mb(estimate_chunk_memory(&candidate, self.config.num_variables));
        if estimated_mb <= self.config.max_chunk_memory_mb {
            return current;
        }
        let scale = (self.config.max_chunk_memory_mb / estimated_mb).sqrt();
        let adjusted = (
            ((ni as f64 * scale) as usize).max(1),
            ((nj as f64 * scale) as usize).max(1),
        );
        info!(
            from = ?current,
            to = ?adjusted,
            estimated_mb,
            max_mb = self.config.max_chunk_memory_mb,
            "adjusted chunk size to fit memory ceiling"
        );
        adjusted
    }
}
