//! Parallel execution of a temporal group over its spatial chunks.

use std::collections::{BTreeMap, BTreeSet};

use gridver_spatial::Chunk;
use gridver_temporal::{GroupKey, TemporalGroup, TimeEntry, TimeManager};
use rayon::prelude::*;
use tracing::info;

use crate::checkpoint::Checkpoint;
use crate::chunking::ProcessingPlan;
use crate::error::WorkflowError;
use crate::pass::PassAccumulators;
use crate::processor::{ChunkOutcome, ChunkProcessor};
use crate::warnings::WarningLog;

/// Accumulated state of one temporal group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRun {
    pub accumulators: PassAccumulators,
    pub completed_chunks: BTreeSet<usize>,
    pub warnings: WarningLog,
    /// `(chunk, time)` tasks that folded data in.
    pub n_processed: usize,
    /// Tasks whose gridded fold was skipped, even if stations were paired.
    pub n_skipped: usize,
}

impl GroupRun {
    fn empty(template: &PassAccumulators) -> Self {
        Self {
            accumulators: template.fresh(),
            completed_chunks: BTreeSet::new(),
            warnings: WarningLog::new(),
            n_processed: 0,
            n_skipped: 0,
        }
    }

    fn merged(mut self, other: GroupRun) -> Result<Self, WorkflowError> {
        self.accumulators = self.accumulators.merged(other.accumulators)?;
        self.completed_chunks.extend(other.completed_chunks);
        self.warnings.extend(other.warnings);
        self.n_processed += other.n_processed;
        self.n_skipped += other.n_skipped;
        Ok(self)
    }

    fn record(&mut self, chunk: &Chunk, time: &TimeEntry, outcome: ChunkOutcome) {
        let details = || {
            BTreeMap::from([
                ("chunk_id".to_string(), chunk.chunk_id.to_string()),
                ("valid_time".to_string(), time.valid_time.to_string()),
            ])
        };
        match outcome {
            ChunkOutcome::Processed { issues, .. } => {
                self.n_processed += 1;
                for issue in issues {
                    self.warnings
                        .add_with_details(issue.category(), issue.to_string(), details());
                }
            }
            ChunkOutcome::Skipped { reason } | ChunkOutcome::StationsOnly { reason, .. } => {
                self.n_skipped += 1;
                self.warnings
                    .record(reason.category(), reason.to_string(), details());
            }
        }
    }

    /// Snapshot for resuming later.
    pub fn to_checkpoint(&self, variable: &str, group: GroupKey) -> Checkpoint {
        Checkpoint::new(
            variable,
            group,
            self.completed_chunks.clone(),
            self.accumulators.clone(),
            self.warnings.clone(),
        )
    }
}

/// Runs one variable through temporal groups on the rayon pool.
///
/// Each worker folds its chunks into a private copy of the template
/// accumulators; the copies are merged when the workers finish.
#[derive(Debug)]
pub struct Runner<'a> {
    processor: ChunkProcessor<'a>,
    variable: String,
    template: PassAccumulators,
}

impl<'a> Runner<'a> {
    /// `template` fixes the thresholds and the seeded regions and stations.
    pub fn new(
        processor: ChunkProcessor<'a>,
        variable: impl Into<String>,
        template: PassAccumulators,
    ) -> Self {
        Self {
            processor,
            variable: variable.into(),
            template: template.fresh(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Processes every time of `group` over every chunk not already
    /// completed in `resume`.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Checkpoint`] if `resume` belongs to another variable
    /// or group, or an accumulation error if its thresholds differ from the
    /// template's.
    #[tracing::instrument(skip_all, fields(variable = %self.variable, group = %group.key))]
    pub fn run_group(
        &self,
        chunks: &[Chunk],
        group: &TemporalGroup,
        resume: Option<&Checkpoint>,
    ) -> Result<GroupRun, WorkflowError> {
        let base = match resume {
            Some(checkpoint) => {
                checkpoint.ensure_matches(&self.variable, &group.key)?;
                let resumed = GroupRun {
                    accumulators: checkpoint.to_pass()?,
                    completed_chunks: checkpoint.completed_chunks.clone(),
                    warnings: checkpoint.warnings.clone(),
                    n_processed: 0,
                    n_skipped: 0,
                };
                GroupRun::empty(&self.template).merged(resumed)?
            }
            None => GroupRun::empty(&self.template),
        };

        let pending: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| !base.completed_chunks.contains(&c.chunk_id))
            .collect();
        info!(
            n_pending = pending.len(),
            n_resumed = base.completed_chunks.len(),
            n_times = group.len(),
            "running temporal group"
        );

        let fresh = || GroupRun::empty(&self.template);
        let processed = pending
            .par_iter()
            .fold(fresh, |mut run, chunk| {
                for time in &group.times {
                    let outcome = self.processor.process_task(
                        chunk,
                        time,
                        &self.variable,
                        &mut run.accumulators,
                    );
                    run.record(chunk, time, outcome);
                }
                run.completed_chunks.insert(chunk.chunk_id);
                run
            })
            .map(Ok::<GroupRun, WorkflowError>)
            .try_reduce(fresh, GroupRun::merged)?;

        let run = base.merged(processed)?;
        info!(
            n_processed = run.n_processed,
            n_skipped = run.n_skipped,
            n_gridpoints = run.accumulators.gridpoints().len(),
            "temporal group finished"
        );
        Ok(run)
    }

    /// Runs every temporal group of `time` over the plan's chunks, in
    /// group order.
    ///
    /// # Errors
    ///
    /// Propagates [`run_group`](Self::run_group) errors.
    pub fn run_plan(
        &self,
        plan: &ProcessingPlan,
        time: &TimeManager,
    ) -> Result<Vec<(GroupKey, GroupRun)>, WorkflowError> {
        time.group_times_for_processing()
            .into_iter()
            .filter(|g| plan.groups().contains(&g.key))
            .map(|group| {
                let run = self.run_group(plan.chunks(), &group, None)?;
                Ok((group.key, run))
            })
            .collect()
    }
}
