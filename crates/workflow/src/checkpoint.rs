//! Serialisable snapshot of a partially processed temporal group.

use std::collections::BTreeSet;

use gridver_accum::Accumulator;
use gridver_temporal::GroupKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorkflowError;
use crate::pass::PassAccumulators;
use crate::warnings::WarningLog;

/// Accumulator state of one variable and temporal group, plus the chunk ids
/// already folded in. Encoded as JSON bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub variable: String,
    pub group: GroupKey,
    pub thresholds: Vec<f64>,
    pub completed_chunks: BTreeSet<usize>,
    pub accumulators: Vec<Accumulator>,
    #[serde(default)]
    pub warnings: WarningLog,
}

impl Checkpoint {
    pub fn new(
        variable: impl Into<String>,
        group: GroupKey,
        completed_chunks: BTreeSet<usize>,
        accumulators: PassAccumulators,
        warnings: WarningLog,
    ) -> Self {
        Self {
            variable: variable.into(),
            group,
            thresholds: accumulators.thresholds().to_vec(),
            completed_chunks,
            accumulators: accumulators.into_accumulators(),
            warnings,
        }
    }

    /// Stable identifier, e.g. `TMP_2m_00Z_f003`.
    pub fn checkpoint_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.variable, self.group.init_group_id, self.group.fhour_group_id
        )
    }

    /// # Errors
    ///
    /// Returns [`WorkflowError::Checkpoint`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkflowError> {
        let bytes = serde_json::to_vec(self).map_err(|e| WorkflowError::Checkpoint {
            reason: e.to_string(),
        })?;
        debug!(id = %self.checkpoint_id(), n_bytes = bytes.len(), "encoded checkpoint");
        Ok(bytes)
    }

    /// # Errors
    ///
    /// Returns [`WorkflowError::Checkpoint`] if `bytes` is not a valid
    /// checkpoint.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkflowError> {
        serde_json::from_slice(bytes).map_err(|e| WorkflowError::Checkpoint {
            reason: e.to_string(),
        })
    }

    /// Rebuilds the accumulator maps.
    ///
    /// # Errors
    ///
    /// Returns an accumulation error if a stored accumulator does not match
    /// the checkpoint's thresholds.
    pub fn to_pass(&self) -> Result<PassAccumulators, WorkflowError> {
        PassAccumulators::from_accumulators(&self.thresholds, self.accumulators.iter().cloned())
    }

    /// Checks that this checkpoint belongs to `variable` and `group`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Checkpoint`] on a mismatch.
    pub fn ensure_matches(&self, variable: &str, group: &GroupKey) -> Result<(), WorkflowError> {
        if self.variable != variable || &self.group != group {
            return Err(WorkflowError::Checkpoint {
                reason: format!(
                    "checkpoint is for {} {}, not {} {}",
                    self.variable, self.group, variable, group
                ),
            });
        }
        Ok(())
    }
}
