//! Final per-entity metrics record.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::contingency::ContingencyTable;
use crate::entity::Entity;
use crate::statistics::Statistics;

/// Continuous and probabilistic scores carried by a [`MetricsRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Mae,
    Bias,
    Rmse,
    BiasRatio,
    BrierScore,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Score::Mae => "mae",
            Score::Bias => "bias",
            Score::Rmse => "rmse",
            Score::BiasRatio => "bias_ratio",
            Score::BrierScore => "brier_score",
        };
        f.write_str(name)
    }
}

/// Categorical scores and raw counts at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalScores {
    pub threshold: f64,
    pub hit_rate: f64,
    pub false_alarm_ratio: f64,
    pub critical_success_index: f64,
    #[serde(flatten)]
    pub counts: ContingencyTable,
}

impl CategoricalScores {
    pub fn from_table(threshold: f64, table: &ContingencyTable) -> Self {
        Self {
            threshold,
            hit_rate: table.hit_rate(),
            false_alarm_ratio: table.false_alarm_ratio(),
            critical_success_index: table.critical_success_index(),
            counts: *table,
        }
    }
}

/// Metrics for one entity: identity fields, sample count and derived scores.
///
/// Undefined scores are NaN (serialised as `null`). A record built from an
/// empty accumulator carries NaN continuous scores and no categorical block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    #[serde(flatten)]
    pub entity: Entity,
    pub n_samples: u64,
    pub scores: BTreeMap<Score, f64>,
    pub categorical: Vec<CategoricalScores>,
}

impl MetricsRecord {
    /// Derives every score from `stats`.
    pub fn from_statistics(entity: Entity, stats: &Statistics) -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(Score::Mae, stats.mae());
        scores.insert(Score::Bias, stats.bias());
        scores.insert(Score::Rmse, stats.rmse());
        scores.insert(Score::BiasRatio, stats.bias_ratio());

        if stats.is_empty() {
            return Self {
                entity,
                n_samples: 0,
                scores,
                categorical: Vec::new(),
            };
        }

        if let Some(brier) = stats.brier_score() {
            scores.insert(Score::BrierScore, brier);
        }
        let categorical = stats
            .contingency_tables()
            .map(|(threshold, table)| CategoricalScores::from_table(threshold, table))
            .collect();

        Self {
            entity,
            n_samples: stats.n_samples(),
            scores,
            categorical,
        }
    }

    /// Score value, or NaN if it was not computed or was filtered out.
    pub fn score(&self, score: Score) -> f64 {
        self.scores.get(&score).copied().unwrap_or(f64::NAN)
    }

    /// Categorical block for `threshold`, if present.
    pub fn categorical_at(&self, threshold: f64) -> Option<&CategoricalScores> {
        self.categorical
            .iter()
            .find(|c| c.threshold.to_bits() == threshold.to_bits())
    }
}
