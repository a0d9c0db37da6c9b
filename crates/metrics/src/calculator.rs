//! Metric selection and the calculator façade.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use gridver_accum::{Accumulator, AccumError, CategoricalScores, MetricsRecord, Score};
use serde::Serialize;

use crate::categorical::categorical_scores;
use crate::continuous;
use crate::error::MetricsError;
use crate::probabilistic::{self, DEFAULT_RELIABILITY_BINS, ReliabilityDiagram};

/// A metric that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Mae,
    Bias,
    Rmse,
    BiasRatio,
    HitRate,
    FalseAlarmRatio,
    CriticalSuccessIndex,
    BrierScore,
    Reliability,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::Mae,
        MetricKind::Bias,
        MetricKind::Rmse,
        MetricKind::BiasRatio,
        MetricKind::HitRate,
        MetricKind::FalseAlarmRatio,
        MetricKind::CriticalSuccessIndex,
        MetricKind::BrierScore,
        MetricKind::Reliability,
    ];

    /// The short name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Mae => "mae",
            MetricKind::Bias => "bias",
            MetricKind::Rmse => "rmse",
            MetricKind::BiasRatio => "bias_ratio",
            MetricKind::HitRate => "hr",
            MetricKind::FalseAlarmRatio => "far",
            MetricKind::CriticalSuccessIndex => "csi",
            MetricKind::BrierScore => "brier_score",
            MetricKind::Reliability => "reliability",
        }
    }

    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            MetricKind::Mae | MetricKind::Bias | MetricKind::Rmse | MetricKind::BiasRatio
        )
    }

    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            MetricKind::HitRate | MetricKind::FalseAlarmRatio | MetricKind::CriticalSuccessIndex
        )
    }

    pub fn is_probabilistic(self) -> bool {
        matches!(self, MetricKind::BrierScore | MetricKind::Reliability)
    }

    /// The record score this metric maps onto, if it is a scalar score.
    pub fn score(self) -> Option<Score> {
        match self {
            MetricKind::Mae => Some(Score::Mae),
            MetricKind::Bias => Some(Score::Bias),
            MetricKind::Rmse => Some(Score::Rmse),
            MetricKind::BiasRatio => Some(Score::BiasRatio),
            MetricKind::BrierScore => Some(Score::BrierScore),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| MetricsError::UnknownMetric {
                name: s.to_string(),
                expected: MetricKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Metrics computed directly from slices, without an accumulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayMetrics {
    pub n_samples: usize,
    pub scores: BTreeMap<Score, f64>,
    pub categorical: Vec<CategoricalScores>,
    pub reliability: Option<ReliabilityDiagram>,
}

/// Turns accumulators (or raw slices) into metrics, optionally restricted to
/// a requested subset.
///
/// With no request every metric is produced. Identity fields and the sample
/// count are always kept; the categorical block is kept whole when any
/// categorical metric is requested.
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    requested: Option<BTreeSet<MetricKind>>,
}

impl MetricsCalculator {
    /// A calculator producing every metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict output to the given metrics.
    pub fn with_requested(mut self, metrics: impl IntoIterator<Item = MetricKind>) -> Self {
        self.requested = Some(metrics.into_iter().collect());
        self
    }

    /// Parses metric names (`mae`, `hr`, `brier_score`, ...) into a request.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownMetric`] for the first unrecognised name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, MetricsError> {
        let kinds = names
            .iter()
            .map(|n| n.as_ref().parse::<MetricKind>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new().with_requested(kinds))
    }

    /// Requested metrics, or `None` when everything is produced.
    pub fn requested(&self) -> Option<&BTreeSet<MetricKind>> {
        self.requested.as_ref()
    }

    pub fn wants(&self, kind: MetricKind) -> bool {
        self.requested.as_ref().is_none_or(|set| set.contains(&kind))
    }

    fn wants_any(&self, pred: impl Fn(MetricKind) -> bool) -> bool {
        match &self.requested {
            None => true,
            Some(set) => set.iter().any(|&k| pred(k)),
        }
    }

    fn wants_score(&self, score: Score) -> bool {
        match &self.requested {
            None => true,
            Some(set) => set.iter().any(|k| k.score() == Some(score)),
        }
    }

    /// Computes the accumulator's metrics and applies the request filter.
    pub fn compute_from_accumulator(&self, accumulator: &Accumulator) -> MetricsRecord {
        self.filter(accumulator.compute_metrics())
    }

    /// Applies the request filter to an already computed record.
    pub fn filter(&self, mut record: MetricsRecord) -> MetricsRecord {
        if self.requested.is_none() {
            return record;
        }
        record.scores.retain(|&score, _| self.wants_score(score));
        if !self.wants_any(MetricKind::is_categorical) {
            record.categorical.clear();
        }
        record
    }

    /// One-off metrics from paired slices.
    ///
    /// Categorical blocks are produced for every threshold. When
    /// `probabilities` is given and at least one threshold exists,
    /// observations are binarised against the lowest threshold (`o >= t`) to
    /// produce the Brier score and the reliability diagram.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Accum`] wrapping
    /// [`AccumError::LengthMismatch`] if the slices differ in length.
    pub fn compute_from_arrays(
        &self,
        forecasts: &[f64],
        observations: &[f64],
        thresholds: &[f64],
        probabilities: Option<&[f64]>,
    ) -> Result<ArrayMetrics, MetricsError> {
        if observations.len() != forecasts.len() {
            return Err(AccumError::LengthMismatch {
                input: "observations",
                expected: forecasts.len(),
                got: observations.len(),
            }
            .into());
        }
        if let Some(p) = probabilities
            && p.len() != forecasts.len()
        {
            return Err(AccumError::LengthMismatch {
                input: "probabilistic forecasts",
                expected: forecasts.len(),
                got: p.len(),
            }
            .into());
        }

        let mut scores = BTreeMap::new();
        let continuous_scores: [(Score, fn(&[f64], &[f64]) -> f64); 4] = [
            (Score::Mae, continuous::mae),
            (Score::Bias, continuous::bias),
            (Score::Rmse, continuous::rmse),
            (Score::BiasRatio, continuous::bias_ratio),
        ];
        for (score, func) in continuous_scores {
            if self.wants_score(score) {
                scores.insert(score, func(forecasts, observations));
            }
        }

        let categorical = if self.wants_any(MetricKind::is_categorical) {
            categorical_scores(forecasts, observations, thresholds)
        } else {
            Vec::new()
        };

        let mut reliability = None;
        let event_threshold = gridver_accum::normalize_thresholds(thresholds).first().copied();
        if let (Some(probs), Some(t0)) = (probabilities, event_threshold)
            && self.wants_any(MetricKind::is_probabilistic)
        {
            let binary: Vec<f64> = observations
                .iter()
                .map(|&o| {
                    if gridver_accum::is_missing(o) {
                        f64::NAN
                    } else if o >= t0 {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            if self.wants(MetricKind::BrierScore) {
                scores.insert(Score::BrierScore, probabilistic::brier_score(probs, &binary));
            }
            if self.wants(MetricKind::Reliability) {
                reliability = Some(probabilistic::reliability(
                    probs,
                    &binary,
                    DEFAULT_RELIABILITY_BINS,
                )?);
            }
        }

        Ok(ArrayMetrics {
            n_samples: continuous::count_valid(forecasts, observations),
            scores,
            categorical,
            reliability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gridver_accum::GridIndex;

    fn sample_accumulator() -> Accumulator {
        let mut acc = Accumulator::gridpoint(GridIndex::new(1, 1), 35.0, -97.0, &[2.0]);
        acc.update(&[1.0, 2.0, 3.0], &[1.5, 2.5, 2.5], Some(&[0.1, 0.8, 0.9]))
            .unwrap();
        acc
    }

    #[test]
    fn test_parse_metric_names() {
        assert_eq!("mae".parse::<MetricKind>().unwrap(), MetricKind::Mae);
        assert_eq!(" HR ".parse::<MetricKind>().unwrap(), MetricKind::HitRate);
        assert_eq!("csi".parse::<MetricKind>().unwrap(), MetricKind::CriticalSuccessIndex);
        let err = "crpss".parse::<MetricKind>().unwrap_err();
        assert!(matches!(err, MetricsError::UnknownMetric { ref name, .. } if name == "crpss"));
    }

    #[test]
    fn test_name_roundtrip() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.name().parse::<MetricKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_no_request_keeps_everything() {
        let calc = MetricsCalculator::new();
        let record = calc.compute_from_accumulator(&sample_accumulator());
        assert_eq!(record.scores.len(), 5);
        assert_eq!(record.categorical.len(), 1);
    }

    #[test]
    fn test_filter_keeps_requested_scores_only() {
        let calc = MetricsCalculator::from_names(&["mae", "rmse"]).unwrap();
        let record = calc.compute_from_accumulator(&sample_accumulator());
        assert_eq!(
            record.scores.keys().copied().collect::<Vec<_>>(),
            vec![Score::Mae, Score::Rmse]
        );
        assert!(record.categorical.is_empty());
        assert_eq!(record.n_samples, 3);
    }

    #[test]
    fn test_filter_keeps_categorical_block_for_any_categorical_metric() {
        let calc = MetricsCalculator::new().with_requested([MetricKind::FalseAlarmRatio]);
        let record = calc.compute_from_accumulator(&sample_accumulator());
        assert!(record.scores.is_empty());
        assert_eq!(record.categorical.len(), 1);
    }

    #[test]
    fn test_compute_from_arrays() {
        let calc = MetricsCalculator::new();
        let f = [1.0, 2.0, 3.0, f64::NAN];
        let o = [1.5, 2.5, 2.5, 1.0];
        let p = [0.1, 0.9, 0.8, 0.5];
        let out = calc.compute_from_arrays(&f, &o, &[2.0], Some(&p)).unwrap();
        assert_eq!(out.n_samples, 3);
        assert_abs_diff_eq!(out.scores[&Score::Mae], 0.5, epsilon = 1e-12);
        assert_eq!(out.categorical.len(), 1);
        // observations binarised at 2.0: [0, 1, 1, 0]
        let expected = (0.01 + 0.01 + 0.04 + 0.25) / 4.0;
        assert_abs_diff_eq!(out.scores[&Score::BrierScore], expected, epsilon = 1e-12);
        assert_eq!(out.reliability.unwrap().counts.iter().sum::<u64>(), 4);
    }

    #[test]
    fn test_compute_from_arrays_without_thresholds_skips_probabilistic() {
        let calc = MetricsCalculator::new();
        let out = calc
            .compute_from_arrays(&[1.0], &[1.0], &[], Some(&[0.5]))
            .unwrap();
        assert!(!out.scores.contains_key(&Score::BrierScore));
        assert!(out.reliability.is_none());
        assert!(out.categorical.is_empty());
    }

    #[test]
    fn test_compute_from_arrays_length_mismatch() {
        let calc = MetricsCalculator::new();
        let err = calc.compute_from_arrays(&[1.0, 2.0], &[1.0], &[], None).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::Accum(AccumError::LengthMismatch { expected: 2, got: 1, .. })
        ));
    }
}
