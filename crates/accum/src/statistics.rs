//! Running sufficient statistics shared by every accumulator shape.

use serde::{Deserialize, Serialize};

use crate::contingency::ContingencyTable;
use crate::error::AccumError;

/// Mean observations closer to zero than this make the bias ratio undefined.
pub const BIAS_RATIO_EPSILON: f64 = 1e-10;

/// Returns `true` for values that must never reach an accumulator.
///
/// NaN marks missing data; infinities are treated the same way so a single
/// corrupt cell cannot poison the running sums.
#[inline]
pub fn is_missing(value: f64) -> bool {
    !value.is_finite()
}

/// Normalises a threshold list: drops non-finite entries, sorts, de-duplicates.
pub fn normalize_thresholds(thresholds: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = thresholds.iter().copied().filter(|t| t.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// Brier-score components for probabilistic forecasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticComponents {
    /// Sum of `(p - o)^2` over pairs that carried a probability.
    #[serde(with = "crate::nonfinite")]
    pub brier_sum: f64,
    /// Number of pairs that carried a probability.
    pub n_pairs: u64,
}

/// Running sums and per-threshold contingency tables for one entity.
///
/// Updating and merging only ever add, so any partition of the input pairs
/// folded independently and merged reaches the same state (up to
/// floating-point summation order). Sums that overflow to infinity still
/// serialise and restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    thresholds: Vec<f64>,
    n_samples: u64,
    #[serde(with = "crate::nonfinite")]
    sum_forecast: f64,
    #[serde(with = "crate::nonfinite")]
    sum_obs: f64,
    #[serde(with = "crate::nonfinite")]
    sum_forecast_squared: f64,
    #[serde(with = "crate::nonfinite")]
    sum_obs_squared: f64,
    #[serde(with = "crate::nonfinite")]
    sum_abs_error: f64,
    #[serde(with = "crate::nonfinite")]
    sum_squared_error: f64,
    /// One table per entry of `thresholds`, same order.
    contingency_tables: Vec<ContingencyTable>,
    probabilistic: Option<ProbabilisticComponents>,
}

/// Snapshot of the basic accumulated quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub n_samples: u64,
    pub mean_forecast: f64,
    pub mean_obs: f64,
    pub thresholds: Vec<f64>,
}

impl Statistics {
    /// Creates empty statistics for the given categorical thresholds.
    pub fn new(thresholds: &[f64]) -> Self {
        let thresholds = normalize_thresholds(thresholds);
        let contingency_tables = vec![ContingencyTable::default(); thresholds.len()];
        Self {
            thresholds,
            n_samples: 0,
            sum_forecast: 0.0,
            sum_obs: 0.0,
            sum_forecast_squared: 0.0,
            sum_obs_squared: 0.0,
            sum_abs_error: 0.0,
            sum_squared_error: 0.0,
            contingency_tables,
            probabilistic: None,
        }
    }

    /// Folds paired forecast/observation values into the running statistics.
    ///
    /// Pairs where either value is missing are dropped before anything is
    /// touched. When `probabilistic` is given, each valid pair whose
    /// probability is also present contributes `(p - o)^2` to the Brier sum;
    /// observations are expected to be binary (0/1) in that case.
    ///
    /// Returns the number of valid pairs folded in. An all-missing input is a
    /// no-op returning 0.
    ///
    /// # Errors
    ///
    /// Returns [`AccumError::LengthMismatch`] if the slices differ in length.
    pub fn update(
        &mut self,
        forecasts: &[f64],
        observations: &[f64],
        probabilistic: Option<&[f64]>,
    ) -> Result<usize, AccumError> {
        if observations.len() != forecasts.len() {
            return Err(AccumError::LengthMismatch {
                input: "observations",
                expected: forecasts.len(),
                got: observations.len(),
            });
        }
        if let Some(probs) = probabilistic
            && probs.len() != forecasts.len()
        {
            return Err(AccumError::LengthMismatch {
                input: "probabilistic forecasts",
                expected: forecasts.len(),
                got: probs.len(),
            });
        }

        let mut n_valid = 0;
        for (idx, (&f, &o)) in forecasts.iter().zip(observations).enumerate() {
            if is_missing(f) || is_missing(o) {
                continue;
            }
            self.fold_pair(f, o);
            n_valid += 1;

            if let Some(probs) = probabilistic {
                let p = probs[idx];
                if !is_missing(p) {
                    let components = self.probabilistic.get_or_insert_with(Default::default);
                    components.brier_sum += (p - o) * (p - o);
                    components.n_pairs += 1;
                }
            }
        }
        Ok(n_valid)
    }

    /// Folds a single pair. Returns `false` (and changes nothing) if either
    /// value is missing.
    #[inline]
    pub fn update_pair(&mut self, forecast: f64, observation: f64) -> bool {
        if is_missing(forecast) || is_missing(observation) {
            return false;
        }
        self.fold_pair(forecast, observation);
        true
    }

    #[inline]
    fn fold_pair(&mut self, f: f64, o: f64) {
        let err = f - o;
        self.n_samples += 1;
        self.sum_forecast += f;
        self.sum_obs += o;
        self.sum_forecast_squared += f * f;
        self.sum_obs_squared += o * o;
        self.sum_abs_error += err.abs();
        self.sum_squared_error += err * err;
        for (table, &threshold) in self.contingency_tables.iter_mut().zip(&self.thresholds) {
            table.record(f, o, threshold);
        }
    }

    /// Adds every running sum and contingency counter of `other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`AccumError::ThresholdMismatch`] if the threshold sets differ;
    /// `self` is left untouched in that case.
    pub fn merge(&mut self, other: &Statistics) -> Result<(), AccumError> {
        if !self.same_thresholds(other) {
            return Err(AccumError::ThresholdMismatch {
                left: self.thresholds.clone(),
                right: other.thresholds.clone(),
            });
        }

        self.n_samples += other.n_samples;
        self.sum_forecast += other.sum_forecast;
        self.sum_obs += other.sum_obs;
        self.sum_forecast_squared += other.sum_forecast_squared;
        self.sum_obs_squared += other.sum_obs_squared;
        self.sum_abs_error += other.sum_abs_error;
        self.sum_squared_error += other.sum_squared_error;
        for (mine, theirs) in self
            .contingency_tables
            .iter_mut()
            .zip(&other.contingency_tables)
        {
            mine.merge(theirs);
        }
        if let Some(theirs) = other.probabilistic {
            let mine = self.probabilistic.get_or_insert_with(Default::default);
            mine.brier_sum += theirs.brier_sum;
            mine.n_pairs += theirs.n_pairs;
        }
        Ok(())
    }

    /// Returns `true` if both threshold sets are identical.
    pub fn same_thresholds(&self, other: &Statistics) -> bool {
        self.thresholds.len() == other.thresholds.len()
            && self
                .thresholds
                .iter()
                .zip(&other.thresholds)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Returns a zeroed copy that shares this threshold set.
    pub fn empty_like(&self) -> Self {
        Self::new(&self.thresholds)
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn n_samples(&self) -> u64 {
        self.n_samples
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    pub fn sum_forecast(&self) -> f64 {
        self.sum_forecast
    }

    pub fn sum_obs(&self) -> f64 {
        self.sum_obs
    }

    pub fn sum_forecast_squared(&self) -> f64 {
        self.sum_forecast_squared
    }

    pub fn sum_obs_squared(&self) -> f64 {
        self.sum_obs_squared
    }

    pub fn sum_abs_error(&self) -> f64 {
        self.sum_abs_error
    }

    pub fn sum_squared_error(&self) -> f64 {
        self.sum_squared_error
    }

    pub fn probabilistic(&self) -> Option<&ProbabilisticComponents> {
        self.probabilistic.as_ref()
    }

    /// Contingency table for `threshold`, if it was declared.
    pub fn contingency_table(&self, threshold: f64) -> Option<&ContingencyTable> {
        self.thresholds
            .iter()
            .position(|t| t.to_bits() == threshold.to_bits())
            .map(|idx| &self.contingency_tables[idx])
    }

    /// Iterates `(threshold, table)` in ascending threshold order.
    pub fn contingency_tables(&self) -> impl Iterator<Item = (f64, &ContingencyTable)> {
        self.thresholds
            .iter()
            .copied()
            .zip(self.contingency_tables.iter())
    }

    fn per_sample(&self, sum: f64) -> f64 {
        if self.n_samples == 0 {
            f64::NAN
        } else {
            sum / self.n_samples as f64
        }
    }

    pub fn mean_forecast(&self) -> f64 {
        self.per_sample(self.sum_forecast)
    }

    pub fn mean_obs(&self) -> f64 {
        self.per_sample(self.sum_obs)
    }

    pub fn mae(&self) -> f64 {
        self.per_sample(self.sum_abs_error)
    }

    pub fn bias(&self) -> f64 {
        self.per_sample(self.sum_forecast - self.sum_obs)
    }

    pub fn rmse(&self) -> f64 {
        self.per_sample(self.sum_squared_error).sqrt()
    }

    /// `mean_forecast / mean_obs`; NaN when the mean observation is within
    /// [`BIAS_RATIO_EPSILON`] of zero or there are no samples.
    pub fn bias_ratio(&self) -> f64 {
        let mean_obs = self.mean_obs();
        if mean_obs.is_nan() || mean_obs.abs() <= BIAS_RATIO_EPSILON {
            f64::NAN
        } else {
            self.mean_forecast() / mean_obs
        }
    }

    /// Mean Brier score over pairs that carried a probability.
    pub fn brier_score(&self) -> Option<f64> {
        self.probabilistic
            .filter(|p| p.n_pairs > 0)
            .map(|p| p.brier_sum / p.n_pairs as f64)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            n_samples: self.n_samples,
            mean_forecast: self.mean_forecast(),
            mean_obs: self.mean_obs(),
            thresholds: self.thresholds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_known_continuous_scores() {
        let mut stats = Statistics::new(&[]);
        let n = stats.update(&[1.0, 2.0, 3.0], &[1.5, 2.5, 2.5], None).unwrap();
        assert_eq!(n, 3);
        assert_abs_diff_eq!(stats.mae(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.bias(), -0.5 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.rmse(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.bias_ratio(), 6.0 / 6.5, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_pairs_are_excluded() {
        let mut stats = Statistics::new(&[2.0]);
        let f = [1.0, f64::NAN, 3.0, 4.0, f64::INFINITY];
        let o = [1.0, 2.0, f64::NAN, 5.0, 1.0];
        let n = stats.update(&f, &o, None).unwrap();
        assert_eq!(n, 2);
        assert_eq!(stats.n_samples(), 2);
        assert_abs_diff_eq!(stats.sum_forecast(), 5.0);
        assert_abs_diff_eq!(stats.sum_obs(), 6.0);
        assert_eq!(stats.contingency_table(2.0).unwrap().total(), 2);
    }

    #[test]
    fn test_all_missing_is_noop() {
        let mut stats = Statistics::new(&[1.0]);
        let before = stats.clone();
        let n = stats
            .update(&[f64::NAN, f64::NAN], &[1.0, f64::NAN], None)
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(stats, before);
    }

    #[test]
    fn test_length_mismatch() {
        let mut stats = Statistics::new(&[]);
        let err = stats.update(&[1.0, 2.0], &[1.0], None).unwrap_err();
        assert!(matches!(
            err,
            AccumError::LengthMismatch {
                input: "observations",
                expected: 2,
                got: 1
            }
        ));
        let err = stats
            .update(&[1.0, 2.0], &[1.0, 2.0], Some(&[0.5]))
            .unwrap_err();
        assert!(matches!(err, AccumError::LengthMismatch { got: 1, .. }));
    }

    #[test]
    fn test_zero_samples_are_nan() {
        let stats = Statistics::new(&[0.0]);
        assert!(stats.mae().is_nan());
        assert!(stats.bias().is_nan());
        assert!(stats.rmse().is_nan());
        assert!(stats.bias_ratio().is_nan());
        assert!(stats.brier_score().is_none());
    }

    #[test]
    fn test_bias_ratio_undefined_for_zero_mean_obs() {
        let mut stats = Statistics::new(&[]);
        stats.update(&[1.0, 1.0], &[-1.0, 1.0], None).unwrap();
        assert!(stats.bias_ratio().is_nan());
        assert_abs_diff_eq!(stats.bias(), 1.0);
    }

    #[test]
    fn test_thresholds_are_normalized() {
        let stats = Statistics::new(&[5.0, 1.0, f64::NAN, 5.0, 3.0]);
        assert_eq!(stats.thresholds(), &[1.0, 3.0, 5.0]);
        assert!(stats.same_thresholds(&Statistics::new(&[3.0, 5.0, 1.0])));
    }

    #[test]
    fn test_merge_adds_sums() {
        let mut a = Statistics::new(&[2.0]);
        a.update(&[1.0, 3.0], &[2.0, 2.0], None).unwrap();
        let mut b = Statistics::new(&[2.0]);
        b.update(&[4.0], &[1.0], None).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.n_samples(), 3);
        assert_abs_diff_eq!(a.sum_forecast(), 8.0);
        assert_abs_diff_eq!(a.sum_obs(), 5.0);
        assert_abs_diff_eq!(a.sum_squared_error(), 1.0 + 1.0 + 9.0);
        assert_eq!(
            *a.contingency_table(2.0).unwrap(),
            ContingencyTable::new(1, 1, 1, 0)
        );
    }

    #[test]
    fn test_merge_threshold_mismatch_leaves_self_untouched() {
        let mut a = Statistics::new(&[1.0]);
        a.update(&[1.0], &[1.0], None).unwrap();
        let before = a.clone();
        let b = Statistics::new(&[2.0]);
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(err, AccumError::ThresholdMismatch { .. }));
        assert_eq!(a, before);
    }

    #[test]
    fn test_brier_components() {
        let mut stats = Statistics::new(&[]);
        stats
            .update(
                &[1.0, 0.0, 1.0, 0.0],
                &[1.0, 0.0, 1.0, f64::NAN],
                Some(&[0.9, 0.2, f64::NAN, 0.5]),
            )
            .unwrap();
        assert_eq!(stats.n_samples(), 3);
        let p = stats.probabilistic().unwrap();
        assert_eq!(p.n_pairs, 2);
        assert_abs_diff_eq!(stats.brier_score().unwrap(), (0.01 + 0.04) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overflowed_sums_restore_from_json() {
        let mut stats = Statistics::new(&[1.0]);
        stats.update(&[1e200, 1e200], &[-1e200, 0.0], None).unwrap();
        assert_eq!(stats.sum_squared_error(), f64::INFINITY);
        let json = serde_json::to_string(&stats).unwrap();
        let restored: Statistics = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.sum_squared_error(), f64::INFINITY);
        assert_eq!(restored.sum_forecast(), stats.sum_forecast());
        assert_eq!(restored.n_samples(), 2);
    }

    #[test]
    fn test_summary() {
        let mut stats = Statistics::new(&[1.0]);
        stats.update(&[2.0, 4.0], &[1.0, 3.0], None).unwrap();
        let summary = stats.summary();
        assert_eq!(summary.n_samples, 2);
        assert_abs_diff_eq!(summary.mean_forecast, 3.0);
        assert_abs_diff_eq!(summary.mean_obs, 2.0);
        assert_eq!(summary.thresholds, vec![1.0]);
    }
}
