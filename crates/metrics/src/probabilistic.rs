//! Probabilistic scores: Brier score, Brier skill score, reliability and ROC.
//!
//! Inputs are probability forecasts in `[0, 1]` paired with binary (0/1)
//! observations. Pairs with a missing value on either side are dropped.

use serde::Serialize;

use crate::continuous::valid_pairs;
use crate::error::MetricsError;

/// Default number of probability bins in a reliability diagram.
pub const DEFAULT_RELIABILITY_BINS: usize = 10;

/// Default number of probability thresholds on an ROC curve.
pub const DEFAULT_ROC_THRESHOLDS: usize = 100;

/// Mean squared probability error. NaN when there is no valid pair.
pub fn brier_score(probabilities: &[f64], observations: &[f64]) -> f64 {
    let (sum, n) = valid_pairs(probabilities, observations)
        .fold((0.0, 0usize), |(s, n), (p, o)| (s + (p - o) * (p - o), n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// `1 - BS / BS_clim`, where `BS_clim` is the Brier score of a constant
/// `climatology` forecast.
///
/// When `climatology` is `None` the observed base rate over the valid pairs is
/// used. Returns NaN when there are no valid pairs or `BS_clim` is zero.
pub fn brier_skill_score(
    probabilities: &[f64],
    observations: &[f64],
    climatology: Option<f64>,
) -> f64 {
    let bs = brier_score(probabilities, observations);
    if bs.is_nan() {
        return f64::NAN;
    }

    let valid_obs: Vec<f64> = valid_pairs(probabilities, observations)
        .map(|(_, o)| o)
        .collect();
    let n = valid_obs.len() as f64;
    let clim = climatology.unwrap_or_else(|| valid_obs.iter().sum::<f64>() / n);
    let bs_clim = valid_obs.iter().map(|o| (clim - o) * (clim - o)).sum::<f64>() / n;

    if bs_clim == 0.0 {
        return f64::NAN;
    }
    1.0 - bs / bs_clim
}

/// Reliability diagram components, one entry per probability bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityDiagram {
    pub bin_centers: Vec<f64>,
    /// Mean observation in each bin; NaN for empty bins.
    pub observed_frequency: Vec<f64>,
    /// Mean forecast probability in each bin; NaN for empty bins.
    pub forecast_probability: Vec<f64>,
    pub counts: Vec<u64>,
}

/// Bins forecasts into `n_bins` equal-width probability bins over `[0, 1]`.
///
/// Bin `k` covers `[k/n, (k+1)/n)`; probabilities outside `[0, 1)` are
/// clamped into the first or last bin.
///
/// # Errors
///
/// Returns [`MetricsError::InvalidBinCount`] if `n_bins` is zero.
pub fn reliability(
    probabilities: &[f64],
    observations: &[f64],
    n_bins: usize,
) -> Result<ReliabilityDiagram, MetricsError> {
    if n_bins == 0 {
        return Err(MetricsError::InvalidBinCount { n_bins });
    }

    let width = 1.0 / n_bins as f64;
    let bin_centers = (0..n_bins).map(|k| (k as f64 + 0.5) * width).collect();

    let mut sum_obs = vec![0.0; n_bins];
    let mut sum_prob = vec![0.0; n_bins];
    let mut counts = vec![0u64; n_bins];
    for (p, o) in valid_pairs(probabilities, observations) {
        let bin = ((p * n_bins as f64).floor().max(0.0) as usize).min(n_bins - 1);
        sum_obs[bin] += o;
        sum_prob[bin] += p;
        counts[bin] += 1;
    }

    let per_bin = |sums: &[f64]| -> Vec<f64> {
        sums.iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { f64::NAN } else { s / c as f64 })
            .collect()
    };

    Ok(ReliabilityDiagram {
        bin_centers,
        observed_frequency: per_bin(&sum_obs),
        forecast_probability: per_bin(&sum_prob),
        counts,
    })
}

/// Points of a relative operating characteristic curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub thresholds: Vec<f64>,
    pub hit_rates: Vec<f64>,
    pub false_alarm_rates: Vec<f64>,
}

impl RocCurve {
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

/// Evaluates hit rate and false-alarm rate at `n_thresholds` probability
/// thresholds evenly spaced over `[0, 1]`.
///
/// A forecast is "yes" when `p >= threshold`; an observation is "yes" when
/// `o >= 0.5`. Rates with an empty denominator are reported as 0. An input
/// without valid pairs yields an empty curve.
///
/// # Errors
///
/// Returns [`MetricsError::InvalidRocThresholds`] if `n_thresholds < 2`.
pub fn roc_curve(
    probabilities: &[f64],
    observations: &[f64],
    n_thresholds: usize,
) -> Result<RocCurve, MetricsError> {
    if n_thresholds < 2 {
        return Err(MetricsError::InvalidRocThresholds { n_thresholds });
    }

    let pairs: Vec<(f64, bool)> = valid_pairs(probabilities, observations)
        .map(|(p, o)| (p, o >= 0.5))
        .collect();
    if pairs.is_empty() {
        return Ok(RocCurve {
            thresholds: Vec::new(),
            hit_rates: Vec::new(),
            false_alarm_rates: Vec::new(),
        });
    }

    let step = 1.0 / (n_thresholds - 1) as f64;
    let thresholds: Vec<f64> = (0..n_thresholds).map(|k| k as f64 * step).collect();
    let mut hit_rates = Vec::with_capacity(n_thresholds);
    let mut false_alarm_rates = Vec::with_capacity(n_thresholds);

    for &t in &thresholds {
        let (mut tp, mut fp, mut fn_, mut tn) = (0u64, 0u64, 0u64, 0u64);
        for &(p, observed) in &pairs {
            match (p >= t, observed) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }
        hit_rates.push(if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        });
        false_alarm_rates.push(if fp + tn > 0 {
            fp as f64 / (fp + tn) as f64
        } else {
            0.0
        });
    }

    Ok(RocCurve {
        thresholds,
        hit_rates,
        false_alarm_rates,
    })
}
