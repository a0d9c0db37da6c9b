//! Continuous scores over raw forecast/observation slices.
//!
//! Each function pairs the two slices element-wise (ignoring anything past
//! the shorter one), drops pairs with a missing value and returns NaN when no
//! valid pair remains.

use gridver_accum::{BIAS_RATIO_EPSILON, is_missing};

/// Iterates the valid `(forecast, observation)` pairs.
pub(crate) fn valid_pairs<'a>(
    forecasts: &'a [f64],
    observations: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    forecasts
        .iter()
        .zip(observations)
        .map(|(&f, &o)| (f, o))
        .filter(|&(f, o)| !is_missing(f) && !is_missing(o))
}

fn mean_of(iter: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = iter.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Mean absolute error.
pub fn mae(forecasts: &[f64], observations: &[f64]) -> f64 {
    mean_of(valid_pairs(forecasts, observations).map(|(f, o)| (f - o).abs()))
}

/// Mean error, forecast minus observation.
pub fn bias(forecasts: &[f64], observations: &[f64]) -> f64 {
    mean_of(valid_pairs(forecasts, observations).map(|(f, o)| f - o))
}

/// Root mean squared error.
pub fn rmse(forecasts: &[f64], observations: &[f64]) -> f64 {
    mean_of(valid_pairs(forecasts, observations).map(|(f, o)| (f - o) * (f - o))).sqrt()
}

/// Ratio of mean forecast to mean observation; NaN when the mean observation
/// is (numerically) zero.
pub fn bias_ratio(forecasts: &[f64], observations: &[f64]) -> f64 {
    let mean_obs = mean_of(valid_pairs(forecasts, observations).map(|(_, o)| o));
    if mean_obs.is_nan() || mean_obs.abs() <= BIAS_RATIO_EPSILON {
        return f64::NAN;
    }
    mean_of(valid_pairs(forecasts, observations).map(|(f, _)| f)) / mean_obs
}

/// Number of valid pairs.
pub fn count_valid(forecasts: &[f64], observations: &[f64]) -> usize {
    valid_pairs(forecasts, observations).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const F: [f64; 3] = [1.0, 2.0, 3.0];
    const O: [f64; 3] = [1.5, 2.5, 2.5];

    #[test]
    fn test_known_values() {
        assert_abs_diff_eq!(mae(&F, &O), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(bias(&F, &O), -0.166_666_666_666, epsilon = 1e-9);
        assert_abs_diff_eq!(rmse(&F, &O), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(bias_ratio(&F, &O), 6.0 / 6.5, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let f = [1.0, f64::NAN, 3.0, 10.0];
        let o = [2.0, 5.0, 3.0, f64::NEG_INFINITY];
        assert_eq!(count_valid(&f, &o), 2);
        assert_abs_diff_eq!(mae(&f, &o), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(bias(&f, &o), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_all_missing_is_nan() {
        let f = [f64::NAN, 1.0];
        let o = [1.0, f64::NAN];
        assert!(mae(&f, &o).is_nan());
        assert!(bias(&f, &o).is_nan());
        assert!(rmse(&f, &o).is_nan());
        assert!(bias_ratio(&f, &o).is_nan());
        assert!(mae(&[], &[]).is_nan());
    }

    #[test]
    fn test_bias_ratio_zero_mean_obs() {
        assert!(bias_ratio(&[1.0, 2.0], &[-1.0, 1.0]).is_nan());
    }
}
