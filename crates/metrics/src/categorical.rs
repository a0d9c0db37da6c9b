//! Threshold-based categorical scores over raw slices.

use gridver_accum::{CategoricalScores, ContingencyTable, normalize_thresholds};

/// One [`CategoricalScores`] block per threshold, in ascending threshold order.
///
/// Thresholds are normalised the same way accumulators normalise them.
pub fn categorical_scores(
    forecasts: &[f64],
    observations: &[f64],
    thresholds: &[f64],
) -> Vec<CategoricalScores> {
    normalize_thresholds(thresholds)
        .into_iter()
        .map(|t| {
            let table = ContingencyTable::from_pairs(forecasts, observations, t);
            CategoricalScores::from_table(t, &table)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_blocks_follow_sorted_thresholds() {
        let f = [0.0, 1.0, 5.0, 12.0];
        let o = [0.0, 3.0, 6.0, 8.0];
        let blocks = categorical_scores(&f, &o, &[10.0, 2.5, 10.0]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].threshold, 2.5);
        assert_eq!(blocks[1].threshold, 10.0);

        // 2.5: (0,0) cn, (1,3) miss, (5,6) hit, (12,8) hit
        assert_eq!(blocks[0].counts, ContingencyTable::new(2, 1, 0, 1));
        assert_abs_diff_eq!(blocks[0].hit_rate, 2.0 / 3.0, epsilon = 1e-12);

        // 10: only (12,8) is a false alarm
        assert_eq!(blocks[1].counts, ContingencyTable::new(0, 0, 1, 3));
        assert!(blocks[1].hit_rate.is_nan());
        assert_abs_diff_eq!(blocks[1].false_alarm_ratio, 1.0);
    }
}
