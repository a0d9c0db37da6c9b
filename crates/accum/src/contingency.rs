//! Two-by-two contingency table for one categorical threshold.

use serde::{Deserialize, Serialize};

use crate::statistics::is_missing;

/// Hit / miss / false-alarm / correct-negative counts at one threshold.
///
/// An event is "yes" when the value is greater than or equal to the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Forecast yes, observed yes.
    pub hits: u64,
    /// Forecast no, observed yes.
    pub misses: u64,
    /// Forecast yes, observed no.
    pub false_alarms: u64,
    /// Forecast no, observed no.
    pub correct_negatives: u64,
}

impl ContingencyTable {
    /// Builds a table directly from counts.
    pub fn new(hits: u64, misses: u64, false_alarms: u64, correct_negatives: u64) -> Self {
        Self {
            hits,
            misses,
            false_alarms,
            correct_negatives,
        }
    }

    /// Builds a table from paired slices, skipping pairs with a missing value.
    ///
    /// Pairs beyond the shorter slice are ignored.
    pub fn from_pairs(forecasts: &[f64], observations: &[f64], threshold: f64) -> Self {
        let mut table = Self::default();
        for (&f, &o) in forecasts.iter().zip(observations) {
            if is_missing(f) || is_missing(o) {
                continue;
            }
            table.record(f, o, threshold);
        }
        table
    }

    /// Classifies one valid pair.
    #[inline]
    pub fn record(&mut self, forecast: f64, observation: f64, threshold: f64) {
        match (forecast >= threshold, observation >= threshold) {
            (true, true) => self.hits += 1,
            (false, true) => self.misses += 1,
            (true, false) => self.false_alarms += 1,
            (false, false) => self.correct_negatives += 1,
        }
    }

    /// Total number of classified pairs.
    pub fn total(&self) -> u64 {
        self.hits + self.misses + self.false_alarms + self.correct_negatives
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: &ContingencyTable) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.false_alarms += other.false_alarms;
        self.correct_negatives += other.correct_negatives;
    }

    /// Probability of detection, `hits / (hits + misses)`. NaN when no events were observed.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.hits + self.misses)
    }

    /// `false_alarms / (hits + false_alarms)`. NaN when no events were forecast.
    pub fn false_alarm_ratio(&self) -> f64 {
        ratio(self.false_alarms, self.hits + self.false_alarms)
    }

    /// Threat score, `hits / (hits + misses + false_alarms)`.
    pub fn critical_success_index(&self) -> f64 {
        ratio(self.hits, self.hits + self.misses + self.false_alarms)
    }

    /// Probability of false detection, `false_alarms / (false_alarms + correct_negatives)`.
    pub fn false_alarm_rate(&self) -> f64 {
        ratio(self.false_alarms, self.false_alarms + self.correct_negatives)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scores_from_known_table() {
        let table = ContingencyTable::new(10, 5, 3, 20);
        assert_abs_diff_eq!(table.hit_rate(), 10.0 / 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(table.false_alarm_ratio(), 3.0 / 13.0, epsilon = 1e-12);
        assert_abs_diff_eq!(table.critical_success_index(), 10.0 / 18.0, epsilon = 1e-12);
        assert_abs_diff_eq!(table.false_alarm_rate(), 3.0 / 23.0, epsilon = 1e-12);
        assert_eq!(table.total(), 38);
    }

    #[test]
    fn test_zero_denominators_are_nan() {
        let table = ContingencyTable::new(0, 0, 0, 7);
        assert!(table.hit_rate().is_nan());
        assert!(table.false_alarm_ratio().is_nan());
        assert!(table.critical_success_index().is_nan());
        assert_abs_diff_eq!(table.false_alarm_rate(), 0.0);
    }

    #[test]
    fn test_record_uses_greater_or_equal() {
        let mut table = ContingencyTable::default();
        table.record(2.0, 2.0, 2.0);
        table.record(1.9, 2.0, 2.0);
        table.record(2.0, 1.9, 2.0);
        table.record(1.9, 1.9, 2.0);
        assert_eq!(table, ContingencyTable::new(1, 1, 1, 1));
    }

    #[test]
    fn test_from_pairs_skips_missing() {
        let f = [1.0, 2.0, 3.0, f64::NAN, 4.0];
        let o = [1.5, 2.5, 2.5, 4.0, f64::NAN];
        let table = ContingencyTable::from_pairs(&f, &o, 2.0);
        // (1.0,1.5) cn, (2.0,2.5) hit, (3.0,2.5) hit
        assert_eq!(table, ContingencyTable::new(2, 0, 0, 1));
    }

    #[test]
    fn test_merge_adds_counters() {
        let mut a = ContingencyTable::new(1, 2, 3, 4);
        a.merge(&ContingencyTable::new(10, 20, 30, 40));
        assert_eq!(a, ContingencyTable::new(11, 22, 33, 44));
    }
}
