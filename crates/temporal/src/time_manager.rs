//! Verification time expansion and grouping.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::TemporalError;
use crate::types::{GroupKey, HourGroup, TemporalGroup, TimeEntry};

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, TemporalError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| TemporalError::InvalidDate {
        value: value.to_string(),
    })
}

/// Valid time of a forecast initialised at `init_hour` on `date` with lead
/// `forecast_hour`. Leads past midnight roll into following days.
pub fn compute_valid_time(date: NaiveDate, init_hour: u32, forecast_hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
        + Duration::hours(i64::from(init_hour) + i64::from(forecast_hour))
}

/// Inclusive date range crossed with init-hour and forecast-hour groups.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeManager {
    start_date: NaiveDate,
    end_date: NaiveDate,
    init_hour_groups: Vec<HourGroup>,
    forecast_hour_groups: Vec<HourGroup>,
}

impl TimeManager {
    /// # Errors
    ///
    /// - [`TemporalError::InvalidDateRange`] if `end_date < start_date`
    /// - [`TemporalError::EmptyGroup`] for a group without hours
    /// - [`TemporalError::DuplicateGroup`] for repeated group ids
    /// - [`TemporalError::InvalidInitHour`] for an init hour above 23
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        init_hour_groups: Vec<HourGroup>,
        forecast_hour_groups: Vec<HourGroup>,
    ) -> Result<Self, TemporalError> {
        if end_date < start_date {
            return Err(TemporalError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        validate_groups(&init_hour_groups)?;
        validate_groups(&forecast_hour_groups)?;
        for group in &init_hour_groups {
            if let Some(&hour) = group.hours.iter().find(|&&h| h > 23) {
                return Err(TemporalError::InvalidInitHour {
                    group_id: group.group_id.clone(),
                    hour,
                });
            }
        }
        Ok(Self {
            start_date,
            end_date,
            init_hour_groups,
            forecast_hour_groups,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn init_hour_groups(&self) -> &[HourGroup] {
        &self.init_hour_groups
    }

    pub fn forecast_hour_groups(&self) -> &[HourGroup] {
        &self.forecast_hour_groups
    }

    /// Every date from start to end, inclusive.
    pub fn date_range(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }

    /// Every `(date, init hour, forecast hour)` combination.
    ///
    /// Order: date, then init group, init hour, forecast group, forecast hour.
    pub fn expand_verification_times(&self) -> Vec<TimeEntry> {
        let mut times = Vec::with_capacity(self.n_times());
        for date in self.date_range() {
            for init_group in &self.init_hour_groups {
                for &init_hour in &init_group.hours {
                    for fhour_group in &self.forecast_hour_groups {
                        for &forecast_hour in &fhour_group.hours {
                            times.push(TimeEntry {
                                date,
                                init_hour,
                                forecast_hour,
                                valid_time: compute_valid_time(date, init_hour, forecast_hour),
                                init_group_id: init_group.group_id.clone(),
                                fhour_group_id: fhour_group.group_id.clone(),
                            });
                        }
                    }
                }
            }
        }
        times
    }

    /// Times pooled by `(init group, forecast-hour group)`, in first-seen order.
    pub fn group_times_for_processing(&self) -> Vec<TemporalGroup> {
        let mut groups: Vec<TemporalGroup> = Vec::new();
        for entry in self.expand_verification_times() {
            let key = entry.group_key();
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.times.push(entry),
                None => groups.push(TemporalGroup {
                    key,
                    times: vec![entry],
                }),
            }
        }
        debug!(n_groups = groups.len(), n_times = self.n_times(), "grouped verification times");
        groups
    }

    /// Keys of every temporal group, in processing order.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        let mut keys = Vec::new();
        for init_group in &self.init_hour_groups {
            for fhour_group in &self.forecast_hour_groups {
                keys.push(GroupKey::new(&init_group.group_id, &fhour_group.group_id));
            }
        }
        keys
    }

    /// Number of entries [`expand_verification_times`](Self::expand_verification_times) yields.
    pub fn n_times(&self) -> usize {
        let n_days = (self.end_date - self.start_date).num_days() as usize + 1;
        let n_init: usize = self.init_hour_groups.iter().map(|g| g.hours.len()).sum();
        let n_fhour: usize = self.forecast_hour_groups.iter().map(|g| g.hours.len()).sum();
        n_days * n_init * n_fhour
    }
}

fn validate_groups(groups: &[HourGroup]) -> Result<(), TemporalError> {
    let mut seen = HashSet::new();
    for group in groups {
        if group.hours.is_empty() {
            return Err(TemporalError::EmptyGroup {
                group_id: group.group_id.clone(),
            });
        }
        if !seen.insert(group.group_id.as_str()) {
            return Err(TemporalError::DuplicateGroup {
                group_id: group.group_id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn manager() -> TimeManager {
        TimeManager::new(
            ymd(2024, 1, 1),
            ymd(2024, 1, 3),
            vec![HourGroup::new("00Z", [0]), HourGroup::new("12Z", [12])],
            vec![HourGroup::new("f003", [3]), HourGroup::new("day2", [24, 36])],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29").unwrap(), ymd(2024, 2, 29));
        assert!(matches!(
            parse_date("2023-02-29"),
            Err(TemporalError::InvalidDate { .. })
        ));
        assert!(parse_date("01/02/2024").is_err());
    }

    #[test]
    fn test_valid_time_rolls_over_days() {
        let vt = compute_valid_time(ymd(2024, 1, 1), 0, 6);
        assert_eq!(vt, ymd(2024, 1, 1).and_hms_opt(6, 0, 0).unwrap());
        let vt = compute_valid_time(ymd(2024, 12, 31), 18, 30);
        assert_eq!(vt, ymd(2025, 1, 2).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let tm = manager();
        assert_eq!(
            tm.date_range(),
            vec![ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 1, 3)]
        );
    }

    #[test]
    fn test_expansion_order() {
        let tm = manager();
        let times = tm.expand_verification_times();
        assert_eq!(times.len(), 3 * 2 * 3);
        assert_eq!(times.len(), tm.n_times());
        let first: Vec<(u32, u32)> = times[..6]
            .iter()
            .map(|t| (t.init_hour, t.forecast_hour))
            .collect();
        assert_eq!(first, vec![(0, 3), (0, 24), (0, 36), (12, 3), (12, 24), (12, 36)]);
        assert!(times[..6].iter().all(|t| t.date == ymd(2024, 1, 1)));
        assert_eq!(times[4].fhour_group_id, "day2");
        assert_eq!(
            times[5].valid_time,
            ymd(2024, 1, 3).and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_grouping_first_seen_order() {
        let tm = manager();
        let groups = tm.group_times_for_processing();
        let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["00Z/f003", "00Z/day2", "12Z/f003", "12Z/day2"]);
        assert_eq!(groups[0].times.len(), 3);
        assert_eq!(groups[1].times.len(), 6);
        assert_eq!(
            tm.group_keys(),
            groups.iter().map(|g| g.key.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_validation() {
        let groups = || vec![HourGroup::new("00Z", [0])];
        assert!(matches!(
            TimeManager::new(ymd(2024, 1, 2), ymd(2024, 1, 1), groups(), groups()),
            Err(TemporalError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            TimeManager::new(
                ymd(2024, 1, 1),
                ymd(2024, 1, 1),
                vec![HourGroup::new("bad", [25])],
                groups()
            ),
            Err(TemporalError::InvalidInitHour { hour: 25, .. })
        ));
        assert!(matches!(
            TimeManager::new(
                ymd(2024, 1, 1),
                ymd(2024, 1, 1),
                groups(),
                vec![HourGroup::new("f", Vec::<u32>::new())]
            ),
            Err(TemporalError::EmptyGroup { .. })
        ));
        assert!(matches!(
            TimeManager::new(
                ymd(2024, 1, 1),
                ymd(2024, 1, 1),
                vec![HourGroup::new("a", [0]), HourGroup::new("a", [6])],
                groups()
            ),
            Err(TemporalError::DuplicateGroup { .. })
        ));
    }
}
