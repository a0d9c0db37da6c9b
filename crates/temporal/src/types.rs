//! Hour groups, verification time entries and temporal processing groups.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time_manager::compute_valid_time;

/// A named set of hours (initialisation hours or forecast leads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourGroup {
    pub group_id: String,
    pub hours: Vec<u32>,
}

impl HourGroup {
    pub fn new(group_id: impl Into<String>, hours: impl IntoIterator<Item = u32>) -> Self {
        Self {
            group_id: group_id.into(),
            hours: hours.into_iter().collect(),
        }
    }
}

/// Identity of a temporal processing group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub init_group_id: String,
    pub fhour_group_id: String,
}

impl GroupKey {
    pub fn new(init_group_id: impl Into<String>, fhour_group_id: impl Into<String>) -> Self {
        Self {
            init_group_id: init_group_id.into(),
            fhour_group_id: fhour_group_id.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.init_group_id, self.fhour_group_id)
    }
}

/// One forecast to verify: init date and hour, lead, and derived valid time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub date: NaiveDate,
    pub init_hour: u32,
    pub forecast_hour: u32,
    pub valid_time: NaiveDateTime,
    pub init_group_id: String,
    pub fhour_group_id: String,
}

impl TimeEntry {
    /// An entry with its valid time computed from the other fields.
    pub fn new(
        date: NaiveDate,
        init_hour: u32,
        forecast_hour: u32,
        init_group_id: impl Into<String>,
        fhour_group_id: impl Into<String>,
    ) -> Self {
        Self {
            date,
            init_hour,
            forecast_hour,
            valid_time: compute_valid_time(date, init_hour, forecast_hour),
            init_group_id: init_group_id.into(),
            fhour_group_id: fhour_group_id.into(),
        }
    }

    /// Initialisation time of the forecast.
    pub fn init_time(&self) -> NaiveDateTime {
        compute_valid_time(self.date, self.init_hour, 0)
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.init_group_id, &self.fhour_group_id)
    }
}

impl fmt::Display for TimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}Z f{:03} (valid {})",
            self.date, self.init_hour, self.forecast_hour, self.valid_time
        )
    }
}

/// Times whose statistics pool into one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalGroup {
    pub key: GroupKey,
    pub times: Vec<TimeEntry>,
}

impl TemporalGroup {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
