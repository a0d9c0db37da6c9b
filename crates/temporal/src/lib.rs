//! Verification time expansion.
//!
//! A [`TimeManager`] crosses an inclusive date range with named groups of
//! initialisation hours and forecast leads. Each combination becomes a
//! [`TimeEntry`] with its valid time; entries sharing an init group and a
//! forecast-hour group form one [`TemporalGroup`], the population whose
//! statistics are merged together.

mod error;
pub mod time_manager;
pub mod types;

pub use error::TemporalError;
pub use time_manager::{TimeManager, compute_valid_time, parse_date};
pub use types::{GroupKey, HourGroup, TemporalGroup, TimeEntry};
