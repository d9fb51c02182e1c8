use crate::error::PlanError;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Identity of a defense session for conflict purposes. Two sessions
/// conflict when they share the date and start time, whatever their end.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimeKey {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format(DATE_FORMAT),
            self.start.format(TIME_FORMAT)
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self, PlanError> {
        if end <= start {
            return Err(PlanError::InvalidWindow(format!(
                "{} {}-{}",
                date.format(DATE_FORMAT),
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            )));
        }
        Ok(TimeWindow { date, start, end })
    }

    pub fn key(&self) -> TimeKey {
        TimeKey {
            date: self.date,
            start: self.start,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.key(), self.end.format(TIME_FORMAT))
    }
}

/// Parse `2025-06-14T09:00-09:30`.
impl FromStr for TimeWindow {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidWindow(s.to_owned());
        let (date, times) = s.split_once('T').ok_or_else(invalid)?;
        let (start, end) = times.split_once('-').ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid())?;
        let start = NaiveTime::parse_from_str(start, TIME_FORMAT).map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end, TIME_FORMAT).map_err(|_| invalid())?;
        TimeWindow::new(date, start, end)
    }
}

#[test]
fn test_parse_window() {
    let w: TimeWindow = "2025-06-14T09:00-09:30".parse().unwrap();
    assert_eq!(w.date, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
    assert_eq!(w.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(w.end, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    assert_eq!(w.to_string(), "2025-06-14 09:00-09:30");
    assert!("2025-06-14 09:00-09:30".parse::<TimeWindow>().is_err());
    assert!("2025-06-14T09:30-09:00".parse::<TimeWindow>().is_err());
    assert!("2025-06-14T09:30-09:30".parse::<TimeWindow>().is_err());
    assert!("2025-13-14T09:00-09:30".parse::<TimeWindow>().is_err());
}

#[test]
fn test_key_ignores_end() {
    let short: TimeWindow = "2025-06-14T09:00-09:30".parse().unwrap();
    let long: TimeWindow = "2025-06-14T09:00-10:00".parse().unwrap();
    let later: TimeWindow = "2025-06-14T09:15-09:45".parse().unwrap();
    assert_eq!(short.key(), long.key());
    assert_ne!(short.key(), later.key());
}
