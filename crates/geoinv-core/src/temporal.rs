//! Temporal window resolution
//!
//! A window combines an inclusive calendar range with an inclusive
//! day-of-year range; a date qualifies only if it satisfies both. The
//! day-of-year range lets a query span many years while keeping only a
//! seasonal slice (e.g. `--days 152,244` for boreal summer).

use crate::error::{GeoinvError, Result};
use chrono::{Datelike, NaiveDate};

/// Inclusive calendar and day-of-year bounds for an inventory query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_day: u32,
    pub end_day: u32,
}

impl DateWindow {
    /// Parse a window from the CLI forms `"start,end"` and `"d1,d2"`.
    ///
    /// Dates accept `YYYY-MM-DD` or a bare `YYYY` (expanded to Jan 1 for
    /// the start and Dec 31 for the end). Both arguments are optional:
    /// the date range defaults to 1984-01-01..2050-12-31 and the
    /// day-of-year range to 1..366.
    pub fn parse(dates: Option<&str>, days: Option<&str>) -> Result<Self> {
        let (start_date, end_date) = match dates {
            None => (ymd(1984, 1, 1), ymd(2050, 12, 31)),
            Some(input) => parse_date_range(input)?,
        };
        if start_date > end_date {
            return Err(GeoinvError::InvalidDateRange {
                input: dates.unwrap_or_default().to_string(),
                reason: "start date is after end date".to_string(),
            });
        }

        let (start_day, end_day) = match days {
            None => (1, 366),
            Some(input) => parse_day_range(input)?,
        };

        Ok(Self {
            start_date,
            end_date,
            start_day,
            end_day,
        })
    }

    /// A date qualifies only if both the calendar range and the
    /// day-of-year range hold.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let day = date.ordinal();
        self.start_date <= date
            && date <= self.end_date
            && self.start_day <= day
            && day <= self.end_day
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::parse(None, None).expect("default window is valid")
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("static date is valid")
}

fn parse_date_range(input: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = |reason: &str| GeoinvError::InvalidDateRange {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = input.split(',');
    let start = parts.next().ok_or_else(|| invalid("empty range"))?;
    let end = parts.next().unwrap_or(start);
    if parts.next().is_some() {
        return Err(invalid("expected at most two comma-separated dates"));
    }

    let start = parse_date(start.trim(), false)
        .ok_or_else(|| invalid("start date must be YYYY-MM-DD or YYYY"))?;
    let end = parse_date(end.trim(), true)
        .ok_or_else(|| invalid("end date must be YYYY-MM-DD or YYYY"))?;
    Ok((start, end))
}

/// A bare year expands to Jan 1 or Dec 31 depending on which end of the
/// range it sits at.
fn parse_date(s: &str, range_end: bool) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    let year: i32 = s.parse().ok()?;
    if range_end {
        NaiveDate::from_ymd_opt(year, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(year, 1, 1)
    }
}

fn parse_day_range(input: &str) -> Result<(u32, u32)> {
    let invalid = |reason: &str| GeoinvError::InvalidDayRange {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = input.split(',');
    let start = parts.next().ok_or_else(|| invalid("empty range"))?;
    let end = parts.next().unwrap_or(start);
    if parts.next().is_some() {
        return Err(invalid("expected at most two comma-separated days"));
    }

    let start: u32 = start.trim().parse().map_err(|_| invalid("days must be integers"))?;
    let end: u32 = end.trim().parse().map_err(|_| invalid("days must be integers"))?;
    if !(1..=366).contains(&start) || !(1..=366).contains(&end) {
        return Err(invalid("days must be within 1..=366"));
    }
    if start > end {
        return Err(invalid("start day is after end day"));
    }
    Ok((start, end))
}
