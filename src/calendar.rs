//! Month-aligned half-open date windows.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::errors::{AnalysisError, Result};

/// Longest calendar month, in days. Adding `31 * span` days to the first of a
/// month always lands inside the month `span` months later for spans 1 and 2.
const MAX_MONTH_DAYS: i64 = 31;

/// A half-open `[start, end)` interval of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    /// Builds the window for `year-month-day` spanning `months_span` months.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidDate`] if the components do not form a
    /// real calendar date or the span is not 1 or 2.
    pub fn from_ymd(year: i32, month: u32, day: u32, months_span: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            AnalysisError::InvalidDate(format!("{year:04}-{month:02}-{day:02} is out of range"))
        })?;
        month_window(date, months_span)
    }

    /// True iff `start <= date < end`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// The one-month window of the calendar month just before `start`.
    ///
    /// Its `end` is exactly this window's `start`, so the two never share a day.
    pub fn previous_month(&self) -> Result<Self> {
        let last_day_before = self.start.pred_opt().ok_or_else(|| {
            AnalysisError::InvalidDate(format!("no month precedes {}", self.start))
        })?;
        month_window(last_day_before, 1)
    }
}

/// Returns the window starting on the first day of `date`'s month and ending
/// on the first day of the month `months_span` months later.
pub fn month_window(date: NaiveDate, months_span: u32) -> Result<MonthWindow> {
    if !(1..=2).contains(&months_span) {
        return Err(AnalysisError::InvalidDate(format!(
            "unsupported month span {months_span}, expected 1 or 2"
        )));
    }

    let start = first_of_month(date)?;
    let landed = start
        .checked_add_signed(Duration::days(MAX_MONTH_DAYS * i64::from(months_span)))
        .ok_or_else(|| AnalysisError::InvalidDate(format!("{start} overflows the calendar")))?;
    let end = first_of_month(landed)?;

    Ok(MonthWindow { start, end })
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| AnalysisError::InvalidDate(format!("no first day for month of {date}")))
}

/// Parses a `YYYY-MM-DD` reference date.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidDateFormat`] if the string does not parse.
pub fn parse_reference_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        AnalysisError::InvalidDateFormat {
            input: input.to_string(),
        }
    })
}
