//! Date window computation and normalization of the dates shown on result cards.
//!
//! The results page prints dates without a year (`"September 3"`), relative
//! stamps for recent items (`"3 hours ago"`) and full dates for older ones
//! (`"March 3, 2023"`). Everything is normalized to a [`NaiveDate`] and
//! reported as `MM-DD`.

use chrono::{Datelike, Duration, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::instrument;

static RELATIVE_RECENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+\s*(?:s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?)\s+ago$").unwrap()
});

static RELATIVE_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)\s*(?:d|days?)\s+ago$").unwrap());

/// Raised when a result card's date text cannot be read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("empty date text")]
    Empty,
    #[error("unrecognized date text: {0:?}")]
    Unrecognized(String),
}

/// Inclusive range of publication dates to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window covering the current month plus `months - 1` prior months, ending today.
    ///
    /// `0` and `1` both select the current month only; negative values are
    /// treated as `1`.
    #[instrument(level = "debug")]
    pub fn for_months(months: i64, today: NaiveDate) -> Self {
        let back = u32::try_from(months.max(1) - 1).unwrap_or(u32::MAX);
        let first_of_month = today.with_day(1).unwrap_or(today);
        let start = first_of_month
            .checked_sub_months(Months::new(back))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn start_label(&self) -> String {
        month_day(self.start)
    }

    pub fn end_label(&self) -> String {
        month_day(self.end)
    }
}

/// Format a date as `MM-DD`.
pub fn month_day(date: NaiveDate) -> String {
    date.format("%m-%d").to_string()
}

/// Parse the date text of a result card relative to `today`.
///
/// Year-less dates are placed in the current year, or in the previous one if
/// that would put them in the future.
pub fn normalize_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(DateError::Empty);
    }

    let lower = text.to_lowercase();
    if lower == "just now" || lower == "now" || RELATIVE_RECENT.is_match(&lower) {
        return Ok(today);
    }
    if lower == "yesterday" {
        return Ok(today - Duration::days(1));
    }
    if let Some(caps) = RELATIVE_DAYS.captures(&lower) {
        return caps[1]
            .parse::<i64>()
            .ok()
            .and_then(Duration::try_days)
            .and_then(|ago| today.checked_sub_signed(ago))
            .filter(|date| date.year() > 0)
            .ok_or(DateError::Unrecognized(text));
    }

    // "Sept. 3" -> "Sep 3"
    let cleaned = text.replace('.', "").replace("Sept ", "Sep ");

    for format in ["%B %d, %Y", "%B %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Ok(date);
        }
    }

    let with_year = format!("{} {}", cleaned.trim_end_matches(','), today.year());
    let date = NaiveDate::parse_from_str(&with_year, "%B %d %Y")
        .map_err(|_| DateError::Unrecognized(text.clone()))?;
    if date > today {
        return date
            .with_year(today.year() - 1)
            .ok_or(DateError::Unrecognized(text));
    }
    Ok(date)
}
