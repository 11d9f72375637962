//! Relative/absolute date phrase resolution.
//!
//! Converts date phrases found in transcript text into an ISO calendar date,
//! anchored to a caller-supplied "today". Resolution order is fixed: explicit
//! "Month Day" phrases win over "tomorrow", which wins over "today"/"eod".

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Month name (full or 3-letter, whole word) followed by a day number.
static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\b\s+(\d{1,2})\b",
    )
    .expect("month-day pattern is valid")
});

static TOMORROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btomorrow\b").expect("tomorrow pattern is valid"));

static TODAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:today|eod|end of day)\b").expect("today pattern is valid")
});

/// Resolve a date phrase in `text` to a `YYYY-MM-DD` string.
///
/// The year is always `today`'s year; the resulting date is not validated
/// against the calendar or checked for being in the past. Returns `None`
/// when no phrase matches, leaving the task open-ended.
pub fn resolve_due_date(text: &str, today: NaiveDate) -> Option<String> {
    if let Some(caps) = MONTH_DAY_RE.captures(text) {
        let month = month_number(&caps[1]);
        let day: u32 = caps[2].parse().ok()?;
        return Some(format!("{:04}-{:02}-{:02}", today.year(), month, day));
    }

    if TOMORROW_RE.is_match(text) {
        return today
            .succ_opt()
            .map(|d| d.format("%Y-%m-%d").to_string());
    }

    if TODAY_RE.is_match(text) {
        return Some(today.format("%Y-%m-%d").to_string());
    }

    None
}

fn month_number(name: &str) -> u32 {
    match name.to_ascii_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        // MONTH_DAY_RE only captures the names above
        _ => 12,
    }
}
