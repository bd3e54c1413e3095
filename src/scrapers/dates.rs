//! Publication date parsing.
//!
//! Every source marks up dates differently. Each parser here turns one
//! markup convention into a [`NaiveDate`]; [`format_date`] produces the
//! `YYYY-MM-DD` string that is the only date form ever written to the store.
//! Unparseable input yields `None`, never a panic.

use chrono::{DateTime, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-zà-ù]{3,10})\.?,?\s+(\d{4})\b",
    )
    .expect("valid day-month-year pattern")
});

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
    )
    .expect("valid month-day-year pattern")
});

static URL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/(\d{2})(?:/|$)")
        .expect("valid URL date pattern")
});

const ITALIAN_MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Render a date in the canonical stored form.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Month number for a full or three-letter month name in `table`.
fn month_number(name: &str, table: &[&str; 12]) -> Option<u32> {
    let name = name.to_lowercase();
    if name.chars().count() < 3 {
        return None;
    }
    let abbr = name.chars().count() == 3;
    table
        .iter()
        .position(|month| *month == name || (abbr && month.starts_with(&name)))
        .map(|idx| idx as u32 + 1)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Parse an Italian label such as `Pubblicato il 12 marzo 2024` or `3 GIU 2023`.
pub fn parse_italian_label(text: &str) -> Option<NaiveDate> {
    DAY_MONTH_YEAR.captures_iter(text).find_map(|caps| {
        let month = month_number(&caps[2], &ITALIAN_MONTHS)?;
        ymd(&caps[3], month, &caps[1])
    })
}

/// Parse an ISO 8601 attribute value (`2024-03-12T09:30:00+01:00` or `2024-03-12`).
///
/// Timestamps keep the calendar date of their own offset.
pub fn parse_iso(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

/// Parse the `/YYYY/MM/DD/` segment of an article URL.
pub fn parse_url_path(url: &str) -> Option<NaiveDate> {
    let caps = URL_DATE.captures(url)?;
    ymd(&caps[1], caps[2].parse().ok()?, &caps[3])
}

/// Parse an English label such as `January 14, 2024` or `14 Jan 2024`.
pub fn parse_english_label(text: &str) -> Option<NaiveDate> {
    let month_first = MONTH_DAY_YEAR.captures_iter(text).find_map(|caps| {
        let month = month_number(&caps[1], &ENGLISH_MONTHS)?;
        ymd(&caps[3], month, &caps[2])
    });
    month_first.or_else(|| {
        DAY_MONTH_YEAR.captures_iter(text).find_map(|caps| {
            let month = month_number(&caps[2], &ENGLISH_MONTHS)?;
            ymd(&caps[3], month, &caps[1])
        })
    })
}

/// Parse an English label and shift it forward one day.
///
/// The source that uses this convention stamps articles with the day before
/// they actually go live; the shift rolls over month and year boundaries.
pub fn parse_english_label_next_day(text: &str) -> Option<NaiveDate> {
    parse_english_label(text)?.checked_add_days(Days::new(1))
}
