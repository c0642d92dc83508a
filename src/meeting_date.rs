use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use regex::Regex;

const HEADER_FORMAT: &str = "%d/%m/%Y";

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").expect("valid date pattern"));

pub fn format_header(date: NaiveDate) -> String {
    date.format(HEADER_FORMAT).to_string()
}

/// Parse a ledger header of the exact form `DD/MM/YYYY`.
pub fn parse_header(header: &str) -> Option<NaiveDate> {
    let bytes = header.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(header, HEADER_FORMAT).ok()
}

/// First `DD.MM.YYYY` group in a screenshot file name.
pub fn date_from_filename(name: &str) -> Option<NaiveDate> {
    let caps = FILENAME_DATE.captures(name)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The meeting this date belongs to: the date itself on the meeting weekday,
/// otherwise the most recent earlier meeting weekday.
pub fn latest_meeting_day(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let back = (date.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    date - Duration::days(back as i64)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Pick the meeting date for a run: explicit date, then the transcript's
/// file name, then the meeting preceding the upload day (or today).
pub fn resolve_meeting_date(
    explicit: Option<NaiveDate>,
    file_name: Option<&str>,
    uploaded: Option<NaiveDate>,
    weekday: Weekday,
) -> NaiveDate {
    if let Some(date) = explicit {
        return date;
    }
    if let Some(date) = file_name.and_then(date_from_filename) {
        tracing::info!(%date, "meeting date taken from file name");
        return date;
    }
    let reference = uploaded.unwrap_or_else(today);
    let date = latest_meeting_day(reference, weekday);
    tracing::info!(%reference, %date, "meeting date assigned from upload day");
    date
}
