use std::path::PathBuf;

use chrono::Weekday;

pub const DEFAULT_SHEET: &str = "Exposure Attendance";
pub const DEFAULT_STREAK_HEADER: &str = "# of Meetings Missed in a Row";
pub const DEFAULT_ROSTER_CACHE: &str = "members.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Minimum token-set score for a full-name line match.
    pub fuzzy_threshold: u8,
    /// Minimum token-set score for a unique first name on its own.
    pub first_name_threshold: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 85,
            first_name_threshold: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLayout {
    /// Fragment searched for in the header row to find the streak column.
    pub streak_header: String,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            streak_header: DEFAULT_STREAK_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LedgerLocation {
    Csv(PathBuf),
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sheet: String,
    pub ledger: LedgerLocation,
    pub roster_cache: PathBuf,
    pub layout: LedgerLayout,
    pub matching: MatchConfig,
    pub meeting_weekday: Weekday,
}

pub fn parse_weekday(raw: &str) -> Result<Weekday, String> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("unknown weekday '{raw}' (expected e.g. mon, thu, friday)"))
}

pub fn parse_threshold(raw: &str) -> Result<u8, String> {
    let value: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("threshold '{raw}' is not a number"))?;
    if value > 100 {
        return Err(format!("threshold {value} is above 100"));
    }
    Ok(value)
}
