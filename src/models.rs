use chrono::NaiveDate;
use serde::Serialize;

/// Canonical text written for a present member.
pub const PRESENT_TEXT: &str = "TRUE";
/// Canonical text written for an absent member.
pub const ABSENT_TEXT: &str = "FALSE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceCell {
    Present,
    Absent,
    /// Empty cell: no meeting took place that week.
    NoMeeting,
    Unrecognized,
}

impl AttendanceCell {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_uppercase();
        match value.as_str() {
            "" => AttendanceCell::NoMeeting,
            "TRUE" | "1" | "YES" => AttendanceCell::Present,
            "FALSE" | "0" | "NO" => AttendanceCell::Absent,
            _ => AttendanceCell::Unrecognized,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, AttendanceCell::Present)
    }
}

/// Consecutive-miss counter clamped to `0..=StreakValue::LOCKED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StreakValue(u8);

impl StreakValue {
    pub const LOCKED: u8 = 3;

    pub fn clamped(misses: usize) -> Self {
        StreakValue(misses.min(Self::LOCKED as usize) as u8)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim()
            .parse::<usize>()
            .ok()
            .map(StreakValue::clamped)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_locked(self) -> bool {
        self.0 == Self::LOCKED
    }
}

impl std::fmt::Display for StreakValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell assignment in grid coordinates (row 0 is the header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWrite {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl CellWrite {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Substring,
    Concatenated,
    FuzzyTokenSet,
    UniqueFirstName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberMatch {
    pub member: String,
    pub strategy: Strategy,
    pub line: Option<String>,
    pub score: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub column: usize,
    pub writes: Vec<CellWrite>,
    pub marked_present: usize,
    pub marked_absent: usize,
    pub kept_present: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakAlert {
    pub member: String,
    pub streak: StreakValue,
}

#[derive(Debug, Clone, Default)]
pub struct StreakOutcome {
    pub column: usize,
    pub writes: Vec<CellWrite>,
    pub alerts: Vec<StreakAlert>,
    pub locked: usize,
}

#[derive(Debug, Clone)]
pub struct MemberSummary {
    pub member: String,
    pub attended: usize,
    pub missed: usize,
    pub streak: Option<StreakValue>,
}

impl MemberSummary {
    pub fn attendance_rate(&self) -> f64 {
        let held = self.attended + self.missed;
        if held == 0 {
            0.0
        } else {
            self.attended as f64 / held as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeetingSummary {
    pub date: NaiveDate,
    pub present: usize,
    pub recorded: usize,
}
