use chrono::NaiveDate;

use crate::error::EngineError;
use crate::ledger::{DateColumn, Ledger};
use crate::models::{AttendanceCell, CellWrite, StreakAlert, StreakOutcome, StreakValue};

/// Consecutive misses counted backward from the most recent meeting.
/// Empty and unrecognized cells are skipped; a present mark ends the scan.
pub fn consecutive_misses(ledger: &Ledger, row: usize, window: &[DateColumn]) -> usize {
    let mut misses = 0;
    for column in window.iter().rev() {
        match ledger.attendance(row, column.col) {
            AttendanceCell::Present => break,
            AttendanceCell::Absent => misses += 1,
            AttendanceCell::NoMeeting | AttendanceCell::Unrecognized => {}
        }
    }
    misses
}

/// Recompute the streak column for every member row as of `cutoff`.
///
/// A stored value of 3 holds until the latest eligible meeting is marked
/// present. Only changed values produce writes.
pub fn recalculate_streaks(
    ledger: &Ledger,
    cutoff: NaiveDate,
    streak_header: &str,
) -> Result<StreakOutcome, EngineError> {
    let column = ledger
        .streak_column()
        .ok_or_else(|| EngineError::StreakColumnNotFound {
            fragment: streak_header.to_string(),
        })?;
    let window = ledger.eligible_columns(cutoff);

    let mut outcome = StreakOutcome {
        column,
        ..StreakOutcome::default()
    };

    for row in 0..ledger.row_count() {
        let member = ledger.member(row);
        if member.is_empty() {
            continue;
        }

        let stored_text = ledger.cell(row, column).trim();
        let stored = StreakValue::parse(stored_text);
        let was_locked = stored.is_some_and(StreakValue::is_locked);

        if was_locked {
            let unlocked = window
                .last()
                .is_some_and(|latest| ledger.attendance(row, latest.col).is_present());
            if !unlocked {
                outcome.locked += 1;
                let capped = StreakValue::clamped(usize::from(StreakValue::LOCKED));
                if stored_text != capped.to_string() {
                    outcome
                        .writes
                        .push(CellWrite::new(Ledger::grid_row(row), column, capped.to_string()));
                }
                continue;
            }
            tracing::info!(member, "present on latest meeting, releasing lock");
        }

        let value = StreakValue::clamped(consecutive_misses(ledger, row, window));
        if stored_text == value.to_string() {
            if value.is_locked() {
                outcome.locked += 1;
            }
            continue;
        }

        outcome
            .writes
            .push(CellWrite::new(Ledger::grid_row(row), column, value.to_string()));
        if value.is_locked() {
            outcome.locked += 1;
            if !was_locked {
                outcome.alerts.push(StreakAlert {
                    member: member.to_string(),
                    streak: value,
                });
            }
        }
    }

    tracing::debug!(
        %cutoff,
        eligible = window.len(),
        writes = outcome.writes.len(),
        alerts = outcome.alerts.len(),
        "recalculated streaks"
    );
    Ok(outcome)
}
