use std::fmt::Write;

use chrono::NaiveDate;

use crate::ledger::Ledger;
use crate::models::{AttendanceCell, MeetingSummary, MemberSummary, StreakValue};

pub fn summarize_members(ledger: &Ledger, cutoff: NaiveDate) -> Vec<MemberSummary> {
    let window = ledger.eligible_columns(cutoff);
    let streak_column = ledger.streak_column();

    let mut summaries: Vec<MemberSummary> = (0..ledger.row_count())
        .filter(|&row| !ledger.member(row).is_empty())
        .map(|row| {
            let mut summary = MemberSummary {
                member: ledger.member(row).to_string(),
                attended: 0,
                missed: 0,
                streak: streak_column.and_then(|col| StreakValue::parse(ledger.cell(row, col))),
            };
            for column in window {
                match ledger.attendance(row, column.col) {
                    AttendanceCell::Present => summary.attended += 1,
                    AttendanceCell::Absent => summary.missed += 1,
                    AttendanceCell::NoMeeting | AttendanceCell::Unrecognized => {}
                }
            }
            summary
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.attendance_rate()
            .partial_cmp(&b.attendance_rate())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.member.cmp(&b.member))
    });
    summaries
}

pub fn summarize_meetings(ledger: &Ledger, cutoff: NaiveDate) -> Vec<MeetingSummary> {
    ledger
        .eligible_columns(cutoff)
        .iter()
        .rev()
        .map(|column| {
            let mut summary = MeetingSummary {
                date: column.date,
                present: 0,
                recorded: 0,
            };
            for row in 0..ledger.row_count() {
                if ledger.member(row).is_empty() {
                    continue;
                }
                match ledger.attendance(row, column.col) {
                    AttendanceCell::Present => {
                        summary.present += 1;
                        summary.recorded += 1;
                    }
                    AttendanceCell::Absent => summary.recorded += 1,
                    AttendanceCell::NoMeeting | AttendanceCell::Unrecognized => {}
                }
            }
            summary
        })
        .collect()
}

pub fn build_report(sheet: &str, cutoff: NaiveDate, ledger: &Ledger) -> String {
    let members = summarize_members(ledger, cutoff);
    let meetings = summarize_meetings(ledger, cutoff);

    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(output, "Generated for {} (meetings up to {})", sheet, cutoff);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Rate");

    if members.is_empty() {
        let _ = writeln!(output, "No members on the roster.");
    } else {
        for summary in members.iter() {
            let streak = summary
                .streak
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {}: {:.0}% ({} attended, {} missed, streak {})",
                summary.member,
                summary.attendance_rate() * 100.0,
                summary.attended,
                summary.missed,
                streak
            );
        }
    }

    let locked: Vec<&MemberSummary> = members
        .iter()
        .filter(|s| s.streak.is_some_and(StreakValue::is_locked))
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## At Miss Limit");

    if locked.is_empty() {
        let _ = writeln!(output, "No members at the miss limit.");
    } else {
        for summary in locked {
            let _ = writeln!(output, "- {}", summary.member);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Meetings");

    let held: Vec<&MeetingSummary> = meetings.iter().filter(|m| m.recorded > 0).collect();
    if held.is_empty() {
        let _ = writeln!(output, "No meetings recorded up to this date.");
    } else {
        for meeting in held.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {} of {} present",
                meeting.date.format("%d/%m/%Y"),
                meeting.present,
                meeting.recorded
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerLayout;
    use crate::ledger::fixtures::grid;

    fn ledger() -> Ledger {
        Ledger::from_grid(
            grid(&[
                &[
                    "Name",
                    "# of Meetings Missed in a Row",
                    "04/12/2025",
                    "11/12/2025",
                    "18/12/2025",
                ],
                &["Onur Celik", "0", "TRUE", "", "TRUE"],
                &["Efe Berke", "3", "FALSE", "", "FALSE"],
                &["", "", "", "", ""],
            ]),
            &LedgerLayout::default(),
        )
    }

    #[test]
    fn members_sorted_by_attendance_rate() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 12, 18).unwrap();
        let summaries = summarize_members(&ledger(), cutoff);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].member, "Efe Berke");
        assert_eq!(summaries[0].missed, 2);
        assert_eq!(summaries[1].attended, 2);
    }

    #[test]
    fn report_lists_locked_members_and_skips_cancelled_weeks() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 12, 18).unwrap();
        let report = build_report("Exposure Attendance", cutoff, &ledger());
        assert!(report.contains("# Attendance Report"));
        assert!(report.contains("## At Miss Limit\n- Efe Berke"));
        assert!(report.contains("- 18/12/2025: 1 of 2 present"));
        assert!(!report.contains("11/12/2025"));
    }
}
