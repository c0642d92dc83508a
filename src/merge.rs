use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::meeting_date::format_header;
use crate::models::{CellWrite, MergeOutcome, ABSENT_TEXT, PRESENT_TEXT};

/// Combine detected presence with the ledger column for `meeting_date`.
///
/// A cell that already reads as present is never downgraded, so manual
/// corrections survive re-runs. Every write is computed before any is applied;
/// if the column is missing nothing is written.
pub fn merge_attendance(
    ledger: &Ledger,
    meeting_date: NaiveDate,
    present: &HashSet<String>,
) -> Result<MergeOutcome, EngineError> {
    let column = ledger
        .column_for(meeting_date)
        .ok_or_else(|| EngineError::DateColumnNotFound {
            date: format_header(meeting_date),
            headers: ledger.headers().to_vec(),
        })?;

    let mut outcome = MergeOutcome {
        column,
        ..MergeOutcome::default()
    };

    for row in 0..ledger.row_count() {
        let member = ledger.member(row);
        if member.is_empty() {
            continue;
        }
        if ledger.attendance(row, column).is_present() {
            outcome.kept_present += 1;
            continue;
        }

        let target = if present.contains(member) {
            outcome.marked_present += 1;
            PRESENT_TEXT
        } else {
            outcome.marked_absent += 1;
            ABSENT_TEXT
        };
        if ledger.cell(row, column) != target {
            outcome
                .writes
                .push(CellWrite::new(Ledger::grid_row(row), column, target));
        }
    }

    tracing::debug!(
        column,
        writes = outcome.writes.len(),
        present = outcome.marked_present,
        absent = outcome.marked_absent,
        kept = outcome.kept_present,
        "merged attendance column"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerLayout;
    use crate::ledger::fixtures::grid;
    use crate::store::apply_writes;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn present(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn sample_grid() -> Vec<Vec<String>> {
        grid(&[
            &["Name", "04/12/2025", "11/12/2025"],
            &["Onur Celik", "TRUE", ""],
            &["Efe Berke", "FALSE", "TRUE"],
            &["Emre Kaplaner", "TRUE", "FALSE"],
            &["", "", ""],
        ])
    }

    #[test]
    fn writes_present_and_absent_for_the_date_column() {
        let ledger = Ledger::from_grid(sample_grid(), &LedgerLayout::default());
        let outcome =
            merge_attendance(&ledger, date(2025, 12, 11), &present(&["Onur Celik"])).unwrap();

        assert_eq!(outcome.column, 2);
        assert_eq!(
            outcome.writes,
            vec![CellWrite::new(1, 2, "TRUE")]
        );
        assert_eq!(outcome.kept_present, 1);
        assert_eq!(outcome.marked_absent, 1);
    }

    #[test]
    fn manual_present_is_never_downgraded() {
        let ledger = Ledger::from_grid(sample_grid(), &LedgerLayout::default());
        let outcome = merge_attendance(&ledger, date(2025, 12, 11), &HashSet::new()).unwrap();

        assert!(outcome
            .writes
            .iter()
            .all(|w| !(w.row == 2 && w.value == ABSENT_TEXT)));
        assert_eq!(outcome.writes, vec![CellWrite::new(1, 2, "FALSE")]);
    }

    #[test]
    fn merge_is_idempotent() {
        let names = present(&["Onur Celik", "Emre Kaplaner"]);
        let mut cells = sample_grid();
        let layout = LedgerLayout::default();

        let meeting = date(2025, 12, 11);
        let first =
            merge_attendance(&Ledger::from_grid(cells.clone(), &layout), meeting, &names).unwrap();
        apply_writes(&mut cells, &first.writes);
        let after_once = cells.clone();

        let second =
            merge_attendance(&Ledger::from_grid(cells.clone(), &layout), meeting, &names).unwrap();
        assert!(second.writes.is_empty());
        apply_writes(&mut cells, &second.writes);
        assert_eq!(cells, after_once);
    }

    #[test]
    fn missing_column_reports_not_found() {
        let ledger = Ledger::from_grid(sample_grid(), &LedgerLayout::default());
        let err =
            merge_attendance(&ledger, date(2025, 12, 18), &present(&["Onur Celik"])).unwrap_err();
        match err {
            EngineError::DateColumnNotFound { date, headers } => {
                assert_eq!(date, "18/12/2025");
                assert_eq!(headers.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
