use chrono::NaiveDate;

use crate::config::LedgerLayout;
use crate::meeting_date::{format_header, parse_header};
use crate::models::AttendanceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateColumn {
    pub col: usize,
    pub date: NaiveDate,
}

/// Typed view over an attendance grid: row 0 is the header, column 0 holds
/// member names, date headers are parsed once and kept in chronological order.
#[derive(Debug, Clone)]
pub struct Ledger {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    date_columns: Vec<DateColumn>,
    streak_column: Option<usize>,
}

impl Ledger {
    pub fn from_grid(grid: Vec<Vec<String>>, layout: &LedgerLayout) -> Self {
        let mut grid = grid.into_iter();
        let headers = grid.next().unwrap_or_default();
        let width = headers.len();
        let rows = grid
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        let mut date_columns: Vec<DateColumn> = headers
            .iter()
            .enumerate()
            .filter_map(|(col, header)| parse_header(header).map(|date| DateColumn { col, date }))
            .collect();
        date_columns.sort_by_key(|c| (c.date, c.col));

        let streak_column = if layout.streak_header.is_empty() {
            None
        } else {
            headers
                .iter()
                .position(|header| header.contains(&layout.streak_header))
        };

        Self {
            headers,
            rows,
            date_columns,
            streak_column,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of member rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn member(&self, row: usize) -> &str {
        self.cell(row, 0).trim()
    }

    /// Raw text at a member row; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn attendance(&self, row: usize, col: usize) -> AttendanceCell {
        AttendanceCell::parse(self.cell(row, col))
    }

    /// Grid row index for a member row, for building writes.
    pub fn grid_row(row: usize) -> usize {
        row + 1
    }

    /// Date columns dated on or before `cutoff`, oldest first.
    pub fn eligible_columns(&self, cutoff: NaiveDate) -> &[DateColumn] {
        let end = self.date_columns.partition_point(|c| c.date <= cutoff);
        &self.date_columns[..end]
    }

    /// Column whose header is exactly the `DD/MM/YYYY` form of `date`.
    pub fn column_for(&self, date: NaiveDate) -> Option<usize> {
        let wanted = format_header(date);
        self.headers.iter().position(|header| *header == wanted)
    }

    pub fn streak_column(&self) -> Option<usize> {
        self.streak_column
    }
}
