use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Row};

use crate::config::DEFAULT_STREAK_HEADER;
use crate::error::StoreError;
use crate::meeting_date::format_header;
use crate::models::CellWrite;
use crate::store::{read_csv_grid, Grid, TabularStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One attendance sheet stored cell-by-cell in Postgres.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    sheet: String,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, sheet: impl Into<String>) -> Self {
        Self {
            pool,
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

fn cells_to_grid(cells: Vec<(i32, i32, String)>) -> Grid {
    let mut rows: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut height = 0usize;
    for (row_idx, col_idx, value) in cells {
        let (row_idx, col_idx) = (row_idx.max(0) as usize, col_idx.max(0) as usize);
        height = height.max(row_idx + 1);
        let row = rows.entry(row_idx).or_default();
        if row.len() <= col_idx {
            row.resize(col_idx + 1, String::new());
        }
        row[col_idx] = value;
    }
    (0..height)
        .map(|idx| rows.remove(&idx).unwrap_or_default())
        .collect()
}

fn coordinate(value: usize) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Unavailable(format!("cell coordinate {value} out of range")))
}

impl TabularStore for PgLedgerStore {
    async fn get_all_cells(&self) -> Result<Grid, StoreError> {
        let records = sqlx::query(
            r#"
            SELECT row_idx, col_idx, value
            FROM attendance_ledger.cells
            WHERE sheet_id = $1
            ORDER BY row_idx, col_idx
            "#,
        )
        .bind(&self.sheet)
        .fetch_all(&self.pool)
        .await?;

        let mut cells: Vec<(i32, i32, String)> = Vec::with_capacity(records.len());
        for row in records {
            cells.push((row.get("row_idx"), row.get("col_idx"), row.get("value")));
        }
        Ok(cells_to_grid(cells))
    }

    async fn set_cells(&self, batch: &[CellWrite]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for write in batch {
            sqlx::query(
                r#"
                INSERT INTO attendance_ledger.cells (sheet_id, row_idx, col_idx, value, updated_at)
                VALUES ($1, $2, $3, $4, now())
                ON CONFLICT (sheet_id, row_idx, col_idx) DO UPDATE
                SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(&self.sheet)
            .bind(coordinate(write.row)?)
            .bind(coordinate(write.col)?)
            .bind(&write.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn replace_sheet(pool: &PgPool, sheet: &str, grid: &Grid) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM attendance_ledger.cells WHERE sheet_id = $1")
        .bind(sheet)
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0usize;
    for (row_idx, row) in grid.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO attendance_ledger.cells (sheet_id, row_idx, col_idx, value)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(sheet)
            .bind(coordinate(row_idx)?)
            .bind(coordinate(col_idx)?)
            .bind(value)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Replace a sheet with the contents of a CSV export of the ledger.
pub async fn import_csv(
    pool: &PgPool,
    sheet: &str,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let grid = read_csv_grid(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    replace_sheet(pool, sheet, &grid).await
}

/// Demo ledger: five weekly meetings ending at `last_meeting`.
pub fn seed_grid(last_meeting: NaiveDate) -> Grid {
    let mut header = vec!["Name".to_string(), DEFAULT_STREAK_HEADER.to_string()];
    for weeks_back in (0..5).rev() {
        header.push(format_header(last_meeting - Duration::weeks(weeks_back)));
    }

    let members: [(&str, [&str; 5]); 5] = [
        ("Onur Celik", ["TRUE", "TRUE", "", "FALSE", "TRUE"]),
        ("Batuhan Altan", ["TRUE", "FALSE", "", "FALSE", "FALSE"]),
        ("Emre Kaplaner", ["FALSE", "TRUE", "", "TRUE", ""]),
        ("Şan Fikri Köktas", ["TRUE", "TRUE", "", "TRUE", "TRUE"]),
        ("Efe Berke", ["FALSE", "FALSE", "", "FALSE", "FALSE"]),
    ];

    let mut grid = vec![header];
    for (name, history) in members {
        let mut row = vec![name.to_string(), String::new()];
        row.extend(history.iter().map(|cell| cell.to_string()));
        grid.push(row);
    }
    grid
}

pub async fn seed(pool: &PgPool, sheet: &str, last_meeting: NaiveDate) -> anyhow::Result<usize> {
    replace_sheet(pool, sheet, &seed_grid(last_meeting)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerLayout;
    use crate::ledger::Ledger;

    #[test]
    fn sparse_cells_rebuild_padded_grid() {
        let grid = cells_to_grid(vec![
            (0, 0, "Name".to_string()),
            (0, 2, "04/12/2025".to_string()),
            (2, 1, "TRUE".to_string()),
        ]);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["Name", "", "04/12/2025"]);
        assert!(grid[1].is_empty());
        assert_eq!(grid[2], vec!["", "TRUE"]);
    }

    #[test]
    fn seed_grid_is_a_valid_ledger() {
        let last = NaiveDate::from_ymd_opt(2025, 12, 11).unwrap();
        let ledger = Ledger::from_grid(seed_grid(last), &LedgerLayout::default());
        assert_eq!(ledger.row_count(), 5);
        assert_eq!(ledger.streak_column(), Some(1));
        assert_eq!(ledger.eligible_columns(last).len(), 5);
        assert_eq!(ledger.column_for(last), Some(6));
    }
}
