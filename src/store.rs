use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::CellWrite;

pub type Grid = Vec<Vec<String>>;

/// A sheet of string cells bound to one sheet id.
///
/// `set_cells` is all-or-nothing: a failed batch leaves the sheet as it was.
/// Callers serialize access; implementations do no locking across calls.
pub trait TabularStore {
    async fn get_all_cells(&self) -> Result<Grid, StoreError>;

    async fn set_cells(&self, batch: &[CellWrite]) -> Result<(), StoreError>;

    async fn set_cell(&self, write: &CellWrite) -> Result<(), StoreError> {
        self.set_cells(std::slice::from_ref(write)).await
    }
}

/// Apply writes to an in-memory grid, growing rows and columns as needed.
pub fn apply_writes(grid: &mut Grid, batch: &[CellWrite]) {
    for write in batch {
        if grid.len() <= write.row {
            grid.resize_with(write.row + 1, Vec::new);
        }
        let row = &mut grid[write.row];
        if row.len() <= write.col {
            row.resize(write.col + 1, String::new());
        }
        row[write.col] = write.value.clone();
    }
}

/// A ledger kept in a local CSV file; every row including the header is data.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn read_csv_grid(path: &Path) -> Result<Grid, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

pub fn write_csv_grid(path: &Path, grid: &Grid) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl TabularStore for CsvStore {
    async fn get_all_cells(&self) -> Result<Grid, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "ledger file missing, starting empty");
            return Ok(Vec::new());
        }
        read_csv_grid(&self.path)
    }

    async fn set_cells(&self, batch: &[CellWrite]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut grid = self.get_all_cells().await?;
        apply_writes(&mut grid, batch);

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        write_csv_grid(&staging, &grid)?;
        std::fs::rename(&staging, &self.path)?;
        tracing::debug!(path = %self.path.display(), cells = batch.len(), "ledger file updated");
        Ok(())
    }
}

#[cfg(test)]
pub mod memory;

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::ledger::fixtures::grid;
    use tempfile::tempdir;

    #[test]
    fn apply_writes_grows_grid() {
        let mut cells = grid(&[&["Name"]]);
        apply_writes(&mut cells, &[CellWrite::new(2, 3, "TRUE")]);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2], vec!["", "", "", "TRUE"]);
        assert!(cells[1].is_empty());
    }

    #[tokio::test]
    async fn memory_store_rejects_batches_when_failing() {
        let store = MemoryStore::new(grid(&[&["Name", "04/12/2025"], &["Onur Celik", ""]]));
        store.fail_writes(true);
        let batch = [CellWrite::new(1, 1, "TRUE"), CellWrite::new(1, 0, "x")];
        assert!(store.set_cells(&batch).await.is_err());
        assert_eq!(store.snapshot()[1], vec!["Onur Celik", ""]);

        store.fail_writes(false);
        store.set_cell(&batch[0]).await.unwrap();
        assert_eq!(store.get_all_cells().await.unwrap()[1][1], "TRUE");
    }

    #[tokio::test]
    async fn csv_store_persists_batches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        write_csv_grid(
            &path,
            &grid(&[&["Name", "04/12/2025"], &["Şan Fikri Köktas", ""]]),
        )
        .unwrap();

        let store = CsvStore::new(&path);
        store
            .set_cells(&[CellWrite::new(1, 1, "TRUE"), CellWrite::new(2, 0, "Efe Berke")])
            .await
            .unwrap();

        let cells = store.get_all_cells().await.unwrap();
        assert_eq!(cells[1], vec!["Şan Fikri Köktas", "TRUE"]);
        assert_eq!(cells[2], vec!["Efe Berke"]);
        assert!(!dir.path().join("ledger.csv.tmp").exists());
    }

    #[tokio::test]
    async fn missing_csv_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("none.csv"));
        assert!(store.get_all_cells().await.unwrap().is_empty());
    }
}
