use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{apply_writes, Grid, TabularStore};
use crate::error::StoreError;
use crate::models::CellWrite;

/// In-memory sheet that can be told to fail reads or writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    grid: Mutex<Grid>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid: Mutex::new(grid),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Grid {
        self.grid.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Grid>, StoreError> {
        self.grid
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }
}

impl TabularStore for MemoryStore {
    async fn get_all_cells(&self) -> Result<Grid, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.lock()?.clone())
    }

    async fn set_cells(&self, batch: &[CellWrite]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut grid = self.lock()?;
        apply_writes(&mut grid, batch);
        Ok(())
    }
}

