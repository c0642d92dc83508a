use std::path::PathBuf;

use crate::error::CacheError;
use crate::store::{Grid, TabularStore};

/// Member names from column 0, header row skipped. Blank entries are kept;
/// the matcher ignores them.
pub fn roster_from_grid(grid: &Grid) -> Vec<String> {
    grid.iter()
        .skip(1)
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect()
}

/// Last successfully fetched roster, used when the store cannot be read.
pub trait RosterCache {
    fn load(&self) -> Result<Option<Vec<String>>, CacheError>;
    fn save(&self, roster: &[String]) -> Result<(), CacheError>;
}

/// Roster snapshot kept as a JSON array of names.
#[derive(Debug, Clone)]
pub struct JsonRosterCache {
    path: PathBuf,
}

impl JsonRosterCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RosterCache for JsonRosterCache {
    fn load(&self) -> Result<Option<Vec<String>>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, roster: &[String]) -> Result<(), CacheError> {
        let raw = serde_json::to_string_pretty(roster)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryRosterCache {
    roster: std::sync::Mutex<Option<Vec<String>>>,
}

#[cfg(test)]
impl MemoryRosterCache {
    pub fn with_roster(roster: Vec<String>) -> Self {
        Self {
            roster: std::sync::Mutex::new(Some(roster)),
        }
    }
}

#[cfg(test)]
impl RosterCache for MemoryRosterCache {
    fn load(&self) -> Result<Option<Vec<String>>, CacheError> {
        Ok(self.roster.lock().map(|r| r.clone()).unwrap_or_default())
    }

    fn save(&self, roster: &[String]) -> Result<(), CacheError> {
        if let Ok(mut slot) = self.roster.lock() {
            *slot = Some(roster.to_vec());
        }
        Ok(())
    }
}

/// Read the roster from the store, refreshing the cache; fall back to the
/// cache (or an empty roster) when the store read fails.
pub async fn load_roster<S, C>(store: &S, cache: &C) -> Vec<String>
where
    S: TabularStore,
    C: RosterCache,
{
    match store.get_all_cells().await {
        Ok(grid) => {
            let roster = roster_from_grid(&grid);
            if let Err(e) = cache.save(&roster) {
                tracing::warn!("Could not update roster cache: {e}");
            }
            roster
        }
        Err(e) => {
            tracing::warn!("Could not fetch members from ledger ({e}); using local cache");
            match cache.load() {
                Ok(Some(roster)) => roster,
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::warn!("Roster cache unreadable: {e}");
                    Vec::new()
                }
            }
        }
    }
}
