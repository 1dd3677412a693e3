//! In-memory history store.
//!
//! Backs memory-only pipelines and serves as the test fake for anything
//! that takes a [`HistoryStore`].

use std::sync::Mutex;

use crate::store::{HistoryStore, HistoryTable, StoreResult};

/// History store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemHistoryStore {
    inner: Mutex<HistoryTable>,
}

impl MemHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store with a table, for tests that need stale history.
    pub fn with_table(table: HistoryTable) -> Self {
        Self {
            inner: Mutex::new(table),
        }
    }
}

impl HistoryStore for MemHistoryStore {
    fn load(&self) -> StoreResult<HistoryTable> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, table: &HistoryTable) -> StoreResult<()> {
        *self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = table.clone();
        Ok(())
    }
}
