//! ACID-durable history store backed by redb.
//!
//! All writes go through transactions; a batch's rebuilt table is committed
//! atomically, so a crash mid-write leaves the previous run's table intact.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::store::{HistoryKey, HistoryStore, HistoryTable, StoreResult};

/// Table of `category:bucket` keys → bincode-encoded mean minutes.
const HISTORY_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("expected_times");

/// Durable history store using redb.
pub struct DurableHistoryStore {
    db: Arc<Database>,
}

impl DurableHistoryStore {
    /// Open or create the history database in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("kindred.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl HistoryStore for DurableHistoryStore {
    /// Scan the full history table. A database that has never been written
    /// (no table yet) loads as empty — the first-run contract.
    fn load(&self) -> StoreResult<HistoryTable> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(HISTORY_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(HistoryTable::new()),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };

        let mut history = HistoryTable::new();
        let iter = table.iter().map_err(|e| StoreError::Redb {
            message: format!("iter failed: {e}"),
        })?;
        for entry in iter {
            let (key_guard, value_guard) = entry.map_err(|e| StoreError::Redb {
                message: format!("scan failed: {e}"),
            })?;
            let Some(key) = HistoryKey::decode(key_guard.value()) else {
                // Unreadable keys are skipped, not fatal: the table is fully
                // rewritten every batch anyway.
                tracing::warn!("skipping malformed history key");
                continue;
            };
            let minutes: f64 =
                bincode::deserialize(value_guard.value()).map_err(|e| StoreError::Serialization {
                    message: format!("failed to decode history entry {key}: {e}"),
                })?;
            history.insert(key, minutes);
        }
        Ok(history)
    }

    /// Rewrite every entry of the given table in one transaction.
    fn save(&self, table: &HistoryTable) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut handle = txn.open_table(HISTORY_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (key, minutes) in table {
                let encoded_key = key.encode();
                let encoded_value =
                    bincode::serialize(minutes).map_err(|e| StoreError::Serialization {
                        message: format!("failed to encode history entry {key}: {e}"),
                    })?;
                handle
                    .insert(encoded_key.as_slice(), encoded_value.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert failed: {e}"),
                    })?;
            }
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for DurableHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableHistoryStore").finish()
    }
}
