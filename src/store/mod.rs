//! Durable storage for the historical-time model.
//!
//! The only state that survives a batch is the mapping
//! `(category, difficulty bucket) → observed mean minutes`. It is read once
//! at batch start, rebuilt fully in memory from that batch's data, and
//! written back at batch end. The store is an injected abstraction so the
//! pipeline can run against redb in production and an in-memory fake in
//! tests.
//!
//! Batches must run strictly one at a time: the write is last-writer-wins,
//! not a merge, so concurrently interleaved batches would lose updates.

pub mod durable;
pub mod mem;

use std::collections::HashMap;

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// In-memory form of the historical-time model.
pub type HistoryTable = HashMap<HistoryKey, f64>;

/// Key of one history entry: category plus difficulty bucket in 1–5.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryKey {
    pub category: String,
    pub bucket: u8,
}

impl HistoryKey {
    pub fn new(category: impl Into<String>, bucket: u8) -> Self {
        Self {
            category: category.into(),
            bucket,
        }
    }

    /// Wire encoding used as the durable key: `category:bucket`.
    pub fn encode(&self) -> Vec<u8> {
        format!("{}:{}", self.category, self.bucket).into_bytes()
    }

    /// Decode a durable key. Splits on the *last* colon so category names
    /// containing colons survive a round-trip.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?;
        let (category, bucket) = text.rsplit_once(':')?;
        Some(Self {
            category: category.to_string(),
            bucket: bucket.parse().ok()?,
        })
    }
}

impl std::fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.bucket)
    }
}

/// Backend-agnostic access to the persisted history table.
pub trait HistoryStore: std::fmt::Debug {
    /// Read the full table. A store that has never been written loads empty.
    fn load(&self) -> StoreResult<HistoryTable>;

    /// Replace the persisted table with the given one.
    fn save(&self, table: &HistoryTable) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_wire_encoding() {
        let key = HistoryKey::new("fitness", 3);
        let decoded = HistoryKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn key_with_colon_in_category_round_trips() {
        let key = HistoryKey::new("odd:name", 5);
        let decoded = HistoryKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded.category, "odd:name");
        assert_eq!(decoded.bucket, 5);
    }

    #[test]
    fn malformed_keys_decode_to_none() {
        assert!(HistoryKey::decode(b"no-separator").is_none());
        assert!(HistoryKey::decode(b"cat:notanumber").is_none());
        assert!(HistoryKey::decode(&[0xff, 0xfe]).is_none());
    }
}
