//! Persistence backend capability.
//!
//! The [`HybridStore`](super::HybridStore) only needs a collection-oriented
//! record store that can do point lookups, metadata-equality listing and
//! semantic nearest-neighbour search. [`SqliteBackend`](super::SqliteBackend)
//! is the production implementation and [`MemoryBackend`](super::MemoryBackend)
//! honours the same contract in-process.

use super::types::{Properties, PropertyValue};

/// A record exactly as the backend holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    /// Encoded document text (content plus rendered properties).
    pub document: String,
    /// User properties plus the `created_at` / `updated_at` timestamps.
    pub metadata: Properties,
}

/// Metadata equality filter. Every entry must match; an empty filter matches all.
pub type Filter = Properties;

/// Whether `metadata` satisfies every clause of `filter`. A missing key only
/// matches a `null` clause.
pub fn matches_filter(metadata: &Properties, filter: &Filter) -> bool {
    filter.iter().all(|(key, expected)| match metadata.get(key) {
        Some(actual) => actual.loosely_equals(expected),
        None => *expected == PropertyValue::Null,
    })
}

/// Failures surfaced by a backend. Not-found is never an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("stored metadata is not valid JSON: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("record {collection}/{id} already exists")]
    Duplicate { collection: String, id: String },

    #[error("record {collection}/{id} vanished during update")]
    Missing { collection: String, id: String },

    #[error("backend lock poisoned")]
    Poisoned,
}

/// Collection-oriented record store with semantic search.
///
/// All methods are synchronous; async callers go through `spawn_blocking`.
pub trait Backend: Send + Sync {
    /// Insert a new record. Fails if the id is already taken.
    fn insert(&self, collection: &str, record: &Record) -> Result<(), StoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Records matching `filter` in backend default order (insertion order).
    /// `None` lists without a bound.
    fn list(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Records matching `filter`, most similar to `text` first.
    fn search(
        &self,
        collection: &str,
        text: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;

    /// Overwrite an existing record in place.
    fn update(&self, collection: &str, record: &Record) -> Result<(), StoreError>;

    fn upsert(&self, collection: &str, record: &Record) -> Result<(), StoreError>;

    /// Returns `true` if a record was removed.
    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Names of all collections holding at least one record.
    fn collections(&self) -> Result<Vec<String>, StoreError>;

    fn count(&self, collection: &str) -> Result<usize, StoreError>;
}
