//! Hybrid item store: semantic search and exact property filtering over the
//! same records.
//!
//! [`HybridStore`] owns the translation between [`Item`] and what a
//! [`Backend`] persists. Properties are folded into the stored document by
//! [`codec::encode`] so the embedding "sees" them, and kept verbatim in the
//! record metadata alongside the `created_at` / `updated_at` timestamps so
//! equality filters stay exact.

pub mod backend;
pub mod codec;
pub mod memory;
pub mod report;
pub mod sqlite;
pub mod types;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

pub use backend::{Backend, Filter, Record, StoreError};
pub use memory::MemoryBackend;
pub use report::{CollectionReport, MigrationReport};
pub use sqlite::SqliteBackend;
pub use types::{Item, Properties, PropertyValue};

/// Result count used when a query does not name one.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn timestamp(metadata: &Properties, key: &str) -> String {
    metadata
        .get(key)
        .and_then(PropertyValue::as_text)
        .unwrap_or_default()
        .to_string()
}

fn to_item(record: Record) -> Item {
    Item {
        content: codec::decode(&record.document).to_string(),
        properties: types::user_properties(&record.metadata),
        created_at: timestamp(&record.metadata, "created_at"),
        updated_at: timestamp(&record.metadata, "updated_at"),
        id: record.id,
    }
}

/// Build the stored record for an item. Reserved keys in `properties` are
/// overwritten by the given timestamps.
fn to_record(id: &str, content: &str, properties: &Properties, created_at: &str, updated_at: &str) -> Record {
    let mut metadata = types::user_properties(properties);
    metadata.insert("created_at".into(), created_at.into());
    metadata.insert("updated_at".into(), updated_at.into());
    Record {
        id: id.to_string(),
        document: codec::encode(content, Some(properties)),
        metadata,
    }
}

/// A named collection of items on a shared backend. Cheap to clone.
#[derive(Clone)]
pub struct HybridStore {
    backend: Arc<dyn Backend>,
    collection: String,
}

impl HybridStore {
    pub fn new(backend: Arc<dyn Backend>, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create a new item with a fresh UUID v7.
    pub fn add(&self, content: &str, properties: Option<&Properties>) -> Result<Item, StoreError> {
        let id = Uuid::now_v7().to_string();
        let ts = now();
        let empty = Properties::new();
        let record = to_record(&id, content, properties.unwrap_or(&empty), &ts, &ts);
        self.backend.insert(&self.collection, &record)?;
        tracing::debug!(collection = %self.collection, id = %id, "item added");
        Ok(to_item(record))
    }

    pub fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.backend.get(&self.collection, id)?.map(to_item))
    }

    /// Merge `properties` over the stored ones (new values win) and replace
    /// the content when given. `None` if the item does not exist.
    pub fn update(
        &self,
        id: &str,
        content: Option<&str>,
        properties: Option<&Properties>,
    ) -> Result<Option<Item>, StoreError> {
        let Some(existing) = self.get(id)? else {
            return Ok(None);
        };

        let mut merged = existing.properties;
        if let Some(props) = properties {
            merged.extend(types::user_properties(props));
        }
        let content = content.unwrap_or(&existing.content);
        let record = to_record(id, content, &merged, &existing.created_at, &now());

        match self.backend.update(&self.collection, &record) {
            Ok(()) => Ok(Some(to_item(record))),
            // Deleted between the read and the write.
            Err(StoreError::Missing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if the item existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.backend.delete(&self.collection, id)?;
        tracing::debug!(collection = %self.collection, id, deleted, "item delete");
        Ok(deleted)
    }

    /// Create or fully replace the item at `id`. Properties are replaced, not
    /// merged; an existing `created_at` is kept.
    pub fn upsert(&self, id: &str, content: &str, properties: Option<&Properties>) -> Result<Item, StoreError> {
        let ts = now();
        let created_at = self
            .backend
            .get(&self.collection, id)?
            .map(|r| timestamp(&r.metadata, "created_at"))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| ts.clone());
        let empty = Properties::new();
        let record = to_record(id, content, properties.unwrap_or(&empty), &created_at, &ts);
        self.backend.upsert(&self.collection, &record)?;
        Ok(to_item(record))
    }

    /// Semantic search when `text` is non-empty, otherwise a filtered listing
    /// in insertion order. An empty `filter` is the same as none.
    pub fn query(
        &self,
        text: Option<&str>,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<Item>, StoreError> {
        let empty = Filter::new();
        let filter = filter.unwrap_or(&empty);
        let records = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => self.backend.search(&self.collection, text, filter, limit)?,
            None => self.backend.list(&self.collection, filter, Some(limit))?,
        };
        tracing::debug!(
            collection = %self.collection,
            semantic = text.is_some_and(|t| !t.trim().is_empty()),
            filters = filter.len(),
            hits = records.len(),
            "query"
        );
        Ok(records.into_iter().map(to_item).collect())
    }

    /// Re-save every record written before properties were encoded into the
    /// document. Timestamps are left alone. Safe to run repeatedly.
    pub fn reencode_legacy(&self) -> Result<MigrationReport, StoreError> {
        let mut report = MigrationReport::default();
        for record in self.backend.list(&self.collection, &Filter::new(), None)? {
            if codec::is_encoded(&record.document) {
                report.skipped += 1;
                continue;
            }
            let document = codec::encode(&record.document, Some(&record.metadata));
            if document == record.document {
                report.skipped += 1;
                continue;
            }
            let migrated = Record { document, ..record };
            self.backend.update(&self.collection, &migrated)?;
            tracing::info!(collection = %self.collection, id = %migrated.id, "re-encoded legacy record");
            report.migrated += 1;
        }
        Ok(report)
    }

    /// Summarize the collection: field kinds, small categorical value sets,
    /// and the first `samples` items.
    pub fn describe(&self, samples: usize) -> Result<CollectionReport, StoreError> {
        let records = self.backend.list(&self.collection, &Filter::new(), None)?;
        Ok(CollectionReport::build(&self.collection, records, samples, to_item))
    }
}
