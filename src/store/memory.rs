//! In-process [`Backend`] used by tests and throwaway sessions.
//!
//! Records keep insertion order per collection. "Semantic" search ranks by the
//! share of query words found in the document, which is enough to exercise the
//! store's routing and encoding without an embedding model.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::backend::{matches_filter, Backend, Filter, Record, StoreError};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Mutex<BTreeMap<String, Vec<Record>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<Record>>>, StoreError> {
        self.collections.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn overlap(query: &HashSet<String>, document: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let doc = words(document);
    query.intersection(&doc).count() as f64 / query.len() as f64
}

impl Backend for MemoryBackend {
    fn insert(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let records = guard.entry(collection.to_string()).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: record.id.clone(),
            });
        }
        records.push(record.clone());
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    fn list(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        let guard = self.lock()?;
        let Some(records) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .filter(|r| matches_filter(&r.metadata, filter))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn search(
        &self,
        collection: &str,
        text: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let query = words(text);
        let mut scored: Vec<(f64, Record)> = self
            .list(collection, filter, None)?
            .into_iter()
            .map(|r| (overlap(&query, &r.document), r))
            .collect();
        // Stable sort: ties keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, r)| r).collect())
    }

    fn update(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let slot = guard
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: record.id.clone(),
            })?;
        *slot = record.clone();
        Ok(())
    }

    fn upsert(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let records = guard.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let Some(records) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(collection).map_or(0, Vec::len))
    }
}
