//! Reports produced by the store's maintenance operations.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::backend::Record;
use super::types::Item;

/// Fields whose distinct values are worth listing.
const CATEGORICAL_FIELDS: [&str; 4] = ["type", "status", "priority", "item_type"];

/// Categorical fields with more distinct values than this are not listed.
const MAX_CATEGORIES: usize = 10;

/// Content longer than this is cut in the text rendering.
const PREVIEW_CHARS: usize = 80;

/// Outcome of [`HybridStore::reencode_legacy`](super::HybridStore::reencode_legacy).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Outcome of [`HybridStore::describe`](super::HybridStore::describe).
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub count: usize,
    /// Metadata field name → value kinds seen (`str`, `int`, ...).
    pub fields: BTreeMap<String, BTreeSet<&'static str>>,
    /// Distinct values of the small categorical fields.
    pub categories: BTreeMap<String, BTreeSet<String>>,
    pub samples: Vec<Item>,
}

impl CollectionReport {
    pub(super) fn build(
        collection: &str,
        records: Vec<Record>,
        samples: usize,
        to_item: impl Fn(Record) -> Item,
    ) -> Self {
        let mut fields: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();
        let mut categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in &records {
            for (key, value) in &record.metadata {
                fields.entry(key.clone()).or_default().insert(value.kind());
                if CATEGORICAL_FIELDS.contains(&key.as_str()) {
                    categories.entry(key.clone()).or_default().insert(value.to_string());
                }
            }
        }
        categories.retain(|_, values| values.len() <= MAX_CATEGORIES);

        Self {
            collection: collection.to_string(),
            count: records.len(),
            fields,
            categories,
            samples: records.into_iter().take(samples).map(to_item).collect(),
        }
    }
}

fn preview(content: &str) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

impl fmt::Display for CollectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collection: {}", self.collection)?;
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "  Items: {}", self.count)?;

        if !self.fields.is_empty() {
            writeln!(f, "  Metadata fields:")?;
            for (key, kinds) in &self.fields {
                let kinds: Vec<&str> = kinds.iter().copied().collect();
                writeln!(f, "    - {key}: {}", kinds.join(", "))?;
            }
        }
        for (key, values) in &self.categories {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            writeln!(f, "  {key} values: {}", values.join(", "))?;
        }

        if !self.samples.is_empty() {
            writeln!(f, "\n  Sample items ({}):", self.samples.len())?;
            for item in &self.samples {
                let short_id: String = item.id.chars().take(8).collect();
                writeln!(f, "\n    [{short_id}] {}", preview(&item.content))?;
                if !item.properties.is_empty() {
                    let pretty = serde_json::to_string_pretty(&item.properties).map_err(|_| fmt::Error)?;
                    for line in pretty.lines() {
                        writeln!(f, "      {line}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
