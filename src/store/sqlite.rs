//! SQLite + sqlite-vec [`Backend`].
//!
//! One `records` row per `(collection, id)`. Equality filters compile to
//! `json_extract(metadata, '$."key"') IS ?` clauses; semantic search orders by
//! `vec_distance_cosine` between the stored document embedding and the query
//! embedding. Embedding runs before the connection lock is taken so a slow
//! model never blocks readers.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode};

use super::backend::{Backend, Filter, Record, StoreError};
use super::types::{Properties, PropertyValue};
use crate::db;
use crate::embedding::{to_blob, EmbeddingProvider};

/// Records re-embedded per model call in [`SqliteBackend::reembed_all`].
const REEMBED_BATCH: usize = 32;

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteBackend {
    /// Wrap a connection whose schema is in place, recording the embedder's
    /// model id when the database holds no vectors yet. A mismatch with
    /// existing vectors is only warned about; search quality degrades until
    /// `jotter migrate --re-embed` runs.
    pub fn new(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, StoreError> {
        sync_embedding_model(&conn, embedder.model_id())?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// Open (or create) the database file.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn EmbeddingProvider>) -> anyhow::Result<Self> {
        let conn = db::open_database(path)?;
        Self::new(conn, embedder).context("failed to check embedding model")
    }

    /// Throwaway database that lives as long as the backend.
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> anyhow::Result<Self> {
        let conn = db::open_memory_database()?;
        Self::new(conn, embedder).context("failed to check embedding model")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn embed(&self, text: &str) -> Result<Vec<u8>, StoreError> {
        let vector = self
            .embedder
            .embed(text)
            .map_err(|e| StoreError::Embedding(format!("{e:#}")))?;
        Ok(to_blob(&vector))
    }

    pub fn embedding_model(&self) -> Result<Option<String>, StoreError> {
        Ok(db::meta::get_embedding_model(&*self.lock()?)?)
    }

    /// Recompute every stored embedding with the current embedder and record
    /// its model id. `progress` receives the number of records done per batch.
    pub fn reembed_all(&self, mut progress: impl FnMut(usize)) -> Result<usize, StoreError> {
        let rows: Vec<(String, String, String)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare("SELECT collection, id, document FROM records ORDER BY rowid")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for chunk in rows.chunks(REEMBED_BATCH) {
            let texts: Vec<&str> = chunk.iter().map(|(_, _, doc)| doc.as_str()).collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .map_err(|e| StoreError::Embedding(format!("{e:#}")))?;

            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for ((collection, id, _), vector) in chunk.iter().zip(&vectors) {
                tx.execute(
                    "UPDATE records SET embedding = ?1 WHERE collection = ?2 AND id = ?3",
                    params![to_blob(vector), collection, id],
                )?;
            }
            tx.commit()?;
            progress(chunk.len());
        }

        db::meta::set_embedding_model(&*self.lock()?, self.embedder.model_id())?;
        tracing::info!(records = rows.len(), model = self.embedder.model_id(), "re-embedded");
        Ok(rows.len())
    }
}

fn sync_embedding_model(conn: &Connection, current: &str) -> Result<(), StoreError> {
    let stored = db::meta::get_embedding_model(conn)?;
    let records: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;

    if records == 0 {
        if stored.as_deref() != Some(current) {
            db::meta::set_embedding_model(conn, current)?;
        }
    } else if stored.as_deref() != Some(current) {
        tracing::warn!(
            stored = stored.as_deref().unwrap_or("unknown"),
            current,
            "embedding model changed; run `jotter migrate --re-embed`"
        );
    }
    Ok(())
}

/// JSON path selecting a top-level key, quoted so dots and brackets are literal.
fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('"', "\\\""))
}

/// [`json_path`] as an SQL string literal. Written inline rather than bound so
/// `idx_records_type` matches filters on `type`.
fn path_literal(key: &str) -> String {
    format!("'{}'", json_path(key).replace('\'', "''"))
}

/// SQLite reads a negative `LIMIT` as unbounded.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// SQL value a property is compared against. `json_extract` yields 1/0 for
/// JSON booleans, so booleans bind as integers.
fn sql_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(b) => Value::Integer(i64::from(*b)),
        PropertyValue::Int(i) => Value::Integer(*i),
        PropertyValue::Float(f) => Value::Real(*f),
        PropertyValue::Text(s) => Value::Text(s.clone()),
    }
}

/// `WHERE` clause for a collection plus filter, with its bound parameters in order.
fn where_clause(collection: &str, filter: &Filter) -> (String, Vec<Value>) {
    let mut sql = String::from("collection = ?");
    let mut values = vec![Value::Text(collection.to_string())];
    for (key, expected) in filter {
        sql.push_str(&format!(" AND json_extract(metadata, {}) IS ?", path_literal(key)));
        values.push(sql_value(expected));
    }
    (sql, values)
}

fn list_query(collection: &str, filter: &Filter, limit: Option<usize>) -> (String, Vec<Value>) {
    let (clause, mut values) = where_clause(collection, filter);
    values.push(Value::Integer(limit.map_or(-1, sql_limit)));
    let sql = format!("SELECT id, document, metadata FROM records WHERE {clause} ORDER BY rowid LIMIT ?");
    (sql, values)
}

fn read_records(
    conn: &Connection,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<Record>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map(params_from_iter(values), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, document, metadata)| {
            Ok(Record {
                id,
                document,
                metadata: serde_json::from_str::<Properties>(&metadata)?,
            })
        })
        .collect()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl Backend for SqliteBackend {
    fn insert(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let embedding = self.embed(&record.document)?;
        let metadata = serde_json::to_string(&record.metadata)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records (collection, id, document, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![collection, record.id, record.document, metadata, embedding],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Duplicate {
                    collection: collection.to_string(),
                    id: record.id.clone(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.lock()?;
        let mut records = read_records(
            &conn,
            "SELECT id, document, metadata FROM records WHERE collection = ?1 AND id = ?2",
            vec![Value::Text(collection.to_string()), Value::Text(id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn list(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        let (sql, values) = list_query(collection, filter, limit);
        read_records(&*self.lock()?, &sql, values)
    }

    fn search(
        &self,
        collection: &str,
        text: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let query = self.embed(text)?;
        let (clause, mut values) = where_clause(collection, filter);
        values.push(Value::Blob(query));
        values.push(Value::Integer(sql_limit(limit)));
        let sql = format!(
            "SELECT id, document, metadata FROM records WHERE {clause}
             ORDER BY vec_distance_cosine(embedding, ?), rowid LIMIT ?"
        );
        read_records(&*self.lock()?, &sql, values)
    }

    fn update(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let embedding = self.embed(&record.document)?;
        let metadata = serde_json::to_string(&record.metadata)?;
        let changed = self.lock()?.execute(
            "UPDATE records SET document = ?1, metadata = ?2, embedding = ?3
             WHERE collection = ?4 AND id = ?5",
            params![record.document, metadata, embedding, collection, record.id],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: record.id.clone(),
            });
        }
        Ok(())
    }

    fn upsert(&self, collection: &str, record: &Record) -> Result<(), StoreError> {
        let embedding = self.embed(&record.document)?;
        let metadata = serde_json::to_string(&record.metadata)?;
        self.lock()?.execute(
            "INSERT INTO records (collection, id, document, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(collection, id) DO UPDATE SET
                 document = excluded.document,
                 metadata = excluded.metadata,
                 embedding = excluded.embedding",
            params![collection, record.id, record.document, metadata, embedding],
        )?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let removed = self.lock()?.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(removed > 0)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT collection FROM records ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashing::HashingEmbeddingProvider;

    fn backend() -> SqliteBackend {
        SqliteBackend::open_in_memory(Arc::new(HashingEmbeddingProvider::new())).unwrap()
    }

    fn record(id: &str, document: &str, metadata: &[(&str, PropertyValue)]) -> Record {
        Record {
            id: id.into(),
            document: document.into(),
            metadata: metadata.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    fn filter(pairs: &[(&str, PropertyValue)]) -> Filter {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn json_path_quotes_key() {
        assert_eq!(json_path("due_date"), "$.\"due_date\"");
        assert_eq!(json_path("a.b"), "$.\"a.b\"");
    }

    #[test]
    fn path_literal_escapes_quotes() {
        assert_eq!(path_literal("type"), "'$.\"type\"'");
        assert_eq!(path_literal("it's"), "'$.\"it''s\"'");
    }

    #[test]
    fn type_filter_uses_expression_index() {
        let b = backend();
        let (sql, values) = list_query("items", &filter(&[("type", "task".into())]), Some(10));
        let conn = b.lock().unwrap();
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")).unwrap();
        let plan: Vec<String> = stmt
            .query_map(params_from_iter(values), |row| row.get(3))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(
            plan.iter().any(|d| d.contains("idx_records_type") && d.contains("<expr>=?")),
            "{plan:?}"
        );
    }

    #[test]
    fn huge_limits_stay_bounded() {
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
        let b = backend();
        for id in ["a", "b"] {
            b.insert("items", &record(id, id, &[])).unwrap();
        }
        assert_eq!(b.list("items", &Filter::new(), Some(usize::MAX)).unwrap().len(), 2);
        assert_eq!(b.search("items", "a", &Filter::new(), usize::MAX).unwrap().len(), 2);
        assert_eq!(b.list("items", &Filter::new(), Some(0)).unwrap().len(), 0);
    }

    #[test]
    fn new_database_records_the_embedder() {
        let b = backend();
        assert_eq!(
            b.embedding_model().unwrap().as_deref(),
            Some(crate::embedding::hashing::MODEL_ID)
        );
    }

    #[test]
    fn existing_vectors_keep_their_model_id() {
        let conn = db::open_memory_database().unwrap();
        db::meta::set_embedding_model(&conn, "other-model").unwrap();
        conn.execute(
            "INSERT INTO records (collection, id, document, metadata, embedding)
             VALUES ('items', 'a', 'x', '{}', x'00')",
            [],
        )
        .unwrap();
        let b = SqliteBackend::new(conn, Arc::new(HashingEmbeddingProvider::new())).unwrap();
        assert_eq!(b.embedding_model().unwrap().as_deref(), Some("other-model"));
    }

    #[test]
    fn insert_get_round_trip() {
        let b = backend();
        let r = record("a", "Buy milk", &[("status", "active".into()), ("priority", 2i64.into())]);
        b.insert("items", &r).unwrap();
        assert_eq!(b.get("items", "a").unwrap(), Some(r));
        assert!(b.get("items", "missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_reported() {
        let b = backend();
        b.insert("items", &record("a", "x", &[])).unwrap();
        let err = b.insert("items", &record("a", "y", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        // Same id in another collection is fine.
        b.insert("global_context", &record("a", "y", &[])).unwrap();
    }

    #[test]
    fn filters_match_strings_numbers_and_booleans() {
        let b = backend();
        b.insert("items", &record("a", "one", &[("type", "task".into()), ("done", true.into())])).unwrap();
        b.insert("items", &record("b", "two", &[("type", "note".into()), ("priority", 1i64.into())])).unwrap();
        b.insert("items", &record("c", "three", &[("type", "task".into()), ("done", false.into())])).unwrap();

        let ids = |f: Filter| -> Vec<String> {
            b.list("items", &f, None).unwrap().into_iter().map(|r| r.id).collect()
        };
        assert_eq!(ids(filter(&[("type", "task".into())])), vec!["a", "c"]);
        assert_eq!(ids(filter(&[("done", true.into())])), vec!["a"]);
        assert_eq!(ids(filter(&[("done", false.into())])), vec!["c"]);
        assert_eq!(ids(filter(&[("priority", PropertyValue::Float(1.0))])), vec!["b"]);
        assert_eq!(ids(filter(&[("priority", "1".into())])), Vec::<String>::new());
        assert_eq!(ids(filter(&[("priority", PropertyValue::Null)])), vec!["a", "c"]);
        assert_eq!(ids(Filter::new()), vec!["a", "b", "c"]);
    }

    #[test]
    fn list_respects_limit_and_insertion_order() {
        let b = backend();
        for id in ["z", "y", "x"] {
            b.insert("items", &record(id, id, &[])).unwrap();
        }
        let got: Vec<String> = b
            .list("items", &Filter::new(), Some(2))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(got, vec!["z", "y"]);
    }

    #[test]
    fn search_ranks_closest_first_within_filter() {
        let b = backend();
        b.insert("items", &record("a", "Water the tomato plants", &[("type", "task".into())])).unwrap();
        b.insert("items", &record("b", "Dentist appointment on Friday", &[("type", "task".into())])).unwrap();
        b.insert("items", &record("c", "Dentist appointment notes", &[("type", "note".into())])).unwrap();

        let hits = b.search("items", "dentist appointment", &Filter::new(), 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_ne!(hits[0].id, "a");

        let tasks = b
            .search("items", "dentist appointment", &filter(&[("type", "task".into())]), 10)
            .unwrap();
        assert_eq!(tasks.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn upsert_keeps_row_position() {
        let b = backend();
        b.insert("items", &record("a", "first", &[])).unwrap();
        b.insert("items", &record("b", "second", &[])).unwrap();
        b.upsert("items", &record("a", "first, revised", &[])).unwrap();
        b.upsert("items", &record("c", "third", &[])).unwrap();

        let docs: Vec<String> = b
            .list("items", &Filter::new(), None)
            .unwrap()
            .into_iter()
            .map(|r| r.document)
            .collect();
        assert_eq!(docs, vec!["first, revised", "second", "third"]);
    }

    #[test]
    fn update_missing_and_delete() {
        let b = backend();
        let err = b.update("items", &record("nope", "x", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));

        b.insert("items", &record("a", "x", &[])).unwrap();
        assert!(b.delete("items", "a").unwrap());
        assert!(!b.delete("items", "a").unwrap());
        assert_eq!(b.count("items").unwrap(), 0);
    }

    #[test]
    fn reembed_records_model_id() {
        let b = backend();
        b.insert("items", &record("a", "x", &[])).unwrap();
        b.insert("global_context", &record("global_context", "y", &[])).unwrap();
        let mut seen = 0;
        assert_eq!(b.reembed_all(|n| seen += n).unwrap(), 2);
        assert_eq!(seen, 2);
        assert_eq!(
            b.embedding_model().unwrap().as_deref(),
            Some(crate::embedding::hashing::MODEL_ID)
        );
        assert_eq!(b.collections().unwrap(), vec!["global_context", "items"]);
    }
}
