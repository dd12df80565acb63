//! SQL DDL for the jotter database.
//!
//! Every collection lives in the single `records` table, keyed by
//! `(collection, id)`. Metadata is JSON text so equality filters can use
//! `json_extract`; the embedding is a raw float32 BLOB scored with sqlite-vec's
//! scalar distance functions. All DDL uses `IF NOT EXISTS`.

use rusqlite::Connection;

/// Version written into fresh databases.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}' CHECK(json_valid(metadata)),
    embedding BLOB NOT NULL,
    PRIMARY KEY (collection, id)
);

-- Only used when filters spell the path as this exact literal.
CREATE INDEX IF NOT EXISTS idx_records_type
    ON records(collection, json_extract(metadata, '$."type"'));

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(tables, vec!["records".to_string(), "schema_meta".to_string()]);

        let index: String = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_records_type'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(index, "idx_records_type");

        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn metadata_must_be_json() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let err = conn.execute(
            "INSERT INTO records (collection, id, document, metadata, embedding)
             VALUES ('items', 'a', 'x', 'not json', x'00')",
            [],
        );
        assert!(err.is_err());
    }
}
