#![allow(dead_code)]

use std::sync::Arc;

use jotter::context::ContextLog;
use jotter::embedding::hashing::HashingEmbeddingProvider;
use jotter::store::{HybridStore, MemoryBackend, SqliteBackend};
use jotter::tools::ToolRegistry;

/// Fresh in-memory SQLite backend with the offline hashing embedder.
pub fn sqlite_backend() -> Arc<SqliteBackend> {
    Arc::new(SqliteBackend::open_in_memory(Arc::new(HashingEmbeddingProvider::new())).unwrap())
}

/// Items store over a fresh SQLite backend.
pub fn sqlite_items() -> HybridStore {
    HybridStore::new(sqlite_backend(), "items")
}

/// Items store and context log sharing one fresh SQLite backend.
pub fn sqlite_stores() -> (HybridStore, ContextLog) {
    let backend = sqlite_backend();
    (
        HybridStore::new(backend.clone(), "items"),
        ContextLog::new(HybridStore::new(backend, "global_context")),
    )
}

/// Items store and context log over the in-memory reference backend.
pub fn memory_stores() -> (HybridStore, ContextLog) {
    let backend = Arc::new(MemoryBackend::new());
    (
        HybridStore::new(backend.clone(), "items"),
        ContextLog::new(HybridStore::new(backend, "global_context")),
    )
}

/// Registry over SQLite, plus handles to the same stores for assertions.
pub fn registry() -> (ToolRegistry, HybridStore, ContextLog) {
    let (items, context) = sqlite_stores();
    (ToolRegistry::new(items.clone(), context.clone()), items, context)
}
