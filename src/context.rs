//! Global context: a line-addressable log of what the assistant has learned
//! about the user.
//!
//! The whole log is one item (id [`CONTEXT_ITEM_ID`]) in its own collection,
//! content split on `\n`. Within a session line numbers never move: deleting a
//! line leaves an empty tombstone in its place. [`ContextLog::prepare_session`]
//! compacts tombstones away before the next session renders the log into the
//! system prompt.

use crate::store::{HybridStore, Properties, PropertyValue, StoreError};

/// Id of the single item holding the log.
pub const CONTEXT_ITEM_ID: &str = "global_context";

/// Shown to the model when the log has nothing to say.
pub const EMPTY_PLACEHOLDER: &str = "(empty - populate as you learn about the user)";

/// Result of [`ContextLog::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    pub old: String,
    pub new: String,
}

#[derive(Clone)]
pub struct ContextLog {
    store: HybridStore,
}

fn marker() -> Properties {
    Properties::from([(
        "item_type".to_string(),
        PropertyValue::from(CONTEXT_ITEM_ID),
    )])
}

/// Resolve a caller-supplied line number, rejecting anything outside `[0, len)`.
fn index(line: i64, len: usize) -> Option<usize> {
    usize::try_from(line).ok().filter(|&i| i < len)
}

impl ContextLog {
    pub fn new(store: HybridStore) -> Self {
        Self { store }
    }

    /// Current lines. An absent log has none; a stored log has at least one,
    /// possibly a tombstone.
    pub fn lines(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .get(CONTEXT_ITEM_ID)?
            .map(|item| item.content.split('\n').map(str::to_string).collect())
            .unwrap_or_default())
    }

    fn save(&self, lines: &[String]) -> Result<(), StoreError> {
        self.store
            .upsert(CONTEXT_ITEM_ID, &lines.join("\n"), Some(&marker()))?;
        Ok(())
    }

    /// Append a line and return its index.
    pub fn append(&self, text: &str) -> Result<usize, StoreError> {
        let mut lines = self.lines()?;
        lines.push(text.to_string());
        self.save(&lines)?;
        Ok(lines.len() - 1)
    }

    /// Overwrite line `line`. `None` when out of range.
    pub fn replace(&self, line: i64, text: &str) -> Result<Option<Replaced>, StoreError> {
        let mut lines = self.lines()?;
        let Some(i) = index(line, lines.len()) else {
            return Ok(None);
        };
        let old = std::mem::replace(&mut lines[i], text.to_string());
        self.save(&lines)?;
        Ok(Some(Replaced {
            old,
            new: text.to_string(),
        }))
    }

    /// Tombstone line `line` and return what it held. Later lines keep their
    /// indices. `None` when out of range.
    pub fn delete(&self, line: i64) -> Result<Option<String>, StoreError> {
        let mut lines = self.lines()?;
        let Some(i) = index(line, lines.len()) else {
            return Ok(None);
        };
        let deleted = std::mem::take(&mut lines[i]);
        self.save(&lines)?;
        Ok(Some(deleted))
    }

    /// Start-of-session housekeeping: compact the log, persist it if that
    /// changed anything, and return the rendering for the system prompt.
    pub fn prepare_session(&self) -> Result<String, StoreError> {
        let Some(item) = self.store.get(CONTEXT_ITEM_ID)? else {
            return Ok(render_for_prompt(&[]));
        };

        let compacted = compact(&item.content);
        if compacted.is_empty() {
            // Nothing survived: drop the item so the next append starts at 0.
            self.store.delete(CONTEXT_ITEM_ID)?;
            return Ok(render_for_prompt(&[]));
        }
        if compacted != item.content {
            self.store
                .upsert(CONTEXT_ITEM_ID, &compacted, Some(&marker()))?;
            tracing::info!(
                before = item.content.split('\n').count(),
                after = compacted.split('\n').count(),
                "compacted global context"
            );
        }

        let lines: Vec<String> = compacted.split('\n').map(str::to_string).collect();
        Ok(render_for_prompt(&lines))
    }
}

/// Number each non-empty line as `"<index>-- <text>"`, keeping the original
/// indices. All-empty input renders as [`EMPTY_PLACEHOLDER`].
pub fn render_for_prompt(lines: &[String]) -> String {
    if lines.iter().all(|l| l.is_empty()) {
        return EMPTY_PLACEHOLDER.to_string();
    }
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| format!("{i}-- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop blank lines, keeping the survivors in order.
pub fn compact(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
