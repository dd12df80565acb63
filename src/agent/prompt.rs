//! System prompt assembly.
//!
//! The template uses `{{key}}` placeholders. Only `{{today}}` and
//! `{{global_context}}` are filled; anything else is left as written.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

/// Built-in template, used unless `agent.system_prompt_path` is set.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../prompts/system.md");

const TODAY_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";

/// Read the template override at `path`, or fall back to [`DEFAULT_TEMPLATE`].
pub fn load_template(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(crate::config::expand_tilde(path))
            .with_context(|| format!("failed to read system prompt template {path}")),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

pub fn render(template: &str, now: DateTime<Local>, global_context: &str) -> String {
    template
        .replace("{{today}}", &now.format(TODAY_FORMAT).to_string())
        .replace("{{global_context}}", global_context)
}
