use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Stores, ToolError};

pub(super) const NAME: &str = "append_context";
pub(super) const DESCRIPTION: &str = "Add a new line to Global Context. Use this to record persistent knowledge about the user: preferences, patterns, constraints, or observations that should shape all future reasoning.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AppendContextParams {
    #[schemars(description = "The knowledge to add (e.g., 'Prefers deep work in mornings')")]
    pub content: String,
}

pub(super) fn run(stores: &Stores, params: AppendContextParams) -> Result<Value, ToolError> {
    let line = stores.context.append(&params.content)?;
    Ok(json!({ "line": line, "content": params.content }))
}
