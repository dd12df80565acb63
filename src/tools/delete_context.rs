use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Stores, ToolError};

pub(super) const NAME: &str = "delete_context";
pub(super) const DESCRIPTION: &str = "Remove a line from Global Context. Use this when knowledge is no longer relevant. Line indices remain stable during the session.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteContextParams {
    #[schemars(description = "The line number to remove (0-indexed, as shown in Global Context)")]
    pub line: i64,
}

pub(super) fn run(stores: &Stores, params: DeleteContextParams) -> Result<Value, ToolError> {
    Ok(match stores.context.delete(params.line)? {
        Some(deleted) => json!({ "line": params.line, "deleted_content": deleted }),
        None => Value::Null,
    })
}
