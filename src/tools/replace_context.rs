use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Stores, ToolError};

pub(super) const NAME: &str = "replace_context";
pub(super) const DESCRIPTION: &str = "Update an existing line in Global Context. Use this when knowledge needs to be corrected or refined.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReplaceContextParams {
    #[schemars(description = "The line number to update (0-indexed, as shown in Global Context)")]
    pub line: i64,

    #[schemars(description = "The new content for this line")]
    pub content: String,
}

pub(super) fn run(stores: &Stores, params: ReplaceContextParams) -> Result<Value, ToolError> {
    Ok(match stores.context.replace(params.line, &params.content)? {
        Some(replaced) => json!({
            "line": params.line,
            "old_content": replaced.old,
            "new_content": replaced.new,
        }),
        None => Value::Null,
    })
}
