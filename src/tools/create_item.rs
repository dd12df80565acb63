use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{to_value, Stores, ToolError};
use crate::store::Properties;

pub(super) const NAME: &str = "create_item";
pub(super) const DESCRIPTION: &str = "Create a new item (task, note, reminder, idea, etc.) with content and optional properties. Use this when the user wants to add something to track.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateItemParams {
    #[schemars(description = "The item's text content (task description, note, etc.)")]
    pub content: String,

    #[schemars(
        description = "Optional metadata like type, status, due_date, priority, project. Values must be strings, numbers, booleans or null."
    )]
    pub properties: Option<Properties>,
}

pub(super) fn run(stores: &Stores, params: CreateItemParams) -> Result<Value, ToolError> {
    let item = stores.items.add(&params.content, params.properties.as_ref())?;
    to_value(&item)
}
