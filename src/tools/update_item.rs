use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{to_value, Stores, ToolError};
use crate::store::Properties;

pub(super) const NAME: &str = "update_item";
pub(super) const DESCRIPTION: &str = "Update an existing item's content and/or properties. Use this to modify, complete, or change items.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateItemParams {
    #[schemars(description = "The item's unique identifier")]
    pub id: String,

    #[schemars(description = "New content (optional, keeps existing if not provided)")]
    pub content: Option<String>,

    #[schemars(description = "Properties to update (merged with existing)")]
    pub properties: Option<Properties>,
}

/// The updated item, or `null` if there is no item with that id.
pub(super) fn run(stores: &Stores, params: UpdateItemParams) -> Result<Value, ToolError> {
    let item = stores.items.update(
        &params.id,
        params.content.as_deref(),
        params.properties.as_ref(),
    )?;
    to_value(&item)
}
