use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{Stores, ToolError};

pub(super) const NAME: &str = "delete_item";
pub(super) const DESCRIPTION: &str = "Delete an item permanently. Use when the user wants to remove something.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteItemParams {
    #[schemars(description = "The item's unique identifier")]
    pub id: String,
}

pub(super) fn run(stores: &Stores, params: DeleteItemParams) -> Result<Value, ToolError> {
    Ok(Value::Bool(stores.items.delete(&params.id)?))
}
