use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{to_value, Stores, ToolError};
use crate::store::{Filter, DEFAULT_QUERY_LIMIT};

pub(super) const NAME: &str = "query_items";
pub(super) const DESCRIPTION: &str = "Search for items by semantic similarity (meaning) and/or property filters. Use this to find, list, or retrieve items.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryItemsParams {
    #[schemars(description = "Semantic search query - finds items with similar meaning")]
    pub text: Option<String>,

    #[serde(rename = "where")]
    #[schemars(
        description = "Property filter, every entry must match exactly (e.g., {\"status\": \"active\", \"type\": \"task\"})"
    )]
    pub filter: Option<Filter>,

    #[schemars(description = "Maximum number of results (default 10)")]
    pub limit: Option<usize>,
}

pub(super) fn run(stores: &Stores, params: QueryItemsParams) -> Result<Value, ToolError> {
    let items = stores.items.query(
        params.text.as_deref(),
        params.filter.as_ref(),
        params.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
    )?;
    to_value(&items)
}
