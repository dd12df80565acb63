//! Tools the model can call, and the dispatch boundary that runs them.
//!
//! Each tool lives in its own module as a `schemars`-described parameter
//! struct plus a `run` function. [`ToolRegistry`] pairs every tool with the
//! JSON schema advertised to the model, and [`ToolRegistry::dispatch`] turns
//! a name plus raw JSON arguments into a JSON result. Dispatch never fails:
//! bad arguments, store errors and panics all come back as `{"error": ...}`.

pub mod append_context;
pub mod create_item;
pub mod delete_context;
pub mod delete_item;
pub mod query_items;
pub mod replace_context;
pub mod update_item;

use std::panic::{catch_unwind, AssertUnwindSafe};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::context::ContextLog;
use crate::store::{HybridStore, StoreError};

/// Failure inside a tool. Reported to the model in-band, never to the loop.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize result: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// OpenAI-style function tool declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What the handlers operate on.
pub struct Stores {
    pub items: HybridStore,
    pub context: ContextLog,
}

type Handler = Box<dyn Fn(&Stores, Value) -> Result<Value, ToolError> + Send + Sync>;

struct ToolSpec {
    name: &'static str,
    description: &'static str,
    parameters: Value,
    handler: Handler,
}

/// JSON schema for a parameter struct, without the `$schema` / `title` noise.
fn parameters<P: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(P).to_value();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

fn tool<P>(
    name: &'static str,
    description: &'static str,
    run: fn(&Stores, P) -> Result<Value, ToolError>,
) -> ToolSpec
where
    P: DeserializeOwned + JsonSchema + 'static,
{
    ToolSpec {
        name,
        description,
        parameters: parameters::<P>(),
        handler: Box::new(move |stores, args| {
            let params: P = serde_json::from_value(args).map_err(ToolError::InvalidArguments)?;
            run(stores, params)
        }),
    }
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(ToolError::Serialization)
}

fn error(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fixed table of tools over one items store and one context log.
pub struct ToolRegistry {
    stores: Stores,
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new(items: HybridStore, context: ContextLog) -> Self {
        let tools = vec![
            tool(create_item::NAME, create_item::DESCRIPTION, create_item::run),
            tool(update_item::NAME, update_item::DESCRIPTION, update_item::run),
            tool(delete_item::NAME, delete_item::DESCRIPTION, delete_item::run),
            tool(query_items::NAME, query_items::DESCRIPTION, query_items::run),
            tool(append_context::NAME, append_context::DESCRIPTION, append_context::run),
            tool(replace_context::NAME, replace_context::DESCRIPTION, replace_context::run),
            tool(delete_context::NAME, delete_context::DESCRIPTION, delete_context::run),
        ];
        Self {
            stores: Stores { items, context },
            tools,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|t| t.name)
    }

    /// Declarations to send with every model request.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                kind: "function".into(),
                function: FunctionSchema {
                    name: t.name.into(),
                    description: t.description.into(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Run tool `name` with `args`. Arguments that are not a JSON object are
    /// treated as `{}`.
    pub fn dispatch(&self, name: &str, args: Value) -> Value {
        tracing::debug!(tool = name, params = %args, "tool call");

        let Some(spec) = self.tools.iter().find(|t| t.name == name) else {
            tracing::warn!(tool = name, "unknown tool requested");
            return error(format!("Unknown tool: {name}"));
        };

        let args = match args {
            Value::Object(_) => args,
            _ => Value::Object(Map::new()),
        };

        let result = match catch_unwind(AssertUnwindSafe(|| (spec.handler)(&self.stores, args))) {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                tracing::warn!(tool = name, error = %err, "tool failed");
                error(err.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(tool = name, panic = %msg, "tool panicked");
                error(format!("tool panicked: {msg}"))
            }
        };

        tracing::debug!(tool = name, result = %result, "tool result");
        result
    }
}
