//! Item and property type definitions.
//!
//! Defines [`PropertyValue`] (the closed set of scalar shapes a property may take),
//! the [`Properties`] map, and [`Item`] (the public view of a stored record).

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata keys owned by the store. Never user-editable, never encoded.
pub const RESERVED_KEYS: [&str; 2] = ["created_at", "updated_at"];

/// Returns `true` for `created_at` / `updated_at`.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A single property value. Only scalars are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Short type label used by the inspection report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality with SQLite's comparison rules: integers, floats and booleans
    /// compare numerically, everything else must match exactly.
    pub fn loosely_equals(&self, other: &PropertyValue) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Property map. Keys iterate in sorted order, which fixes the encoded line order.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Copy of `properties` with the reserved timestamp keys removed.
pub fn user_properties(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// A stored item as seen by every caller outside the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// UUID v7 for generated items; caller-chosen for upserts.
    pub id: String,
    /// Decoded content. Never contains the encoded property section.
    pub content: String,
    /// User properties only; timestamps live in their own fields.
    pub properties: Properties,
    /// RFC 3339 UTC creation timestamp, fixed at first write.
    pub created_at: String,
    /// RFC 3339 UTC timestamp of the last mutation.
    pub updated_at: String,
}
