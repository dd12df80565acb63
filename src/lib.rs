//! A personal-assistant agent: a language model calling tools over a small
//! persisted knowledge base.
//!
//! The knowledge base holds discrete *items* (free text plus a flat property
//! map) and one running *global context* log of facts about the user. Items
//! are stored with their properties folded into the searchable text, so a
//! single record serves both semantic search and exact metadata filtering.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for cosine search and `json_extract` for metadata filters
//! - **Embeddings**: local ONNX all-MiniLM-L6-v2 (384 dimensions), or a
//!   model-free feature-hashing provider
//! - **Model**: any OpenAI-compatible chat-completions endpoint (OpenRouter by
//!   default)
//!
//! # Modules
//!
//! - [`store`]: property codec, backend trait, SQLite and in-memory backends, [`store::HybridStore`]
//! - [`context`]: the line-addressed global context log
//! - [`tools`]: tool schemas and the panic-proof dispatch boundary
//! - [`agent`]: the tool-calling loop and the model client
//! - [`config`], [`logging`], [`db`], [`embedding`]: plumbing

pub mod agent;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod logging;
pub mod store;
pub mod tools;
