//! The boundary to the language model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::{Message, ToolCall};
use crate::tools::ToolSchema;

/// How freely the model may call tools. The loop always lets it decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// Everything the model sees for one completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
}

/// The model's answer: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse model response: {0}")]
    Decode(String),

    #[error("model returned no choices")]
    EmptyReply,
}

/// A chat-completions capable model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_id(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ModelReply, ModelError>;
}
