//! The conversational tool-calling loop.
//!
//! [`Agent::chat`] sends the system preamble plus history to the model. Each
//! reply either ends the turn with text or asks for tool calls; calls are
//! dispatched in order, their results appended as tool turns, and the model is
//! asked again.

pub mod message;
pub mod model;
pub mod openai;
pub mod prompt;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::tools::{ToolRegistry, ToolSchema};

pub use message::{FunctionCall, Message, ToolCall};
pub use model::{ChatModel, ChatRequest, ModelError, ModelReply, ToolChoice};
pub use openai::OpenAiCompatibleModel;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model kept calling tools after {limit} rounds")]
    ToolLoopExceeded { limit: usize },

    #[error("tool task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    schemas: Vec<ToolSchema>,
    system_prompt: String,
    history: Vec<Message>,
    max_tool_rounds: usize,
}

/// Arguments as the model wrote them, or `{}` when they are not a JSON object.
fn parse_arguments(call: &ToolCall) -> Value {
    match serde_json::from_str::<Value>(&call.function.arguments) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            warn!(
                tool = %call.function.name,
                arguments = %call.function.arguments,
                "tool arguments are not a JSON object; using {{}}"
            );
            Value::Object(Map::new())
        }
    }
}

impl Agent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        max_tool_rounds: usize,
    ) -> Self {
        let schemas = tools.schemas();
        Self {
            model,
            tools,
            schemas,
            system_prompt: system_prompt.into(),
            history: Vec::new(),
            max_tool_rounds,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Turns so far, without the system preamble.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation. The system preamble stays.
    pub fn reset(&mut self) {
        self.history.clear();
        info!("conversation reset");
    }

    fn request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(self.history.iter().cloned());
        ChatRequest {
            messages,
            tools: self.schemas.clone(),
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Run one user turn to completion and return the assistant's text.
    ///
    /// Model and transport failures end the turn with an error; everything a
    /// tool does wrong goes back to the model as a tool result instead.
    pub async fn chat(&mut self, user_text: &str) -> Result<String, AgentError> {
        self.history.push(Message::user(user_text));
        let mut rounds = 0usize;

        loop {
            let reply = self.model.complete(&self.request()).await?;

            if reply.tool_calls.is_empty() {
                debug!(rounds, "model finished turn");
                let text = reply.content.clone().unwrap_or_default();
                self.history.push(Message::Assistant {
                    content: reply.content,
                    tool_calls: Vec::new(),
                });
                return Ok(text);
            }

            rounds += 1;
            if rounds > self.max_tool_rounds {
                warn!(limit = self.max_tool_rounds, model = self.model.model_id(), "tool round limit reached");
                return Err(AgentError::ToolLoopExceeded {
                    limit: self.max_tool_rounds,
                });
            }
            debug!(round = rounds, calls = reply.tool_calls.len(), "model requested tools");

            let calls = reply.tool_calls.clone();
            self.history.push(Message::Assistant {
                content: reply.content,
                tool_calls: reply.tool_calls,
            });

            for call in calls {
                let args = parse_arguments(&call);
                let tools = Arc::clone(&self.tools);
                let name = call.function.name.clone();
                let result =
                    tokio::task::spawn_blocking(move || tools.dispatch(&name, args)).await?;
                self.history.push(Message::tool(call.id, result.to_string()));
            }
        }
    }
}
