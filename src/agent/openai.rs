//! OpenAI-compatible chat completion client (`<base_url>/chat/completions`).
//!
//! Works against OpenRouter (the default base URL), OpenAI itself, and local
//! servers that speak the same protocol. Wire types are private; callers deal
//! in [`ChatRequest`] and [`ModelReply`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::message::{Message, ToolCall};
use super::model::{ChatModel, ChatRequest, ModelError, ModelReply, ToolChoice};
use crate::config::LlmConfig;
use crate::tools::ToolSchema;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleModel {
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSchema],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

fn no_tools(tools: &&[ToolSchema]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Return the response if successful, otherwise a structured error carrying
/// the provider's own message when it sent one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .unwrap_or(body);

    error!(%status, %message, "model request returned HTTP error");
    Err(ModelError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ModelReply, ModelError> {
        let payload = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: (!request.tools.is_empty()).then_some(request.tool_choice),
        };
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.endpoint, error = %e, "model request failed (transport)");
                ModelError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ModelError::EmptyReply)?
            .message;
        let tool_calls = message.tool_calls.unwrap_or_default();
        debug!(tool_calls = tool_calls.len(), has_text = message.content.is_some(), "received completion");

        Ok(ModelReply {
            content: message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".into(),
            model: "test/model".into(),
            base_url: base_url.into(),
            timeout_secs: 5,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![Message::system("be brief"), Message::user("hi")],
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let model = OpenAiCompatibleModel::new(&config("https://example.test/api/v1/")).unwrap();
        assert_eq!(model.endpoint, "https://example.test/api/v1/chat/completions");
    }

    #[test]
    fn tool_choice_omitted_without_tools() {
        let messages = [Message::user("hi")];
        let payload = CompletionRequest {
            model: "m",
            messages: &messages,
            tools: &[],
            tool_choice: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn tool_choice_is_auto_on_the_wire() {
        let messages = [Message::user("hi")];
        let payload = CompletionRequest {
            model: "m",
            messages: &messages,
            tools: &[],
            tool_choice: Some(ToolChoice::Auto),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["tool_choice"], "auto");
    }

    #[tokio::test]
    async fn decodes_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "query_items", "arguments": "{\"text\":\"milk\"}"}
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(&config(&server.url())).unwrap();
        let reply = model.complete(&request()).await.unwrap();
        mock.assert_async().await;

        assert!(reply.content.is_none());
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].function.name, "query_items");
        assert_eq!(reply.tool_calls[0].function.arguments, "{\"text\":\"milk\"}");
    }

    #[tokio::test]
    async fn error_envelope_becomes_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "No auth credentials found", "code": 401}}"#)
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(&config(&server.url())).unwrap();
        match model.complete(&request()).await {
            Err(ModelError::Status { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "No auth credentials found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(&config(&server.url())).unwrap();
        assert!(matches!(model.complete(&request()).await, Err(ModelError::EmptyReply)));
    }
}
