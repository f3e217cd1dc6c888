//! Chat client for the judging agent, speaking the OpenAI-compatible
//! `/v1/chat/completions` protocol.
//!
//! The runner only depends on the [`LlmClient`] trait, so tests can
//! script replies without any network. [`OpenAiClient`] is the real
//! implementation and works against any endpoint that understands the
//! OpenAI chat schema.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rmcp::model::Tool;
use serde_json::{json, Value as JsonValue};

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the agent's transcript.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A tool the model is allowed to call, in OpenAI function-call form.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

impl ToolSpec {
    /// Converts an MCP tool descriptor into the shape the chat API
    /// expects: the tool's JSON schema becomes the function parameters.
    pub fn from_tool(tool: &Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool
                .description
                .as_deref()
                .unwrap_or("(no description provided)")
                .to_string(),
            parameters: JsonValue::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// A tool call requested by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

/// What the model answered with: either a final text answer or one or
/// more tool calls to execute before continuing.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatReply {
    Final(String),
    ToolCalls(Vec<ToolCallRequest>),
}

/// A failed chat exchange.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LlmError {
    /// The request never produced a usable HTTP response.
    Http(String),
    /// The endpoint answered, but not with a well-formed completion.
    Response(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Http(message) => write!(f, "chat request failed: {message}"),
            LlmError::Response(message) => write!(f, "malformed chat response: {message}"),
        }
    }
}

impl std::error::Error for LlmError {}

/// The judging model, abstracted for testing.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the transcript plus the allowed tools and returns the
    /// model's next step.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec])
        -> Result<ChatReply, LlmError>;
}

/// Configuration for [`OpenAiClient`].
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Base URL of the endpoint, without the `/v1/...` path.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
        }
    }
}

/// Cumulative token usage across every call made through one client.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// [`LlmClient`] over an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    config: LlmConfig,
    http: reqwest::Client,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        }
    }

    /// Token usage accumulated so far.
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    fn record_usage(&self, body: &JsonValue) {
        let usage = &body["usage"];
        if let Some(prompt) = usage["prompt_tokens"].as_u64() {
            self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        }
        if let Some(completion) = usage["completion_tokens"].as_u64() {
            self.completion_tokens
                .fetch_add(completion, Ordering::Relaxed);
        }
    }

    fn build_body(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> JsonValue {
        let messages: Vec<JsonValue> = messages
            .iter()
            .map(|message| {
                json!({
                    "role": message.role.as_str(),
                    "content": message.content,
                })
            })
            .collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
        });
        if !tools.is_empty() {
            let tools: Vec<JsonValue> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatReply, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(messages, tools))
            .send()
            .await
            .map_err(|error| LlmError::Http(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("{url} returned {status}: {body}")));
        }
        let body: JsonValue = response
            .json()
            .await
            .map_err(|error| LlmError::Response(error.to_string()))?;
        self.record_usage(&body);
        parse_chat_reply(&body)
    }
}

/// Extracts the model's next step from a chat completions response
/// body. Tool calls win over content when both are present.
pub fn parse_chat_reply(body: &JsonValue) -> Result<ChatReply, LlmError> {
    let message = &body["choices"][0]["message"];
    if message.is_null() {
        return Err(LlmError::Response(
            "response has no choices[0].message".to_string(),
        ));
    }
    if let Some(raw_calls) = message["tool_calls"].as_array() {
        let mut calls = Vec::with_capacity(raw_calls.len());
        for raw in raw_calls {
            let name = raw["function"]["name"]
                .as_str()
                .ok_or_else(|| LlmError::Response("tool call has no function.name".to_string()))?;
            let raw_arguments = raw["function"]["arguments"].as_str().unwrap_or("{}");
            let arguments: JsonValue = serde_json::from_str(raw_arguments).map_err(|error| {
                LlmError::Response(format!(
                    "tool call arguments for '{name}' are not valid JSON: {error}"
                ))
            })?;
            calls.push(ToolCallRequest {
                id: raw["id"].as_str().unwrap_or_default().to_string(),
                name: name.to_string(),
                arguments,
            });
        }
        if !calls.is_empty() {
            return Ok(ChatReply::ToolCalls(calls));
        }
    }
    let content = message["content"]
        .as_str()
        .ok_or_else(|| LlmError::Response("message has neither content nor tool calls".to_string()))?;
    Ok(ChatReply::Final(content.to_string()))
}
