//! Remote model protocol
//!
//! Conversation turns, tool declarations and the `Provider` trait through
//! which the review loop talks to a generative model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Remote model errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured")]
    NoApiKey,

    #[error("response had no candidates")]
    InvalidResponse,

    #[error("rate limited")]
    RateLimited,
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request(_) | ProviderError::RateLimited => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::Json(_) | ProviderError::NoApiKey | ProviderError::InvalidResponse => {
                false
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of executing a tool call, as fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutput {
    Success(Value),
    Failure(String),
}

impl ToolOutput {
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }

    /// Object form sent over the wire: `{"result": ..}` or `{"error": ..}`
    pub fn to_response(&self) -> Value {
        match self {
            ToolOutput::Success(value) => serde_json::json!({ "result": value }),
            ToolOutput::Failure(message) => serde_json::json!({ "error": message }),
        }
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The local side: prompts and tool results
    Requester,
    /// The remote model: text and tool requests
    Responder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnContent {
    Text {
        text: String,
    },
    ToolRequest {
        call: ToolCall,
    },
    ToolResult {
        call_id: String,
        name: String,
        output: ToolOutput,
    },
}

/// One entry of a conversation's causal history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn requester_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Requester,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn responder_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Responder,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn tool_request(call: ToolCall) -> Self {
        Self {
            role: Role::Responder,
            content: TurnContent::ToolRequest { call },
        }
    }

    pub fn tool_result(call: &ToolCall, output: ToolOutput) -> Self {
        Self {
            role: Role::Requester,
            content: TurnContent::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                output,
            },
        }
    }
}

/// Tool declaration advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Token accounting reported by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Model reply: either tool requests or a terminal verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }
}

/// One model request
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    /// Behavioral directive, sent as the system instruction
    pub system: String,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDeclaration>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            system: String::new(),
            turns: Vec::new(),
            tools: Vec::new(),
            max_tokens: 8192,
            temperature: 0.2,
        }
    }
}

/// Generative model endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

/// Build a JSON object schema of string parameters
pub fn object_schema(properties: &[(&str, &str, bool)]) -> Value {
    let mut props = serde_json::Map::new();
    let mut required = Vec::new();

    for (name, description, is_required) in properties {
        props.insert(
            name.to_string(),
            serde_json::json!({
                "type": "string",
                "description": description
            }),
        );
        if *is_required {
            required.push(name.to_string());
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": props,
        "required": required
    })
}

/// Pull the `error.message` field out of an error body
pub(crate) fn error_message(json: &Value) -> String {
    json["error"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string()
}
