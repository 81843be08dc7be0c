//! Gemini `generateContent` endpoint

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Gemini REST provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = params
            .turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::Requester => "user",
                    Role::Responder => "model",
                };
                let part = match &turn.content {
                    TurnContent::Text { text } => json!({ "text": text }),
                    TurnContent::ToolRequest { call } => json!({
                        "functionCall": { "name": &call.name, "args": &call.arguments }
                    }),
                    TurnContent::ToolResult { name, output, .. } => json!({
                        "functionResponse": { "name": name, "response": output.to_response() }
                    }),
                };
                json!({ "role": role, "parts": [part] })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": params.max_tokens,
                "temperature": params.temperature,
            },
        });

        if !params.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": &params.system }] });
        }

        if !params.tools.is_empty() {
            let declarations: Vec<serde_json::Value> = params
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": &tool.name,
                        "description": &tool.description,
                        "parameters": gemini_schema(&tool.parameters),
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let candidate = json["candidates"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(text) = part["text"].as_str() {
                    texts.push(text.to_string());
                }
                if let Some(call) = part.get("functionCall") {
                    let name = call["name"].as_str().unwrap_or("").to_string();
                    let args = call
                        .get("args")
                        .cloned()
                        .unwrap_or_else(|| json!({}));
                    // Gemini does not number its calls
                    let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                    tool_calls.push(ToolCall::new(id, name, args));
                }
            }
        }

        let text = if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        };

        let finish_reason = candidate["finishReason"]
            .as_str()
            .unwrap_or("STOP")
            .to_string();

        let metadata = &json["usageMetadata"];
        let usage = Usage {
            prompt_tokens: metadata["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            total_tokens: metadata["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        };

        Ok(ChatResponse {
            text,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

/// Gemini expects upper-case OpenAPI type names (`OBJECT`, `STRING`)
fn gemini_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                let converted = match (key.as_str(), value.as_str()) {
                    ("type", Some(kind)) => json!(kind.to_uppercase()),
                    _ => gemini_schema(value),
                };
                out.insert(key.clone(), converted);
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(gemini_schema).collect())
        }
        other => other.clone(),
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = self.endpoint(&params.model);
        trace!("Sending {} turns to {}", params.turns.len(), url);

        let body = self.build_request(&params);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let message = serde_json::from_str::<serde_json::Value>(&raw)
                .map(|json| error_message(&json))
                .unwrap_or(raw);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&raw)?;
        let parsed = self.parse_response(json)?;
        debug!("Gemini replied with {} tool calls", parsed.tool_calls.len());
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
