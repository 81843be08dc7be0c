//! Shared fixtures for agent integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use reviewer_agent::LoopSettings;
use reviewer_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply
pub enum Step {
    Respond(ChatResponse),
    Fail(ProviderError),
    /// Sleep before answering with the fallback
    Stall(Duration),
}

/// Provider that replays a fixed script and records every request
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ChatParams>>,
    fallback: ChatResponse,
    configured: bool,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            fallback: ChatResponse::text("done"),
            configured: true,
        }
    }

    /// Replies the script has run out of are answered with this
    pub fn with_fallback(mut self, fallback: ChatResponse) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(params);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(self.fallback.clone())
            }
            None => Ok(self.fallback.clone()),
        }
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

pub fn tools(calls: Vec<ToolCall>) -> Step {
    Step::Respond(ChatResponse::tool_calls(calls))
}

pub fn verdict(text: &str) -> Step {
    Step::Respond(ChatResponse::text(text))
}

/// Tight limits so failure paths finish quickly
pub fn fast_settings() -> LoopSettings {
    LoopSettings {
        model: "test-model".to_string(),
        max_rounds: 10,
        request_timeout: Duration::from_secs(5),
        file_deadline: None,
        max_retries: 2,
        retry_backoff: Duration::from_millis(1),
        max_tokens: 1024,
        temperature: 0.0,
    }
}
