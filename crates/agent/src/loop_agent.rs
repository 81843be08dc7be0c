//! Agent loop - drives one file's review to a verdict

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use reviewer_config::Config;
use reviewer_provider::{ChatParams, ChatResponse, Provider, ToolCall, ToolDeclaration, ToolOutput};

use crate::conversation::Conversation;
use crate::directive::REVIEW_DIRECTIVE;
use crate::report::{ReportEvent, Reporter};
use crate::tools::{ToolError, ToolKind, ToolRegistry};
use crate::{AgentError, Result};

/// Limits and model parameters for each file's loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Empty means the provider's default model
    pub model: String,
    pub max_rounds: u32,
    pub request_timeout: Duration,
    pub file_deadline: Option<Duration>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        let review = &config.review;
        Self {
            model: config.model(),
            max_rounds: review.max_rounds,
            request_timeout: review.request_timeout(),
            file_deadline: review.file_deadline(),
            max_retries: review.max_retries,
            retry_backoff: review.retry_backoff(),
            max_tokens: review.max_tokens,
            temperature: review.temperature,
        }
    }
}

/// What one file's loop produced.
///
/// Counters are kept even when the loop ends in an error, so writes made
/// before a timeout still show up in the run summary.
#[derive(Debug)]
pub struct FileReview {
    pub path: PathBuf,
    pub writes: u32,
    pub rounds: u32,
    pub outcome: Result<String>,
}

impl FileReview {
    pub fn verdict(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }
}

#[derive(Default)]
struct Progress {
    writes: u32,
    rounds: u32,
}

/// The agent loop runs the request / dispatch cycle for a single file
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: LoopSettings,
    declarations: Vec<ToolDeclaration>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, settings: LoopSettings) -> Self {
        let mut settings = settings;
        if settings.model.is_empty() {
            settings.model = provider.default_model();
        }
        let declarations = tools.definitions();

        Self {
            provider,
            tools,
            settings,
            declarations,
        }
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    /// Review a file with a fresh conversation
    pub async fn review_file(
        &self,
        path: &Path,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> FileReview {
        let mut conversation = Conversation::for_file(path);
        self.review(&mut conversation, reporter, cancel).await
    }

    /// Drive `conversation` until the model returns a verdict or a limit trips
    pub async fn review(
        &self,
        conversation: &mut Conversation,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> FileReview {
        let mut progress = Progress::default();
        let path = conversation.path().to_path_buf();

        let deadline = self.settings.file_deadline.map(|limit| Instant::now() + limit);
        let outcome = self
            .drive(conversation, &mut progress, deadline, reporter, cancel)
            .await;

        match &outcome {
            Ok(_) => info!(
                "Reviewed {:?}: {} writes in {} rounds",
                path, progress.writes, progress.rounds
            ),
            Err(e) => warn!("Review of {:?} ended early: {}", path, e),
        }

        FileReview {
            path,
            writes: progress.writes,
            rounds: progress.rounds,
            outcome,
        }
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        progress: &mut Progress,
        deadline: Option<Instant>,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> Result<String> {
        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if expired(deadline) {
                return Err(self.deadline_exceeded());
            }
            if progress.rounds >= self.settings.max_rounds {
                return Err(AgentError::LoopBudgetExceeded {
                    rounds: self.settings.max_rounds,
                });
            }
            progress.rounds += 1;
            debug!("{:?}: round {}", conversation.path(), progress.rounds);

            let response = self.request(conversation, deadline, cancel).await?;

            if !response.has_tool_calls() {
                return Ok(response
                    .text
                    .unwrap_or_else(|| "Review completed.".to_string()));
            }

            for call in response.tool_calls {
                // Checked before every invocation so a write never starts after cancellation
                if cancel.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }
                // An invocation that has started always runs to completion and is counted
                if expired(deadline) {
                    return Err(self.deadline_exceeded());
                }

                let output = self.dispatch(conversation, &call).await;

                if call.name == ToolKind::WriteFile.name() && !output.is_failure() {
                    progress.writes += 1;
                    let written = call.arguments["file_path"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| conversation.path().display().to_string());
                    reporter.report(ReportEvent::FileWritten {
                        path: written,
                        writes: progress.writes,
                    });
                }

                conversation.record_invocation(call, output);
            }
        }
    }

    /// Execute one tool call, turning any failure into an error result
    async fn dispatch(&self, conversation: &Conversation, call: &ToolCall) -> ToolOutput {
        debug!("Executing tool: {}", call.name);

        if call.name == ToolKind::ListFiles.name() && conversation.has_enumerated() {
            return failure(&call.name, ToolError::AlreadyEnumerated);
        }

        let tools = Arc::clone(&self.tools);
        let name = call.name.clone();
        let args = call.arguments.clone();
        let handle = tokio::spawn(async move { tools.execute(&name, args).await });

        match handle.await {
            Ok(Ok(value)) => ToolOutput::Success(value),
            Ok(Err(e)) => failure(&call.name, e),
            Err(e) => ToolOutput::Failure(format!("tool task failed: {}", e)),
        }
    }

    /// One model request with timeout and bounded retries
    async fn request(
        &self,
        conversation: &Conversation,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let params = ChatParams {
                model: self.settings.model.clone(),
                system: REVIEW_DIRECTIVE.to_string(),
                turns: conversation.turns().to_vec(),
                tools: self.declarations.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };

            let call = tokio::time::timeout(self.settings.request_timeout, self.provider.chat(params));
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                _ = sleep_until(deadline) => return Err(self.deadline_exceeded()),
                outcome = call => outcome,
            };

            let error = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if !e.is_retryable() => return Err(AgentError::Remote(e)),
                Ok(Err(e)) => AgentError::Remote(e),
                Err(_) => AgentError::RemoteTimeout {
                    timeout: self.settings.request_timeout,
                },
            };

            if attempt > self.settings.max_retries {
                return Err(error);
            }

            let backoff = self.settings.retry_backoff * attempt;
            warn!(
                "Model request failed (attempt {}): {}; retrying in {:?}",
                attempt, error, backoff
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                _ = sleep_until(deadline) => return Err(self.deadline_exceeded()),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    fn deadline_exceeded(&self) -> AgentError {
        AgentError::FileDeadlineExceeded(self.settings.file_deadline.unwrap_or_default())
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|at| Instant::now() >= at)
}

/// Resolves at the deadline, or never when there is none
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn failure(name: &str, error: ToolError) -> ToolOutput {
    debug!("Tool {} failed: {}", name, error);
    ToolOutput::Failure(error.to_string())
}
