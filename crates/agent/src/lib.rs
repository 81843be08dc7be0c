//! Review agent core
//!
//! Filesystem tools, the per-file tool-calling loop and the run coordinator.

use std::time::Duration;
use thiserror::Error;

use reviewer_provider::ProviderError;

pub mod conversation;
pub mod coordinator;
pub mod directive;
pub mod loop_agent;
pub mod report;
pub mod tools;

pub use conversation::Conversation;
pub use coordinator::Coordinator;
pub use directive::REVIEW_DIRECTIVE;
pub use loop_agent::{AgentLoop, FileReview, LoopSettings};
pub use report::{ChannelReporter, MemoryReporter, ReportEvent, Reporter, RunSummary, SkippedFile};
pub use tools::{ToolError, ToolKind, ToolRegistry, ToolTrait};
pub use tokio_util::sync::CancellationToken;

/// Review errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("could not enumerate files: {0}")]
    Enumeration(String),

    #[error("no API key configured")]
    MissingCredential,

    #[error("model still requesting tools after {rounds} rounds")]
    LoopBudgetExceeded { rounds: u32 },

    #[error("model request timed out after {timeout:?}")]
    RemoteTimeout { timeout: Duration },

    #[error("model request failed: {0}")]
    Remote(#[from] ProviderError),

    #[error("file review exceeded its {0:?} deadline")]
    FileDeadlineExceeded(Duration),

    #[error("review cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AgentError>;
