//! Run coordinator - enumerates once, reviews each file in order

use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use reviewer_provider::Provider;

use crate::loop_agent::{AgentLoop, LoopSettings};
use crate::report::{ReportEvent, Reporter, RunSummary};
use crate::tools::{list_source_files, ToolRegistry};
use crate::{AgentError, Result};

pub struct Coordinator {
    provider: Arc<dyn Provider>,
    settings: LoopSettings,
}

impl Coordinator {
    pub fn new(provider: Arc<dyn Provider>, settings: LoopSettings) -> Self {
        Self { provider, settings }
    }

    /// Review every source file under `root`.
    ///
    /// Missing credentials and enumeration failures abort the run. Anything
    /// that goes wrong inside one file's loop skips that file only.
    pub async fn run(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        match self.run_inner(root, reporter, cancel).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                reporter.report(ReportEvent::RunFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        if !self.provider.is_configured() {
            return Err(AgentError::MissingCredential);
        }

        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| AgentError::Enumeration(format!("{}: {}", root.display(), e)))?;
        reporter.report(ReportEvent::RunStarted { root: root.clone() });

        let files = list_source_files(&root)
            .await
            .map_err(|e| AgentError::Enumeration(e.to_string()))?;
        let mut summary = RunSummary::new(files.len());

        if files.is_empty() {
            info!("No source files under {:?}", root);
            reporter.report(ReportEvent::NoFilesFound { root });
            summary.finish();
            reporter.report(ReportEvent::RunFinished(summary.clone()));
            return Ok(summary);
        }

        let tools = Arc::new(ToolRegistry::filesystem(&root));
        let agent = AgentLoop::new(Arc::clone(&self.provider), tools, self.settings.clone());
        let total = files.len();

        for (index, path) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            reporter.report(ReportEvent::Reviewing {
                path: path.clone(),
                index: index + 1,
                total,
            });

            let review = agent.review_file(&path, reporter, cancel).await;
            summary.add_writes(review.writes);

            match review.outcome {
                Ok(text) => {
                    summary.files_reviewed += 1;
                    reporter.report(ReportEvent::Verdict { path, text });
                }
                Err(AgentError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    let reason = e.to_string();
                    reporter.report(ReportEvent::FileSkipped {
                        path: path.clone(),
                        reason: reason.clone(),
                    });
                    summary.skip(path, reason);
                }
            }
        }

        summary.finish();
        info!("Run finished: {}", summary);
        reporter.report(ReportEvent::RunFinished(summary.clone()));
        Ok(summary)
    }
}
