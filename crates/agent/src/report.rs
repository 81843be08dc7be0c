//! Progress reporting and the run summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A file the run gave up on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate outcome of a run, accumulated monotonically
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub files_reviewed: usize,
    pub files_modified: usize,
    pub writes: u32,
    pub skipped: Vec<SkippedFile>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            files_reviewed: 0,
            files_modified: 0,
            writes: 0,
            skipped: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Fold in one file's write count
    pub fn add_writes(&mut self, writes: u32) {
        self.writes += writes;
        if writes > 0 {
            self.files_modified += 1;
        }
    }

    pub fn skip(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.skipped.push(SkippedFile {
            path,
            reason: reason.into(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} files modified ({} writes, {} skipped)",
            self.files_modified,
            self.total_files,
            self.writes,
            self.skipped.len()
        )?;
        if self.cancelled {
            write!(f, ", cancelled")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum ReportEvent {
    RunStarted { root: PathBuf },
    NoFilesFound { root: PathBuf },
    Reviewing { path: PathBuf, index: usize, total: usize },
    FileWritten { path: String, writes: u32 },
    Verdict { path: PathBuf, text: String },
    FileSkipped { path: PathBuf, reason: String },
    RunFinished(RunSummary),
    RunFailed { message: String },
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportEvent::RunStarted { root } => write!(f, "Starting review in {}", root.display()),
            ReportEvent::NoFilesFound { root } => {
                write!(f, "No reviewable files found in {}", root.display())
            }
            ReportEvent::Reviewing { path, index, total } => {
                write!(f, "[{}/{}] Reviewing {}", index, total, path.display())
            }
            ReportEvent::FileWritten { path, writes } => {
                write!(f, "Updated {} (write #{})", path, writes)
            }
            ReportEvent::Verdict { path, text } => {
                write!(f, "Done with {}: {}", path.display(), text.trim())
            }
            ReportEvent::FileSkipped { path, reason } => {
                write!(f, "Skipped {}: {}", path.display(), reason)
            }
            ReportEvent::RunFinished(summary) => write!(f, "Finished: {}", summary),
            ReportEvent::RunFailed { message } => write!(f, "Review failed: {}", message),
        }
    }
}

/// Append-only progress sink
pub trait Reporter: Send + Sync {
    fn report(&self, event: ReportEvent);
}

/// Forwards events into an unbounded channel
#[derive(Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelReporter {
    pub fn new(sender: mpsc::UnboundedSender<ReportEvent>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReportEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, event: ReportEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Report receiver dropped");
        }
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_accumulates() {
        let mut summary = RunSummary::new(3);
        summary.add_writes(2);
        summary.add_writes(0);
        summary.add_writes(1);
        summary.skip(PathBuf::from("c.js"), "timed out");

        assert_eq!(summary.writes, 3);
        assert_eq!(summary.files_modified, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert!(!summary.is_finished());

        summary.finish();
        assert!(summary.is_finished());
        assert_eq!(
            summary.to_string(),
            "2 of 3 files modified (3 writes, 1 skipped)"
        );
    }

    #[test]
    fn test_summary_serializes() {
        let summary = RunSummary::new(1);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["total_files"], 1);
        assert_eq!(value["cancelled"], false);
        assert!(value["finished_at"].is_null());
    }

    #[test]
    fn test_event_display() {
        let event = ReportEvent::Reviewing {
            path: PathBuf::from("src/a.js"),
            index: 1,
            total: 4,
        };
        assert_eq!(event.to_string(), "[1/4] Reviewing src/a.js");
    }

    #[tokio::test]
    async fn test_channel_reporter_forwards() {
        let (reporter, mut rx) = ChannelReporter::channel();
        reporter.report(ReportEvent::RunFailed {
            message: "boom".to_string(),
        });

        match rx.recv().await {
            Some(ReportEvent::RunFailed { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_channel_reporter_survives_dropped_receiver() {
        let (reporter, rx) = ChannelReporter::channel();
        drop(rx);
        reporter.report(ReportEvent::NoFilesFound {
            root: PathBuf::from("."),
        });
    }

    #[test]
    fn test_memory_reporter_keeps_order() {
        let reporter = MemoryReporter::new();
        reporter.report(ReportEvent::RunStarted {
            root: PathBuf::from("."),
        });
        reporter.report(ReportEvent::NoFilesFound {
            root: PathBuf::from("."),
        });
        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ReportEvent::NoFilesFound { .. }));
    }
}
