//! Per-file conversation state

use reviewer_provider::{ToolCall, ToolOutput, Turn, TurnContent};
use std::path::{Path, PathBuf};

use crate::directive::seed_prompt;
use crate::tools::ToolKind;

/// Ordered turn history for one file's review.
///
/// Only grows by appending; dropped when the file's loop exits.
#[derive(Debug, Clone)]
pub struct Conversation {
    path: PathBuf,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Fresh conversation seeded with a single review request
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seed = Turn::requester_text(seed_prompt(&path));
        Self {
            path,
            turns: vec![seed],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append the request and then its result
    pub fn record_invocation(&mut self, call: ToolCall, output: ToolOutput) {
        let result = Turn::tool_result(&call, output);
        self.turns.push(Turn::tool_request(call));
        self.turns.push(result);
    }

    pub fn tool_requests(&self) -> impl Iterator<Item = &ToolCall> {
        self.turns.iter().filter_map(|turn| match &turn.content {
            TurnContent::ToolRequest { call } => Some(call),
            _ => None,
        })
    }

    /// Whether list_files has already succeeded in this conversation.
    ///
    /// A failed call (bad directory, bad arguments) does not use up the one
    /// allowed enumeration.
    pub fn has_enumerated(&self) -> bool {
        self.turns.iter().any(|turn| {
            matches!(
                &turn.content,
                TurnContent::ToolResult { name, output, .. }
                    if name == ToolKind::ListFiles.name() && !output.is_failure()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewer_provider::Role;
    use serde_json::json;

    #[test]
    fn test_seeded_with_one_requester_turn() {
        let conversation = Conversation::for_file("/work/a.js");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.turns()[0].role, Role::Requester);
        assert_eq!(conversation.path(), Path::new("/work/a.js"));
        assert!(!conversation.has_enumerated());
    }

    #[test]
    fn test_record_invocation_orders_request_then_result() {
        let mut conversation = Conversation::for_file("a.js");
        let call = ToolCall::new("c1", "list_files", json!({}));
        conversation.record_invocation(call, ToolOutput::Success(json!(["a.js"])));

        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.turns()[1].role, Role::Responder);
        assert_eq!(conversation.turns()[2].role, Role::Requester);
        assert!(matches!(
            conversation.turns()[2].content,
            TurnContent::ToolResult { ref call_id, .. } if call_id == "c1"
        ));
        assert!(conversation.has_enumerated());
        assert_eq!(conversation.tool_requests().count(), 1);
    }

    #[test]
    fn test_failed_listing_does_not_count() {
        let mut conversation = Conversation::for_file("a.js");
        let call = ToolCall::new("c1", "list_files", json!({"directory": ".."}));
        conversation.record_invocation(call, ToolOutput::Failure("outside".to_string()));
        assert!(!conversation.has_enumerated());

        let call = ToolCall::new("c2", "list_files", json!({}));
        conversation.record_invocation(call, ToolOutput::Success(json!([])));
        assert!(conversation.has_enumerated());
    }
}
