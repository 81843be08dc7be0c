//! Tool surface offered to the model

pub mod filesystem;
pub mod path_utils;

pub use filesystem::{
    enumerate, list_source_files, read_text, write_text, ListFilesTool, ReadFileTool,
    WriteFileTool, WRITE_ACK,
};

use async_trait::async_trait;
use reviewer_provider::ToolDeclaration;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Tool execution errors, reported back to the model as error results
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("path {path} is outside the review root {root}")]
    OutsideRoot { path: String, root: String },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("list_files was already called for this file")]
    AlreadyEnumerated,

    #[error("enumeration failed: {0}")]
    Enumeration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The closed set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    ListFiles,
    ReadFile,
    WriteFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::ListFiles, ToolKind::ReadFile, ToolKind::WriteFile];

    /// Invocation name the model uses
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListFiles => "list_files",
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn kind(&self) -> ToolKind;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

pub fn to_declaration(tool: &dyn ToolTrait) -> ToolDeclaration {
    ToolDeclaration::new(tool.name(), tool.description(), tool.parameters())
}

/// Lookup table from tool kind to handler.
///
/// Built once per run and shared behind an `Arc`; nothing mutates it after
/// the loop starts.
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry with the three filesystem tools confined to `root`
    pub fn filesystem(root: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(ListFilesTool::new(root.to_path_buf()));
        registry.register(ReadFileTool::new(root.to_path_buf()));
        registry.register(WriteFileTool::new(root.to_path_buf()));
        registry
    }

    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.kind(), Box::new(tool));
    }

    pub fn get(&self, kind: ToolKind) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        ToolKind::from_name(name).is_some_and(|kind| self.tools.contains_key(&kind))
    }

    /// Declarations in a stable order
    pub fn definitions(&self) -> Vec<ToolDeclaration> {
        self.tools
            .values()
            .map(|t| to_declaration(t.as_ref()))
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = ToolKind::from_name(name)
            .and_then(|kind| self.tools.get(&kind))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(args).await
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|kind| kind.name()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
