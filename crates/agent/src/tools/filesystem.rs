//! Filesystem tool surface: enumerate, read, overwrite

use async_trait::async_trait;
use reviewer_provider::object_schema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::path_utils::{normalize_path, resolve_within_root};
use super::{ToolError, ToolKind, ToolTrait};

/// Extensions picked up by enumeration, compared case-insensitively
pub const SOURCE_EXTENSIONS: [&str; 6] = ["js", "ts", "html", "css", "jsx", "tsx"];

/// Directory skipped at any depth
pub const DEPENDENCY_CACHE_DIR: &str = "node_modules";

/// Acknowledgement returned by a successful overwrite
pub const WRITE_ACK: &str = "UPDATED";

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == DEPENDENCY_CACHE_DIR
}

/// Recursively list source files under `dir` in a deterministic order.
///
/// Symlinks are not followed, so link cycles cannot recurse forever.
pub fn enumerate(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|e| ToolError::Enumeration(e.to_string()))?;
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            files.push(normalize_path(entry.path()));
        }
    }

    debug!("Enumerated {} source files under {:?}", files.len(), dir);
    Ok(files)
}

/// `enumerate` on the blocking pool
pub async fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || enumerate(&dir))
        .await
        .map_err(|e| ToolError::Enumeration(e.to_string()))?
}

async fn require_file(path: &Path) -> Result<(), ToolError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ToolError::NotAFile(path.display().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ToolError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(ToolError::Io(e)),
    }
}

/// Full text contents of an existing file
pub async fn read_text(path: &Path) -> Result<String, ToolError> {
    require_file(path).await?;
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Overwrite an existing file. Never creates one.
pub async fn write_text(path: &Path, content: &str) -> Result<&'static str, ToolError> {
    use tokio::io::AsyncWriteExt;

    require_file(path).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(false)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(WRITE_ACK)
}

pub struct ListFilesTool {
    root: PathBuf,
}

impl ListFilesTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    directory: Option<String>,
}

#[async_trait]
impl ToolTrait for ListFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ListFiles
    }
    fn description(&self) -> &str {
        "List all reviewable source files (.js, .ts, .html, .css, .jsx, .tsx) under a directory, \
         skipping hidden directories and node_modules. Call at most once."
    }
    fn parameters(&self) -> Value {
        object_schema(&[(
            "directory",
            "Directory to search, relative to the project root. Defaults to the root.",
            false,
        )])
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ListFilesArgs = serde_json::from_value(args)?;
        let raw = args.directory.unwrap_or_else(|| ".".to_string());
        let dir = resolve_within_root(&raw, &self.root).await?;

        debug!("list_files: {:?}", dir);
        let files = list_source_files(&dir).await?;
        let listed: Vec<String> = files
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        Ok(json!(listed))
    }
}

pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Deserialize)]
struct ReadFileArgs {
    file_path: String,
}

#[async_trait]
impl ToolTrait for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }
    fn description(&self) -> &str {
        "Read the full text content of a file."
    }
    fn parameters(&self) -> Value {
        object_schema(&[("file_path", "Path of the file to read", true)])
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ReadFileArgs = serde_json::from_value(args)?;
        let path = resolve_within_root(&args.file_path, &self.root).await?;

        debug!("read_file: {:?}", path);
        let content = read_text(&path).await?;
        Ok(Value::String(content))
    }
}

pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[async_trait]
impl ToolTrait for WriteFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteFile
    }
    fn description(&self) -> &str {
        "Replace the entire content of an existing file with new text. Does not create files."
    }
    fn parameters(&self) -> Value {
        object_schema(&[
            ("file_path", "Path of the file to overwrite", true),
            ("content", "Complete new content of the file", true),
        ])
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: WriteFileArgs = serde_json::from_value(args)?;
        let path = resolve_within_root(&args.file_path, &self.root).await?;

        debug!("write_file: {:?} ({} bytes)", path, args.content.len());
        let ack = write_text(&path, &args.content).await?;
        Ok(Value::String(ack.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_source_file_case_insensitive() {
        assert!(is_source_file(Path::new("a.js")));
        assert!(is_source_file(Path::new("Foo.JS")));
        assert!(is_source_file(Path::new("page.Html")));
        assert!(is_source_file(Path::new("c.tsx")));
        assert!(!is_source_file(Path::new("foo.py")));
        assert!(!is_source_file(Path::new("Makefile")));
        assert!(!is_source_file(Path::new("archive.js.gz")));
    }

    #[test]
    fn test_tool_kinds() {
        let root = PathBuf::from("/tmp");
        assert_eq!(ListFilesTool::new(root.clone()).name(), "list_files");
        assert_eq!(ReadFileTool::new(root.clone()).name(), "read_file");
        assert_eq!(WriteFileTool::new(root).name(), "write_file");
    }

    #[test]
    fn test_write_schema_requires_both_fields() {
        let schema = WriteFileTool::new(PathBuf::from("/tmp")).parameters();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }
}
