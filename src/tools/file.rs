//! File tools confined to a sandbox root.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::FileToolsConfig;
use crate::mcp::{ToolDefinition, ToolHandler};
use crate::models::{ParamSpec, ParamType, ToolArgs};
use crate::utils::resolve_in_root;

/// Sandbox shared by all file tools
#[derive(Debug)]
pub struct FileSandbox {
    root: PathBuf,
    allow_write: bool,
    max_read_bytes: usize,
}

impl FileSandbox {
    pub fn new(config: &FileToolsConfig) -> Self {
        Self {
            root: config.root.clone(),
            allow_write: config.allow_write,
            max_read_bytes: config.max_read_bytes,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(resolve_in_root(&self.root, path)?)
    }

    /// Path relative to the sandbox root, for display
    fn display(&self, path: &Path) -> String {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        match path.strip_prefix(&root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

fn path_param(description: &str) -> ParamSpec {
    ParamSpec::required("path", ParamType::String).describe(description)
}

pub fn definitions(config: &FileToolsConfig) -> Vec<ToolDefinition> {
    let sandbox = Arc::new(FileSandbox::new(config));

    vec![
        ToolDefinition::new(
            "read_file",
            "Read a text file inside the workspace root",
            Arc::new(ReadFileHandler {
                sandbox: sandbox.clone(),
            }),
        )
        .param(path_param("File path, relative to the workspace root"))
        .param(
            ParamSpec::optional("max_bytes", ParamType::Integer)
                .describe("Read at most this many bytes (capped by server config)"),
        ),
        ToolDefinition::new(
            "write_file",
            "Write text to a file inside the workspace root (requires allow_write)",
            Arc::new(WriteFileHandler {
                sandbox: sandbox.clone(),
            }),
        )
        .param(path_param("File path, relative to the workspace root"))
        .param(ParamSpec::required("content", ParamType::String).describe("Text to write"))
        .param(
            ParamSpec::optional("append", ParamType::Boolean)
                .with_default(false)
                .describe("Append instead of overwriting"),
        ),
        ToolDefinition::new(
            "list_directory",
            "List the entries of a directory inside the workspace root",
            Arc::new(ListDirectoryHandler {
                sandbox: sandbox.clone(),
            }),
        )
        .param(
            ParamSpec::optional("path", ParamType::String)
                .with_default(".")
                .describe("Directory path, relative to the workspace root"),
        ),
        ToolDefinition::new(
            "file_info",
            "Get size, type, permissions and modification time of a path",
            Arc::new(FileInfoHandler { sandbox }),
        )
        .param(path_param("Path, relative to the workspace root")),
    ]
}

fn entry_kind(metadata: &Metadata) -> &'static str {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_dir() {
        "directory"
    } else if file_type.is_file() {
        "file"
    } else {
        "other"
    }
}

fn modified_rfc3339(metadata: &Metadata) -> Option<String> {
    metadata
        .modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).to_rfc3339())
}

/// Handler for reading a file
#[derive(Debug)]
pub struct ReadFileHandler {
    pub sandbox: Arc<FileSandbox>,
}

#[async_trait::async_trait]
impl ToolHandler for ReadFileHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let requested = args.str("path")?;
        let path = self.sandbox.resolve(requested)?;

        let limit = match args.opt_i64("max_bytes") {
            Some(n) if n <= 0 => bail!("max_bytes must be positive"),
            Some(n) => (n as usize).min(self.sandbox.max_read_bytes),
            None => self.sandbox.max_read_bytes,
        };

        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("cannot open '{}'", requested))?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            bail!("'{}' is not a regular file", requested);
        }
        let size = metadata.len();

        let mut buf = Vec::new();
        file.take(limit as u64)
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("cannot read '{}'", requested))?;

        Ok(json!({
            "path": self.sandbox.display(&path),
            "content": String::from_utf8_lossy(&buf),
            "bytes_read": buf.len(),
            "size": size,
            "truncated": (buf.len() as u64) < size,
        }))
    }
}

/// Handler for writing a file
#[derive(Debug)]
pub struct WriteFileHandler {
    pub sandbox: Arc<FileSandbox>,
}

#[async_trait::async_trait]
impl ToolHandler for WriteFileHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        if !self.sandbox.allow_write {
            bail!("file writes are disabled (set tools.files.allow_write = true)");
        }

        let requested = args.str("path")?;
        let content = args.str("content")?;
        let append = args.bool("append")?;
        let path = self.sandbox.resolve(requested)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .await
            .with_context(|| format!("cannot open '{}' for writing", requested))?;
        file.write_all(content.as_bytes())
            .await
            .with_context(|| format!("cannot write '{}'", requested))?;
        file.flush().await?;

        tracing::info!(path = %path.display(), bytes = content.len(), append, "Wrote file");

        Ok(json!({
            "path": self.sandbox.display(&path),
            "bytes_written": content.len(),
            "appended": append,
        }))
    }
}

/// Handler for listing a directory
#[derive(Debug)]
pub struct ListDirectoryHandler {
    pub sandbox: Arc<FileSandbox>,
}

#[async_trait::async_trait]
impl ToolHandler for ListDirectoryHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let requested = args.str("path")?;
        let path = self.sandbox.resolve(requested)?;

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .with_context(|| format!("cannot list '{}'", requested))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "kind": entry_kind(&metadata),
                "size": metadata.len(),
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": self.sandbox.display(&path),
            "count": entries.len(),
            "entries": entries,
        }))
    }
}

/// Handler for file metadata
#[derive(Debug)]
pub struct FileInfoHandler {
    pub sandbox: Arc<FileSandbox>,
}

#[async_trait::async_trait]
impl ToolHandler for FileInfoHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let requested = args.str("path")?;
        let path = self.sandbox.resolve(requested)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("'{}' not found", requested))?;

        Ok(json!({
            "path": self.sandbox.display(&path),
            "kind": entry_kind(&metadata),
            "size": metadata.len(),
            "readonly": metadata.permissions().readonly(),
            "modified": modified_rfc3339(&metadata),
        }))
    }
}
