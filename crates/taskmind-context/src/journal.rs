//! Journal storage.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::context::journal_path;
use crate::entry::ExecutionLogEntry;
use crate::error::ContextError;

/// Append-only store of execution entries, keyed by context id.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Append one entry after every entry already stored for `context_id`.
    async fn append(&self, context_id: &str, entry: &ExecutionLogEntry) -> Result<(), ContextError>;

    /// Entries for `context_id` in arrival order.
    async fn read(&self, context_id: &str) -> Result<Vec<ExecutionLogEntry>, ContextError>;
}

/// In-memory journal for testing.
pub struct MemoryJournalStore {
    entries: RwLock<HashMap<String, Vec<ExecutionLogEntry>>>,
}

impl MemoryJournalStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryJournalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    async fn append(&self, context_id: &str, entry: &ExecutionLogEntry) -> Result<(), ContextError> {
        let mut entries = self.entries.write().await;
        entries.entry(context_id.to_string()).or_default().push(entry.clone());
        Ok(())
    }

    async fn read(&self, context_id: &str) -> Result<Vec<ExecutionLogEntry>, ContextError> {
        let entries = self.entries.read().await;
        Ok(entries.get(context_id).cloned().unwrap_or_default())
    }
}

/// JSON Lines journal inside each context workspace.
///
/// ```text
/// {contexts_dir}/
/// └── {context_id}/
///     └── logs/
///         └── execution.jsonl
/// ```
pub struct FileJournalStore {
    contexts_dir: PathBuf,
}

impl FileJournalStore {
    pub fn new(contexts_dir: impl Into<PathBuf>) -> Self {
        Self {
            contexts_dir: contexts_dir.into(),
        }
    }

    fn path(&self, context_id: &str) -> PathBuf {
        journal_path(&self.contexts_dir.join(context_id))
    }
}

#[async_trait]
impl JournalStore for FileJournalStore {
    async fn append(&self, context_id: &str, entry: &ExecutionLogEntry) -> Result<(), ContextError> {
        let path = self.path(context_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(context_id, step = %entry.step, "Journal entry appended");
        Ok(())
    }

    async fn read(&self, context_id: &str) -> Result<Vec<ExecutionLogEntry>, ContextError> {
        let path = self.path(context_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut entries = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExecutionLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed journal line {} in {:?}: {}", n + 1, path, e),
            }
        }
        Ok(entries)
    }
}
