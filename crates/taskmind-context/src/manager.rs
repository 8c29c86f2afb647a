//! The process-wide active context slot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use taskmind_config::WorkspaceConfig;

use crate::context::{METADATA_FILE, RunContext, WORKSPACE_DIRS, slugify};
use crate::entry::ExecutionLogEntry;
use crate::error::ContextError;
use crate::journal::{FileJournalStore, JournalStore};

const CONTEXTS_DIR: &str = "projects";
const CURRENT_MARKER: &str = ".current";

/// Creates contexts and arbitrates the single active slot.
///
/// Every slot transition and journal append runs under one async mutex, so
/// at most one context is active across all callers sharing a manager, and
/// entries land in the journal in call order. Share it behind an `Arc`
/// instead of reaching for global state.
pub struct ContextManager {
    contexts_dir: PathBuf,
    journal: Arc<dyn JournalStore>,
    active: Mutex<Option<String>>,
}

impl ContextManager {
    /// Manager rooted at `root`, journaling to JSONL files in each workspace.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let contexts_dir = root.as_ref().join(CONTEXTS_DIR);
        let journal = Arc::new(FileJournalStore::new(contexts_dir.clone()));
        Self::with_journal(root, journal)
    }

    pub fn with_journal(root: impl AsRef<Path>, journal: Arc<dyn JournalStore>) -> Self {
        Self {
            contexts_dir: root.as_ref().join(CONTEXTS_DIR),
            journal,
            active: Mutex::new(None),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(&config.root)
    }

    /// Manager that resumes the context recorded by a previous process.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ContextError> {
        let manager = Self::new(root);
        let marker = manager.marker_path();

        let recorded = match fs::read_to_string(&marker).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(manager),
            Err(e) => return Err(e.into()),
        };

        match manager.load(&recorded).await {
            Ok(_) => {
                info!(context_id = %recorded, "Resumed active context");
                *manager.active.lock().await = Some(recorded);
            }
            Err(ContextError::ContextNotFound(_)) => {
                warn!(context_id = %recorded, "Active marker names a missing context, clearing it");
                remove_marker(&marker).await;
            }
            Err(e) => return Err(e),
        }
        Ok(manager)
    }

    pub fn contexts_dir(&self) -> &Path {
        &self.contexts_dir
    }

    fn marker_path(&self) -> PathBuf {
        self.contexts_dir.join(CURRENT_MARKER)
    }

    fn context_dir(&self, id: &str) -> Result<PathBuf, ContextError> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(ContextError::ContextNotFound(id.to_string()));
        }
        Ok(self.contexts_dir.join(id))
    }

    /// Create a context and its workspace. The new context is not activated.
    pub async fn init(&self, description: &str) -> Result<RunContext, ContextError> {
        let base = slugify(description);
        if base.is_empty() {
            return Err(ContextError::InvalidDescription(description.to_string()));
        }
        fs::create_dir_all(&self.contexts_dir).await?;

        let mut n = 1;
        loop {
            let id = if n == 1 { base.clone() } else { format!("{}-{}", base, n) };
            let dir = self.contexts_dir.join(&id);
            // `create_dir` fails on an existing directory, which claims the id atomically.
            match fs::create_dir(&dir).await {
                Ok(()) => {
                    for sub in WORKSPACE_DIRS {
                        fs::create_dir_all(dir.join(sub)).await?;
                    }
                    let context = RunContext::new(id, description, dir.clone());
                    let metadata = serde_json::to_string_pretty(&context)?;
                    fs::write(dir.join(METADATA_FILE), metadata).await?;
                    info!(context_id = %context.id, workspace = ?dir, "Context created");
                    return Ok(context);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Activate `id`. Re-activating the active context is a no-op.
    pub async fn set_context(&self, id: &str) -> Result<RunContext, ContextError> {
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_deref() {
            if current != id {
                return Err(ContextError::ContextConflict {
                    active: current.to_string(),
                    requested: id.to_string(),
                });
            }
        }

        let mut context = self.load(id).await?;
        if active.is_none() {
            fs::write(self.marker_path(), id).await?;
            *active = Some(id.to_string());
            info!(context_id = %id, "Context activated");
        }
        context.active = true;
        Ok(context)
    }

    /// Deactivate the active context, returning its id.
    pub async fn release(&self) -> Result<String, ContextError> {
        let mut active = self.active.lock().await;
        let id = active.take().ok_or(ContextError::NoActiveContext)?;
        remove_marker(&self.marker_path()).await;
        info!(context_id = %id, "Context released");
        Ok(id)
    }

    /// Id of the active context.
    pub async fn active(&self) -> Option<String> {
        self.active.lock().await.clone()
    }

    /// The active context.
    pub async fn current(&self) -> Result<RunContext, ContextError> {
        let id = self.active().await.ok_or(ContextError::NoActiveContext)?;
        self.get(&id).await
    }

    /// Append to the active context's journal.
    pub async fn log(&self, entry: ExecutionLogEntry) -> Result<(), ContextError> {
        let active = self.active.lock().await;
        let id = active.as_deref().ok_or(ContextError::NoActiveContext)?;
        self.journal.append(id, &entry).await
    }

    pub async fn get(&self, id: &str) -> Result<RunContext, ContextError> {
        let mut context = self.load(id).await?;
        context.active = self.active.lock().await.as_deref() == Some(id);
        Ok(context)
    }

    /// Every persisted context, oldest first.
    pub async fn list(&self) -> Result<Vec<RunContext>, ContextError> {
        let mut contexts = Vec::new();
        if !self.contexts_dir.exists() {
            return Ok(contexts);
        }

        let active = self.active().await;
        let mut entries = fs::read_dir(&self.contexts_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load(&id).await {
                Ok(mut context) => {
                    context.active = active.as_deref() == Some(id.as_str());
                    contexts.push(context);
                }
                Err(e) => debug!("Skipping {:?}: {}", entry.path(), e),
            }
        }
        contexts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(contexts)
    }

    /// Journal of `id` in arrival order. The context need not be active.
    pub async fn journal(&self, id: &str) -> Result<Vec<ExecutionLogEntry>, ContextError> {
        self.load(id).await?;
        self.journal.read(id).await
    }

    async fn load(&self, id: &str) -> Result<RunContext, ContextError> {
        let path = self.context_dir(id)?.join(METADATA_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ContextError::ContextNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

async fn remove_marker(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove active marker {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
