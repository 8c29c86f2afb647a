//! Run context metadata and workspace layout.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subdirectories created in every context workspace.
pub const WORKSPACE_DIRS: [&str; 5] = ["logs", "scripts", "screenshots", "outputs", "temp"];

pub(crate) const METADATA_FILE: &str = "context.json";
pub(crate) const JOURNAL_FILE: &str = "execution.jsonl";

const MAX_SLUG_LEN: usize = 48;

/// A workspace plus journal for one automation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub workspace: PathBuf,
    /// Filled in by the manager when read; not persisted.
    #[serde(skip)]
    pub active: bool,
}

impl RunContext {
    pub(crate) fn new(id: String, description: &str, workspace: PathBuf) -> Self {
        Self {
            id,
            description: description.to_string(),
            created_at: Utc::now(),
            workspace,
            active: false,
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.workspace.join("logs")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.workspace.join("screenshots")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.workspace.join("outputs")
    }

    /// Path of the JSONL execution journal.
    pub fn journal_path(&self) -> PathBuf {
        journal_path(&self.workspace)
    }
}

pub(crate) fn journal_path(workspace: &Path) -> PathBuf {
    workspace.join("logs").join(JOURNAL_FILE)
}

/// Identifier derived from a description: lowercase alphanumerics joined by
/// single dashes.
pub fn slugify(description: &str) -> String {
    let mut slug = String::new();
    let mut dash = false;
    for c in description.chars() {
        if c.is_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            dash = false;
            slug.extend(c.to_lowercase());
        } else {
            dash = true;
        }
        if slug.chars().count() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug
}
