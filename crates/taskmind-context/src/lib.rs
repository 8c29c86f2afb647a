//! Run contexts for task-mind.
//!
//! A run context is a workspace directory plus an append-only execution
//! journal. Any number of contexts may exist on disk, but at most one is
//! active in a process at a time; [`ContextManager`] owns that slot.

mod context;
mod entry;
mod error;
mod journal;
mod manager;

pub use context::{RunContext, WORKSPACE_DIRS, slugify};
pub use entry::{ActionKind, ExecutionLogEntry, ExecutionMethod, Insight, LogStatus};
pub use error::ContextError;
pub use journal::{FileJournalStore, JournalStore, MemoryJournalStore};
pub use manager::ContextManager;
