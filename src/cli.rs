//! CLI definitions for Task-Mind.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Task-Mind CLI.
#[derive(Parser)]
#[command(name = "taskmind")]
#[command(about = "Browser automation control plane")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults apply when it does not exist)
    #[arg(short, long, env = "TASKMIND_CONFIG", default_value = "~/.task-mind/config.toml", global = true)]
    pub config: PathBuf,

    /// Also write daily-rotated logs under <workspace>/logs
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the background service in the foreground
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Stop a running service
    Stop,

    /// Report whether the service is running
    Status,

    /// Compare a legacy capability inventory against the built-in commands
    Audit {
        /// Legacy inventory (JSON or YAML)
        #[arg(long)]
        legacy: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recipe management commands
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },

    /// Run context commands
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum RecipeAction {
    /// List recipes from every configured source
    List {
        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Validate a recipe file or directory
    Validate {
        /// Path to recipe.md / recipe.yaml or its directory
        path: PathBuf,
    },

    /// Run a recipe against the configured browser
    Run {
        /// Recipe id
        recipe_id: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Deadline for the whole run, in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ContextAction {
    /// Create a run context
    Init {
        /// Human description; the id is derived from it
        description: String,
    },

    /// Activate a context
    Set { id: String },

    /// Deactivate the active context
    Release,

    /// List contexts
    List,

    /// Print a context's execution journal
    Log {
        /// Context id (defaults to the active one)
        id: Option<String>,
    },
}
