//! Run context subcommand handlers.

use std::process::ExitCode;

use taskmind_config::WorkspaceConfig;
use taskmind_context::{ContextError, ContextManager};

use crate::cli::ContextAction;

pub(crate) async fn handle_context_command(
    config: &WorkspaceConfig,
    action: ContextAction,
) -> anyhow::Result<ExitCode> {
    let manager = ContextManager::open(&config.root).await?;

    match action {
        ContextAction::Init { description } => {
            let context = manager.init(&description).await?;
            println!("Created context '{}'", context.id);
            println!("  workspace: {}", context.workspace.display());
        }
        ContextAction::Set { id } => match manager.set_context(&id).await {
            Ok(context) => println!("Active context: {}", context.id),
            Err(ContextError::ContextConflict { active, .. }) => {
                eprintln!(
                    "Context '{}' is already active. Release it first with `taskmind context release`.",
                    active
                );
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e.into()),
        },
        ContextAction::Release => match manager.release().await {
            Ok(id) => println!("Released context '{}'", id),
            Err(ContextError::NoActiveContext) => println!("No active context"),
            Err(e) => return Err(e.into()),
        },
        ContextAction::List => {
            let active = manager.active().await;
            let contexts = manager.list().await?;
            if contexts.is_empty() {
                println!("No contexts in {}", manager.contexts_dir().display());
            }
            for context in contexts {
                let mark = if active.as_deref() == Some(context.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {:<40} {}  {}",
                    mark,
                    context.id,
                    context.created_at.format("%Y-%m-%d %H:%M"),
                    context.description
                );
            }
        }
        ContextAction::Log { id } => {
            let id = match id {
                Some(id) => id,
                None => manager.active().await.ok_or(ContextError::NoActiveContext)?,
            };
            for entry in manager.journal(&id).await? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
