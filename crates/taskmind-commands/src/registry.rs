//! Static registry of command modules.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandResult, ErrorKind, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::content::{GetContentCommand, GetTitleCommand, GetUrlCommand, StatusCommand};
use crate::effects::{ClearEffectsCommand, EffectCommand, EffectKind};
use crate::error::CommandError;
use crate::interact::{ClickCommand, ScriptCommand};
use crate::navigation::NavigateCommand;
use crate::schema::CapabilityDescriptor;
use crate::screenshot::ScreenshotCommand;
use crate::scroll::{ScrollCommand, ScrollToTextCommand};
use crate::wait::WaitCommand;
use crate::zoom::ZoomCommand;

/// Commands by verb.
///
/// Modules register at construction time; the capability list is read from
/// here, never discovered.
pub struct CommandRegistry {
    commands: DashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: DashMap::new(),
        }
    }

    /// Registry holding every built-in command.
    pub fn standard(config: &CommandsConfig) -> Self {
        let registry = Self::new();
        let builtins: Vec<Arc<dyn Command>> = vec![
            Arc::new(NavigateCommand::new(config)),
            Arc::new(GetContentCommand::new()),
            Arc::new(GetTitleCommand::new()),
            Arc::new(GetUrlCommand::new()),
            Arc::new(StatusCommand::new()),
            Arc::new(ScrollCommand::new()),
            Arc::new(ScrollToTextCommand::new(config)),
            Arc::new(WaitCommand::new(config)),
            Arc::new(ScreenshotCommand::new()),
            Arc::new(EffectCommand::new(EffectKind::Highlight)),
            Arc::new(EffectCommand::new(EffectKind::Pointer)),
            Arc::new(EffectCommand::new(EffectKind::Spotlight)),
            Arc::new(EffectCommand::new(EffectKind::Annotate)),
            Arc::new(ClearEffectsCommand::new()),
            Arc::new(ZoomCommand::new(config)),
            Arc::new(ClickCommand::new(config)),
            Arc::new(ScriptCommand::new()),
        ];
        for command in builtins {
            registry.insert(command);
        }
        registry
    }

    fn insert(&self, command: Arc<dyn Command>) {
        self.commands.insert(command.verb().to_string(), command);
    }

    /// Register a command; fails if the verb is taken.
    pub fn register(&self, command: Arc<dyn Command>) -> Result<(), CommandError> {
        match self.commands.entry(command.verb().to_string()) {
            Entry::Occupied(entry) => Err(CommandError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(command);
                Ok(())
            }
        }
    }

    pub fn unregister(&self, verb: &str) -> Result<(), CommandError> {
        self.commands
            .remove(verb)
            .map(|_| ())
            .ok_or_else(|| CommandError::NotFound(verb.to_string()))
    }

    pub fn get(&self, verb: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(verb).map(|c| c.clone())
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.commands.contains_key(verb)
    }

    /// Registered verbs, sorted.
    pub fn verbs(&self) -> Vec<String> {
        let mut verbs: Vec<String> = self.commands.iter().map(|e| e.key().clone()).collect();
        verbs.sort();
        verbs
    }

    /// Capability descriptors of every registered command, sorted by verb.
    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        let mut descriptors: Vec<CapabilityDescriptor> = self
            .commands
            .iter()
            .map(|e| e.value().descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.verb.cmp(&b.verb));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run `verb`; an unknown verb is a failed result, not a panic.
    pub async fn execute(&self, invoker: &dyn Invoker, verb: &str, args: Value) -> CommandResult {
        let started = Instant::now();
        let Some(command) = self.get(verb) else {
            return CommandResult::failed(
                ErrorKind::UnknownCapability,
                format!("unknown command '{}'", verb),
                started.elapsed(),
            );
        };
        let result = command.execute(invoker, args).await;
        debug!(
            verb,
            success = result.success,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Command finished"
        );
        result
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
