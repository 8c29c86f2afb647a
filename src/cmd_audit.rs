//! Audit subcommand handler.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use tracing::info;

use taskmind_audit::{ConsistencyValidator, Inventory};
use taskmind_commands::CommandRegistry;
use taskmind_config::CommandsConfig;

/// Audit the built-in commands against a legacy inventory. Exit 0 only on a full pass.
pub(crate) fn audit(config: &CommandsConfig, legacy: &Path, as_json: bool) -> anyhow::Result<ExitCode> {
    let legacy = Inventory::load(legacy)
        .with_context(|| format!("failed to load legacy inventory {}", legacy.display()))?;
    let current = Inventory::from_registry(&CommandRegistry::standard(config));
    info!(legacy = legacy.len(), current = current.len(), "Auditing capability surface");

    let report = ConsistencyValidator::new().audit(&legacy, &current);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
