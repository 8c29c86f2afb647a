//! Recipe subcommand handlers.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use serde_json::{Map, Value};
use tracing::info;

use taskmind_cdp::Session;
use taskmind_commands::CommandRegistry;
use taskmind_config::Config;
use taskmind_context::ContextManager;
use taskmind_recipes::{RecipeEngine, RecipeLoader, RecipeRegistry, RecipeValidator};

use crate::cli::RecipeAction;

pub(crate) async fn handle_recipe_command(config: &Config, action: RecipeAction) -> anyhow::Result<ExitCode> {
    match action {
        RecipeAction::List { tag, format } => recipe_list(config, tag.as_deref(), &format).await,
        RecipeAction::Validate { path } => recipe_validate(config, &path),
        RecipeAction::Run {
            recipe_id,
            params,
            deadline_ms,
        } => recipe_run(config, &recipe_id, &params, deadline_ms.map(Duration::from_millis)).await,
    }
}

async fn recipe_list(config: &Config, tag: Option<&str>, format: &str) -> anyhow::Result<ExitCode> {
    let registry = RecipeRegistry::from_config(&config.recipes);
    registry.reload().await;

    let recipes: Vec<_> = registry
        .list()
        .await
        .into_iter()
        .filter(|r| tag.is_none_or(|t| r.tags.iter().any(|rt| rt == t)))
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&recipes)?),
        "table" => {
            if recipes.is_empty() {
                println!("No recipes found.");
                for (source, dir) in registry.sources() {
                    println!("  searched {}: {}", source, dir.display());
                }
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<32} {:<9} {:<8} {:<8} DESCRIPTION", "ID", "TYPE", "VERSION", "SOURCE");
            for r in &recipes {
                let source = r.source.map(|s| s.to_string()).unwrap_or_default();
                println!(
                    "{:<32} {:<9} {:<8} {:<8} {}",
                    r.id,
                    r.kind.to_string(),
                    r.version,
                    source,
                    r.description
                );
            }
        }
        other => bail!("unknown format '{}' (expected table or json)", other),
    }
    Ok(ExitCode::SUCCESS)
}

fn recipe_validate(config: &Config, path: &Path) -> anyhow::Result<ExitCode> {
    let recipe = RecipeLoader::new()
        .load_path(path)
        .with_context(|| format!("failed to load recipe {}", path.display()))?;
    let validator = RecipeValidator::from_registry(&CommandRegistry::standard(&config.commands));
    let report = validator.validate(&recipe);

    println!("{} v{}", recipe.id, recipe.version);
    for outcome in &report.rules {
        let mark = if outcome.passed { "ok" } else { "FAIL" };
        println!("  [{:<4}] {}", mark, outcome.rule);
        for problem in &outcome.problems {
            println!("         {}", problem);
        }
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn recipe_run(
    config: &Config,
    recipe_id: &str,
    params: &str,
    deadline: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    let params: Map<String, Value> =
        serde_json::from_str(params).context("--params must be a JSON object")?;

    let registry = RecipeRegistry::from_config(&config.recipes);
    registry.reload().await;
    let recipe = registry.get(recipe_id).await?;

    let commands = Arc::new(CommandRegistry::standard(&config.commands));
    let contexts = Arc::new(ContextManager::open(&config.workspace.root).await?);
    let engine = RecipeEngine::new(commands).with_context_manager(contexts);

    // Fail on bad parameters before touching the browser.
    engine.prepare(&recipe, params.clone())?;

    let session = Session::connect(config.browser.clone()).await?;
    info!(recipe_id, target = %session.target_url(), "Running recipe");
    let run = engine.run(&session, &recipe, params, deadline).await;
    session.close().await;
    let run = run?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    Ok(if run.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
