//! Recipe execution.
//!
//! Each run moves `Loaded → Validated → Running → Completed | Failed`.
//! Validation and parameter binding happen before the first protocol call,
//! so a bad recipe or a bad call has no side effects. Steps run strictly in
//! order; the first failing step halts the run and whatever was collected so
//! far is still returned.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
use taskmind_commands::{CommandRegistry, ValueType};
use taskmind_context::{ActionKind, ContextError, ContextManager, ExecutionLogEntry, ExecutionMethod, LogStatus};

use crate::binding::bind_parameters;
use crate::error::RecipeError;
use crate::expr::{STEPS_ROOT, Scope, substitute};
use crate::model::Recipe;
use crate::validator::{RecipeValidator, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Loaded,
    Validated,
    Running,
    Completed,
    Failed,
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub verb: String,
    /// Arguments after substitution.
    pub arguments: Value,
    pub result: CommandResult,
}

/// Outcome of one recipe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRun {
    pub recipe_id: String,
    pub version: String,
    pub state: RunState,
    /// Every state the run passed through, ending with `state`.
    pub states: Vec<RunState>,
    pub parameters: Map<String, Value>,
    pub trace: Vec<StepRecord>,
    /// Declared outputs, or the last step's payload when none are declared.
    /// Partial when the run failed.
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandFailure>,
    /// Output that did not match the declared schema.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parity_warnings: Vec<String>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl RecipeRun {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}

fn as_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Runs recipes against the command registry.
///
/// Holds no per-run state; one engine can serve any number of runs.
pub struct RecipeEngine {
    commands: Arc<CommandRegistry>,
    validator: RecipeValidator,
    contexts: Option<Arc<ContextManager>>,
}

impl RecipeEngine {
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        let validator = RecipeValidator::from_registry(&commands);
        Self {
            commands,
            validator,
            contexts: None,
        }
    }

    /// Journal every step to the active run context, when there is one.
    pub fn with_context_manager(mut self, contexts: Arc<ContextManager>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn validate(&self, recipe: &Recipe) -> ValidationReport {
        self.validator.validate(recipe)
    }

    /// Validate `recipe` and bind `params` without running anything.
    pub fn prepare(&self, recipe: &Recipe, params: Map<String, Value>) -> Result<Map<String, Value>, RecipeError> {
        let report = self.validate(recipe);
        if !report.passed() {
            return Err(RecipeError::ValidationFailed {
                id: recipe.id.clone(),
                failures: report.failures(),
            });
        }
        Ok(bind_parameters(recipe, params)?)
    }

    /// Run `recipe` to completion or first failure.
    ///
    /// `deadline` bounds the whole run; a step still executing when it
    /// passes fails with [`ErrorKind::Timeout`].
    pub async fn run(
        &self,
        invoker: &dyn Invoker,
        recipe: &Recipe,
        params: Map<String, Value>,
        deadline: Option<Duration>,
    ) -> Result<RecipeRun, RecipeError> {
        let started = Instant::now();
        let mut states = vec![RunState::Loaded];
        let parameters = self.prepare(recipe, params)?;
        let deadline_at = deadline.map(|d| started + d);

        transition(recipe, &mut states, RunState::Validated);
        transition(recipe, &mut states, RunState::Running);
        info!(recipe = %recipe.id, version = %recipe.version, steps = recipe.steps.len(), "Running recipe");

        let mut scope = Scope::new(parameters.clone());
        let mut trace = Vec::with_capacity(recipe.steps.len());
        let mut failure: Option<(usize, CommandFailure)> = None;

        for (index, step) in recipe.steps.iter().enumerate() {
            let name = step.label(index);
            let verb = step.capability().unwrap_or_default().to_string();
            let step_started = Instant::now();

            let (arguments, result) = match substitute(&step.arguments(), &scope) {
                Ok(arguments) => {
                    let result = self
                        .execute_step(invoker, &verb, arguments.clone(), deadline_at, deadline)
                        .await;
                    (arguments, result)
                }
                Err(e) => (
                    step.arguments(),
                    CommandResult::failed(
                        ErrorKind::InvalidArgument,
                        format!("step '{}': {}", name, e),
                        step_started.elapsed(),
                    ),
                ),
            };

            debug!(recipe = %recipe.id, step = %name, verb = %verb, success = result.success, "Recipe step finished");
            scope.record_step(&name, &result);
            self.journal(step_entry(recipe, &name, &verb, &result)).await;

            let failed = result.error.clone().filter(|_| !result.success);
            trace.push(StepRecord {
                index,
                name,
                verb,
                arguments,
                result,
            });
            if let Some(error) = failed {
                failure = Some((index, error));
                break;
            }
        }

        let state = if failure.is_some() {
            RunState::Failed
        } else {
            RunState::Completed
        };
        transition(recipe, &mut states, state);

        let last = trace.last().map(|r| r.name.as_str());
        let (output, parity_warnings) = capture_output(recipe, &scope, last, state == RunState::Completed);
        for warning in &parity_warnings {
            warn!(recipe = %recipe.id, "Output parity: {}", warning);
        }

        let (failed_step, error) = match failure {
            Some((index, error)) => (Some(index), Some(error)),
            None => (None, None),
        };
        let run = RecipeRun {
            recipe_id: recipe.id.clone(),
            version: recipe.version.clone(),
            state,
            states,
            parameters,
            trace,
            output,
            failed_step,
            error,
            parity_warnings,
            duration: started.elapsed(),
        };

        match (&run.failed_step, &run.error) {
            (Some(index), Some(error)) => warn!(
                recipe = %recipe.id,
                step = index,
                kind = %error.kind,
                "Recipe failed: {}",
                error.detail
            ),
            _ => info!(recipe = %recipe.id, elapsed_ms = run.duration.as_millis() as u64, "Recipe completed"),
        }
        self.journal(summary_entry(&run)).await;
        Ok(run)
    }

    async fn execute_step(
        &self,
        invoker: &dyn Invoker,
        verb: &str,
        arguments: Value,
        deadline_at: Option<Instant>,
        deadline: Option<Duration>,
    ) -> CommandResult {
        let started = Instant::now();
        let Some(at) = deadline_at else {
            return self.commands.execute(invoker, verb, arguments).await;
        };
        let exceeded = || {
            CommandResult::failed(
                ErrorKind::Timeout,
                format!("recipe deadline of {:?} exceeded", deadline.unwrap_or_default()),
                started.elapsed(),
            )
        };
        if Instant::now() >= at {
            return exceeded();
        }
        match tokio::time::timeout_at(at, self.commands.execute(invoker, verb, arguments)).await {
            Ok(result) => result,
            Err(_) => exceeded(),
        }
    }

    async fn journal(&self, entry: ExecutionLogEntry) {
        let Some(contexts) = &self.contexts else {
            return;
        };
        match contexts.log(entry).await {
            Ok(()) | Err(ContextError::NoActiveContext) => {}
            Err(e) => warn!("Failed to journal recipe step: {}", e),
        }
    }
}

fn transition(recipe: &Recipe, states: &mut Vec<RunState>, to: RunState) {
    debug!(recipe = %recipe.id, from = ?states.last(), ?to, "Recipe state change");
    states.push(to);
}

/// Assemble declared outputs from the run scope.
///
/// Missing or mistyped outputs become parity warnings; the value is still
/// returned when present. Missing outputs of a failed run are expected and
/// not reported.
fn capture_output(recipe: &Recipe, scope: &Scope, last: Option<&str>, complete: bool) -> (Value, Vec<String>) {
    let mut warnings = Vec::new();

    if recipe.outputs.is_empty() {
        let payload = last
            .and_then(|name| scope.lookup(&format!("{}.{}.payload", STEPS_ROOT, name)))
            .cloned()
            .unwrap_or(Value::Null);
        return (payload, warnings);
    }

    let mut output = Map::new();
    for spec in &recipe.outputs {
        let path = match (&spec.from, last) {
            (Some(from), _) => from.clone(),
            (None, Some(last)) => format!("{}.{}.payload.{}", STEPS_ROOT, last, spec.name),
            (None, None) => continue,
        };
        match scope.lookup(&path) {
            Some(value) => {
                if !spec.ty.matches(value) {
                    warnings.push(format!(
                        "output '{}' declared {}, got {}",
                        spec.name,
                        spec.ty,
                        ValueType::of(value)
                    ));
                }
                output.insert(spec.name.clone(), value.clone());
            }
            None if complete => warnings.push(format!("output '{}' was not produced ({})", spec.name, path)),
            None => {}
        }
    }
    (Value::Object(output), warnings)
}

fn action_for(verb: &str) -> ActionKind {
    match verb {
        "navigate" => ActionKind::Navigation,
        "get_content" | "get_title" | "get_url" | "status" => ActionKind::Extraction,
        "screenshot" => ActionKind::Screenshot,
        "click" | "scroll" | "scroll_to_text" | "zoom" | "wait" => ActionKind::Interaction,
        "highlight" | "pointer" | "spotlight" | "annotate" | "clear_effects" => ActionKind::UserInteraction,
        _ => ActionKind::RecipeExecution,
    }
}

fn status_of(result: &CommandResult) -> LogStatus {
    if result.success {
        LogStatus::Success
    } else {
        LogStatus::Failure
    }
}

fn step_entry(recipe: &Recipe, name: &str, verb: &str, result: &CommandResult) -> ExecutionLogEntry {
    let mut data = json!({
        "recipe": recipe.id,
        "step": name,
        "verb": verb,
        "elapsed_ms": result.elapsed.as_millis() as u64,
    });
    if let Some(error) = &result.error {
        data["error"] = json!(error);
    }
    ExecutionLogEntry::new(format!("{} / {}", recipe.id, name), status_of(result))
        .with_action(action_for(verb))
        .with_method(ExecutionMethod::Recipe)
        .with_data(data)
}

fn summary_entry(run: &RecipeRun) -> ExecutionLogEntry {
    let status = match (run.state, run.parity_warnings.is_empty()) {
        (RunState::Completed, true) => LogStatus::Success,
        (RunState::Completed, false) => LogStatus::Warning,
        _ => LogStatus::Failure,
    };
    let mut entry = ExecutionLogEntry::new(format!("recipe {}", run.recipe_id), status)
        .with_action(ActionKind::RecipeExecution)
        .with_method(ExecutionMethod::Recipe)
        .with_data(json!({
            "recipe": run.recipe_id,
            "version": run.version,
            "state": run.state,
            "steps": run.trace.len(),
            "failed_step": run.failed_step,
            "duration_ms": run.duration.as_millis() as u64,
        }));
    for warning in &run.parity_warnings {
        entry = entry.with_insight("parity", warning);
    }
    entry
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
