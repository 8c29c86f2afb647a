//! Structural recipe validation.
//!
//! Runs without a browser: everything is checked against the recipe text
//! and the static capability registry.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use taskmind_commands::{CapabilityDescriptor, CommandRegistry, ValueType};

use crate::expr::{INPUTS_ROOT, STEPS_ROOT, references};
use crate::model::{Recipe, RecipeKind};

/// One structural rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// `id` and `version` are present.
    Identity,
    /// Input names are non-empty and unique.
    UniqueInputs,
    /// Declared defaults conform to their input types.
    DefaultTypes,
    /// At least one step.
    StepsPresent,
    /// Atomic recipes have exactly one step.
    AtomicSingleStep,
    /// Each step names a verb or a script, not both, under a unique name.
    StepShape,
    /// Script steps only in runtimes that execute in the page.
    Runtime,
    /// Every step calls a registered capability.
    CapabilitiesKnown,
    /// Step arguments fit the capability's declared parameters.
    Arguments,
    /// References name declared inputs or earlier steps.
    References,
    /// Output names are unique and their sources resolvable.
    Outputs,
}

impl Rule {
    pub const ALL: [Rule; 11] = [
        Rule::Identity,
        Rule::UniqueInputs,
        Rule::DefaultTypes,
        Rule::StepsPresent,
        Rule::AtomicSingleStep,
        Rule::StepShape,
        Rule::Runtime,
        Rule::CapabilitiesKnown,
        Rule::Arguments,
        Rule::References,
        Rule::Outputs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Identity => "identity",
            Rule::UniqueInputs => "unique_inputs",
            Rule::DefaultTypes => "default_types",
            Rule::StepsPresent => "steps_present",
            Rule::AtomicSingleStep => "atomic_single_step",
            Rule::StepShape => "step_shape",
            Rule::Runtime => "runtime",
            Rule::CapabilitiesKnown => "capabilities_known",
            Rule::Arguments => "arguments",
            Rule::References => "references",
            Rule::Outputs => "outputs",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule: Rule,
    pub passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

/// Pass/fail per rule for one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub recipe_id: String,
    pub rules: Vec<RuleOutcome>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.rules.iter().all(|r| r.passed)
    }

    pub fn outcome(&self, rule: Rule) -> Option<&RuleOutcome> {
        self.rules.iter().find(|r| r.rule == rule)
    }

    /// `rule: problem` lines for every failed rule.
    pub fn failures(&self) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|r| r.problems.iter().map(move |p| format!("{}: {}", r.rule, p)))
            .collect()
    }
}

/// Validates recipes against a fixed capability list.
#[derive(Debug, Clone)]
pub struct RecipeValidator {
    capabilities: HashMap<String, CapabilityDescriptor>,
}

impl RecipeValidator {
    pub fn new(descriptors: impl IntoIterator<Item = CapabilityDescriptor>) -> Self {
        Self {
            capabilities: descriptors.into_iter().map(|d| (d.verb.clone(), d)).collect(),
        }
    }

    pub fn from_registry(registry: &CommandRegistry) -> Self {
        Self::new(registry.descriptors())
    }

    pub fn validate(&self, recipe: &Recipe) -> ValidationReport {
        let rules = Rule::ALL
            .iter()
            .map(|&rule| {
                let problems = self.check(rule, recipe);
                RuleOutcome {
                    rule,
                    passed: problems.is_empty(),
                    problems,
                }
            })
            .collect();
        ValidationReport {
            recipe_id: recipe.id.clone(),
            rules,
        }
    }

    fn check(&self, rule: Rule, recipe: &Recipe) -> Vec<String> {
        match rule {
            Rule::Identity => check_identity(recipe),
            Rule::UniqueInputs => check_unique_inputs(recipe),
            Rule::DefaultTypes => check_default_types(recipe),
            Rule::StepsPresent if recipe.steps.is_empty() => vec!["recipe has no steps".to_string()],
            Rule::StepsPresent => Vec::new(),
            Rule::AtomicSingleStep => check_atomic(recipe),
            Rule::StepShape => check_step_shape(recipe),
            Rule::Runtime => check_runtime(recipe),
            Rule::CapabilitiesKnown => self.check_capabilities(recipe),
            Rule::Arguments => self.check_arguments(recipe),
            Rule::References => check_references(recipe),
            Rule::Outputs => check_outputs(recipe),
        }
    }

    fn check_capabilities(&self, recipe: &Recipe) -> Vec<String> {
        recipe
            .steps
            .iter()
            .enumerate()
            .filter_map(|(i, step)| {
                let verb = step.capability()?;
                (!self.capabilities.contains_key(verb))
                    .then(|| format!("step '{}' calls unknown capability '{}'", step.label(i), verb))
            })
            .collect()
    }

    fn check_arguments(&self, recipe: &Recipe) -> Vec<String> {
        let mut problems = Vec::new();
        for (i, step) in recipe.steps.iter().enumerate() {
            let Some(descriptor) = step.capability().and_then(|v| self.capabilities.get(v)) else {
                continue;
            };
            let label = step.label(i);
            let args = step.arguments();
            let Some(args) = args.as_object() else {
                continue;
            };

            for name in descriptor.required_names() {
                if !args.contains_key(name) {
                    problems.push(format!("step '{}' is missing required argument '{}'", label, name));
                }
            }
            for (name, value) in args {
                let Some(param) = descriptor.param(name) else {
                    problems.push(format!(
                        "step '{}' passes undeclared argument '{}' to '{}'",
                        label, name, descriptor.verb
                    ));
                    continue;
                };
                // Substituted values are only known at run time.
                let substituted = references(value).map(|r| !r.is_empty()).unwrap_or(true);
                if !substituted && !param.ty.matches(value) {
                    problems.push(format!(
                        "step '{}' argument '{}' expects {}, got {}",
                        label,
                        name,
                        param.ty,
                        ValueType::of(value)
                    ));
                }
            }
        }
        problems
    }
}

fn check_identity(recipe: &Recipe) -> Vec<String> {
    let mut problems = Vec::new();
    if recipe.id.trim().is_empty() {
        problems.push("id is empty".to_string());
    }
    if recipe.version.trim().is_empty() {
        problems.push("version is empty".to_string());
    }
    problems
}

fn check_unique_inputs(recipe: &Recipe) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut problems = Vec::new();
    for input in &recipe.inputs {
        if input.name.trim().is_empty() {
            problems.push("input with empty name".to_string());
        } else if !seen.insert(input.name.as_str()) {
            problems.push(format!("duplicate input '{}'", input.name));
        }
    }
    problems
}

fn check_default_types(recipe: &Recipe) -> Vec<String> {
    recipe
        .inputs
        .iter()
        .filter_map(|input| {
            let default = input.default.as_ref()?;
            (!input.ty.matches(default)).then(|| {
                format!(
                    "default for '{}' is {}, declared {}",
                    input.name,
                    ValueType::of(default),
                    input.ty
                )
            })
        })
        .collect()
}

fn check_atomic(recipe: &Recipe) -> Vec<String> {
    if recipe.kind == RecipeKind::Atomic && recipe.steps.len() > 1 {
        vec![format!("atomic recipe has {} steps", recipe.steps.len())]
    } else {
        Vec::new()
    }
}

fn check_step_shape(recipe: &Recipe) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut problems = Vec::new();
    for (i, step) in recipe.steps.iter().enumerate() {
        let label = step.label(i);
        match (&step.verb, &step.script) {
            (Some(_), Some(_)) => problems.push(format!("step '{}' has both verb and script", label)),
            (None, None) => problems.push(format!("step '{}' has neither verb nor script", label)),
            (None, Some(_)) if !step.with.is_empty() => {
                problems.push(format!("script step '{}' cannot take arguments", label))
            }
            _ => {}
        }
        if !seen.insert(label.clone()) {
            problems.push(format!("duplicate step name '{}'", label));
        }
    }
    problems
}

fn check_runtime(recipe: &Recipe) -> Vec<String> {
    if recipe.runtime.runs_in_page() {
        return Vec::new();
    }
    recipe
        .steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.script.is_some())
        .map(|(i, step)| {
            format!(
                "script step '{}' cannot run in the page with runtime {:?}",
                step.label(i),
                recipe.runtime
            )
        })
        .collect()
}

/// Problem with `path` given the steps before `position`, if any.
fn reference_problem(recipe: &Recipe, path: &str, position: usize) -> Option<String> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let name = segments.next()?;
    match root {
        INPUTS_ROOT if recipe.input(name).is_none() => Some(format!("'{}' names an undeclared input", path)),
        STEPS_ROOT => {
            let index = recipe.steps.iter().enumerate().position(|(i, s)| s.label(i) == name);
            match index {
                Some(i) if i < position => None,
                Some(_) => Some(format!("'{}' refers to a step that has not run yet", path)),
                None => Some(format!("'{}' names an unknown step", path)),
            }
        }
        _ => None,
    }
}

fn check_references(recipe: &Recipe) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, step) in recipe.steps.iter().enumerate() {
        // Script bodies are page code, not templates.
        if step.script.is_some() {
            continue;
        }
        match references(&step.arguments()) {
            Ok(paths) => problems.extend(
                paths
                    .iter()
                    .filter_map(|p| reference_problem(recipe, p, i))
                    .map(|p| format!("step '{}': {}", step.label(i), p)),
            ),
            Err(e) => problems.push(format!("step '{}': {}", step.label(i), e)),
        }
    }
    problems
}

fn check_outputs(recipe: &Recipe) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut problems = Vec::new();
    for output in &recipe.outputs {
        if !seen.insert(output.name.as_str()) {
            problems.push(format!("duplicate output '{}'", output.name));
        }
        if let Some(from) = &output.from {
            let template = serde_json::Value::String(format!("${{{}}}", from));
            match references(&template) {
                Ok(_) => {
                    if let Some(p) = reference_problem(recipe, from, recipe.steps.len()) {
                        problems.push(format!("output '{}': {}", output.name, p));
                    }
                }
                Err(e) => problems.push(format!("output '{}': {}", output.name, e)),
            }
        }
    }
    problems
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
