//! Recipes for task-mind.
//!
//! A recipe is a named, versioned automation unit: declared inputs and
//! outputs plus an ordered list of steps, each naming a command verb or an
//! in-page script. This crate loads recipes from disk, validates them against
//! the command capability registry, binds caller parameters and runs them
//! against a live [`Invoker`](taskmind_cdp::Invoker).
//!
//! ```markdown
//! ---
//! id: page-title
//! type: atomic
//! version: 1.0.0
//! inputs:
//!   - name: url
//!     type: string
//!     required: true
//! steps:
//!   - name: open
//!     verb: navigate
//!     with:
//!       url: ${inputs.url}
//! ---
//!
//! # Page title
//! ```

mod binding;
mod engine;
mod error;
mod expr;
mod loader;
mod model;
mod parser;
mod registry;
mod validator;

#[cfg(test)]
mod testing;

pub use binding::bind_parameters;
pub use engine::{RecipeEngine, RecipeRun, RunState, StepRecord};
pub use error::{ParameterError, RecipeError};
pub use expr::{ExprError, Scope, references, substitute};
pub use loader::RecipeLoader;
pub use model::{InputSpec, OutputSpec, Recipe, RecipeKind, RecipeRuntime, RecipeSource, RecipeSummary, Step};
pub use parser::{parse_recipe_markdown, parse_recipe_yaml};
pub use registry::RecipeRegistry;
pub use validator::{RecipeValidator, Rule, RuleOutcome, ValidationReport};
