//! `recipe.md` / `recipe.yaml` parser.
//!
//! ```markdown
//! ---
//! id: extract-headlines
//! type: workflow
//! version: 1.2.0
//! runtime: js
//! inputs:
//!   - name: url
//!     type: string
//!     required: true
//! outputs:
//!   - name: headlines
//!     type: array
//!     from: steps.collect.payload.value
//! steps:
//!   - name: open
//!     verb: navigate
//!     with: { url: "${inputs.url}" }
//!   - name: collect
//!     script_file: collect.js
//! ---
//!
//! # Extract headlines
//! ```

use std::path::Path;

use crate::error::RecipeError;
use crate::model::Recipe;

/// Parse a markdown recipe with YAML front matter.
///
/// Relative `script_file` paths resolve against `base_dir`.
pub fn parse_recipe_markdown(content: &str, base_dir: Option<&Path>) -> Result<Recipe, RecipeError> {
    let location = location(base_dir);
    let (frontmatter, body) = extract_frontmatter(content).map_err(|r| RecipeError::malformed(&location, r))?;

    let mut recipe = parse_yaml(&frontmatter, &location)?;
    recipe.body = body;
    if recipe.description.is_empty() {
        recipe.description = first_paragraph(&recipe.body).unwrap_or_default();
    }
    finish(recipe, base_dir, &location)
}

/// Parse a bare YAML recipe.
pub fn parse_recipe_yaml(content: &str, base_dir: Option<&Path>) -> Result<Recipe, RecipeError> {
    let location = location(base_dir);
    let recipe = parse_yaml(content, &location)?;
    finish(recipe, base_dir, &location)
}

fn location(base_dir: Option<&Path>) -> String {
    base_dir
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string())
}

fn parse_yaml(yaml: &str, location: &str) -> Result<Recipe, RecipeError> {
    serde_yml::from_str(yaml).map_err(|e| RecipeError::malformed(location, format!("Failed to parse definition: {}", e)))
}

fn finish(mut recipe: Recipe, base_dir: Option<&Path>, location: &str) -> Result<Recipe, RecipeError> {
    if recipe.id.trim().is_empty() {
        return Err(RecipeError::malformed(location, "id cannot be empty"));
    }
    inline_scripts(&mut recipe, base_dir, location)?;
    Ok(recipe)
}

/// Read `script_file` bodies into `script` for steps that have no inline body.
fn inline_scripts(recipe: &mut Recipe, base_dir: Option<&Path>, location: &str) -> Result<(), RecipeError> {
    for (index, step) in recipe.steps.iter_mut().enumerate() {
        let Some(file) = step.script_file.as_deref() else {
            continue;
        };
        if step.script.is_some() {
            continue;
        }
        let Some(dir) = base_dir else {
            return Err(RecipeError::malformed(
                location,
                format!("step {} references script_file '{}' without a base directory", index + 1, file),
            ));
        };
        let path = dir.join(file);
        let body = std::fs::read_to_string(&path).map_err(|e| {
            RecipeError::malformed(location, format!("step {}: cannot read {}: {}", index + 1, path.display(), e))
        })?;
        step.script = Some(body);
    }
    Ok(())
}

/// Split YAML front matter from the markdown body.
fn extract_frontmatter(content: &str) -> Result<(String, String), String> {
    let content = content.trim();
    if !content.starts_with("---") {
        return Err("recipe.md must start with YAML front matter (---)".to_string());
    }

    let after_first = &content[3..];
    let end_pos = after_first
        .find("\n---")
        .ok_or_else(|| "Missing closing front matter delimiter (---)".to_string())?;

    let frontmatter = after_first[..end_pos].trim().to_string();
    let body = after_first[end_pos + 4..].trim().to_string();
    Ok((frontmatter, body))
}

/// First prose line of the body, skipping headings.
fn first_paragraph(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
