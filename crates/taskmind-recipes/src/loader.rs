//! Filesystem recipe loader.
//!
//! A recipe lives in its own directory as `recipe.md` (YAML front matter)
//! or `recipe.yaml`, next to any script files its steps reference. Source
//! directories may group recipes one or two levels deep, e.g.
//! `atomic/chrome/page-title/recipe.md`.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::RecipeError;
use crate::model::{Recipe, RecipeSource};
use crate::parser::{parse_recipe_markdown, parse_recipe_yaml};

const DEFINITION_FILES: [&str; 3] = ["recipe.md", "recipe.yaml", "recipe.yml"];

#[derive(Debug, Clone)]
pub struct RecipeLoader {
    /// Maximum directory depth searched for definition files.
    max_depth: usize,
}

impl RecipeLoader {
    pub fn new() -> Self {
        Self { max_depth: 4 }
    }

    /// Load one recipe from a definition file or a recipe directory.
    pub fn load_path(&self, path: &Path) -> Result<Recipe, RecipeError> {
        let file = if path.is_dir() {
            DEFINITION_FILES
                .iter()
                .map(|name| path.join(name))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| RecipeError::NotFound(format!("no recipe definition in {}", path.display())))?
        } else if path.is_file() {
            path.to_path_buf()
        } else {
            return Err(RecipeError::NotFound(path.display().to_string()));
        };

        let content = std::fs::read_to_string(&file)?;
        let base_dir = file.parent();
        let mut recipe = match file.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => parse_recipe_markdown(&content, base_dir)?,
            Some("yaml") | Some("yml") => parse_recipe_yaml(&content, base_dir)?,
            _ => {
                return Err(RecipeError::malformed(
                    file.display().to_string(),
                    "expected a .md or .yaml definition",
                ));
            }
        };
        recipe.path = Some(file);
        Ok(recipe)
    }

    /// Load every recipe under `dir`, tagging each with `source`, in path
    /// order.
    ///
    /// Definitions that fail to load are logged and skipped.
    pub fn load_dir(&self, dir: &Path, source: RecipeSource) -> Vec<Recipe> {
        let mut recipes = Vec::new();
        if !dir.exists() {
            debug!("Recipe directory does not exist: {}", dir.display());
            return recipes;
        }

        for entry in WalkDir::new(dir)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_definition = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| DEFINITION_FILES.contains(&n));
            if !is_definition {
                continue;
            }
            // recipe.md wins over a recipe.yaml in the same directory.
            if let Some(parent) = path.parent() {
                let preferred = DEFINITION_FILES.iter().map(|n| parent.join(n)).find(|c| c.is_file());
                if preferred.as_deref() != Some(path) {
                    continue;
                }
            }

            match self.load_path(path) {
                Ok(mut recipe) => {
                    recipe.source = Some(source);
                    debug!("Loaded recipe: {} ({})", recipe.id, source);
                    recipes.push(recipe);
                }
                Err(e) => warn!("Failed to load recipe from {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} recipes from {}", recipes.len(), dir.display());
        recipes
    }
}

impl Default for RecipeLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_dir_finds_nested_recipes() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "atomic/chrome/title/recipe.md", "---\nid: title\nversion: 1.0.0\n---\n");
        write(temp_dir.path(), "workflows/digest/recipe.yaml", "id: digest\ntype: workflow\n");
        write(temp_dir.path(), "notes/README.md", "# not a recipe");

        let loader = RecipeLoader::new();
        let mut recipes = loader.load_dir(temp_dir.path(), RecipeSource::User);
        recipes.sort_by(|a, b| a.id.cmp(&b.id));

        let ids: Vec<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["digest", "title"]);
        assert!(recipes.iter().all(|r| r.source == Some(RecipeSource::User)));
        assert!(recipes[1].path.as_ref().unwrap().ends_with("title/recipe.md"));
    }

    #[test]
    fn test_load_dir_skips_broken_definitions() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "good/recipe.yaml", "id: good\n");
        write(temp_dir.path(), "bad/recipe.yaml", "id: [unterminated\n");

        let recipes = RecipeLoader::new().load_dir(temp_dir.path(), RecipeSource::Project);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "good");
    }

    #[test]
    fn test_markdown_preferred_over_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "dup/recipe.md", "---\nid: from-md\n---\n");
        write(temp_dir.path(), "dup/recipe.yaml", "id: from-yaml\n");

        let recipes = RecipeLoader::new().load_dir(temp_dir.path(), RecipeSource::User);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "from-md");
    }

    #[test]
    fn test_load_path_errors() {
        let temp_dir = TempDir::new().unwrap();
        let loader = RecipeLoader::new();

        assert!(matches!(
            loader.load_path(&temp_dir.path().join("missing")),
            Err(RecipeError::NotFound(_))
        ));
        assert!(matches!(loader.load_path(temp_dir.path()), Err(RecipeError::NotFound(_))));

        write(temp_dir.path(), "x/recipe.txt", "id: x");
        assert!(matches!(
            loader.load_path(&temp_dir.path().join("x/recipe.txt")),
            Err(RecipeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let recipes = RecipeLoader::new().load_dir(Path::new("/nonexistent/recipes"), RecipeSource::Example);
        assert!(recipes.is_empty());
    }
}
