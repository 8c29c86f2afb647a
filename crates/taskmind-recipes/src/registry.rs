//! Recipe registry over prioritized source directories.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use taskmind_config::RecipesConfig;

use crate::error::RecipeError;
use crate::loader::RecipeLoader;
use crate::model::{Recipe, RecipeSource, RecipeSummary};

/// Recipes by id, merged from every configured source.
///
/// On an id collision the higher-priority source wins
/// (`Example < User < Project`). Ids are unique within a source: a
/// duplicate is skipped and the first definition in path order is kept.
pub struct RecipeRegistry {
    sources: Vec<(RecipeSource, PathBuf)>,
    loader: RecipeLoader,
    recipes: RwLock<HashMap<String, Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            loader: RecipeLoader::new(),
            recipes: RwLock::new(HashMap::new()),
        }
    }

    /// Add a source directory.
    pub fn with_source(mut self, source: RecipeSource, dir: impl Into<PathBuf>) -> Self {
        self.sources.push((source, dir.into()));
        self.sources.sort_by_key(|(source, _)| *source);
        self
    }

    pub fn from_config(config: &RecipesConfig) -> Self {
        let mut registry = Self::new().with_source(RecipeSource::User, &config.user_dir);
        if let Some(dir) = &config.example_dir {
            registry = registry.with_source(RecipeSource::Example, dir);
        }
        if let Some(dir) = &config.project_dir {
            registry = registry.with_source(RecipeSource::Project, dir);
        }
        registry
    }

    pub fn sources(&self) -> impl Iterator<Item = (RecipeSource, &Path)> {
        self.sources.iter().map(|(s, p)| (*s, p.as_path()))
    }

    /// Rescan every source, replacing the current contents. Returns the
    /// number of recipes now registered.
    pub async fn reload(&self) -> usize {
        let mut merged: HashMap<String, Recipe> = HashMap::new();
        for (source, dir) in &self.sources {
            let mut seen = HashSet::new();
            for recipe in self.loader.load_dir(dir, *source) {
                if !seen.insert(recipe.id.clone()) {
                    warn!(
                        "Duplicate recipe id '{}' in {} source, ignoring {}",
                        recipe.id,
                        source,
                        display_path(&recipe)
                    );
                    continue;
                }
                if let Some(shadowed) = merged.get(&recipe.id) {
                    debug!(
                        "Recipe '{}' from {} overrides the one from {}",
                        recipe.id,
                        source,
                        shadowed.source.map(|s| s.to_string()).unwrap_or_default()
                    );
                }
                merged.insert(recipe.id.clone(), recipe);
            }
        }

        let count = merged.len();
        *self.recipes.write().await = merged;
        info!("Recipe registry loaded {} recipes", count);
        count
    }

    /// Add or replace one recipe, respecting source priority.
    pub async fn register(&self, recipe: Recipe) {
        let mut recipes = self.recipes.write().await;
        if let Some(existing) = recipes.get(&recipe.id) {
            if existing.source > recipe.source {
                debug!("Keeping higher-priority recipe '{}'", recipe.id);
                return;
            }
        }
        debug!("Registered recipe: {}", recipe.id);
        recipes.insert(recipe.id.clone(), recipe);
    }

    pub async fn get(&self, id: &str) -> Result<Recipe, RecipeError> {
        let recipes = self.recipes.read().await;
        recipes.get(id).cloned().ok_or_else(|| RecipeError::NotFound(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.recipes.read().await.contains_key(id)
    }

    /// Summaries of every recipe, sorted by id.
    pub async fn list(&self) -> Vec<RecipeSummary> {
        let recipes = self.recipes.read().await;
        let mut summaries: Vec<RecipeSummary> = recipes.values().map(Recipe::summary).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.recipes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipes.read().await.is_empty()
    }
}

fn display_path(recipe: &Recipe) -> String {
    recipe
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
