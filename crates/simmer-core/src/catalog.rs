//! Read-only recipe and item catalogs loaded from JSON.
//!
//! File shapes are `{ "recipes": [...] }` and `{ "items": [...] }`. Recipes
//! are validated on load so that the session engine can rely on unique
//! names, positive durations, and non-empty ingredient ids.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use simmer_types::{ItemId, ItemInfo, Recipe};

/// Errors that can occur when loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the catalog file.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// The file being read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog is not valid JSON of the expected shape.
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A recipe breaks a catalog rule.
    #[error("invalid recipe {recipe:?}: {reason}")]
    InvalidRecipe {
        /// Name of the offending recipe (may be empty).
        recipe: String,
        /// What is wrong.
        reason: String,
    },

    /// The catalog load task did not finish.
    #[error("catalog load aborted: {0}")]
    Aborted(String),
}

#[derive(Deserialize)]
struct RecipeFile {
    #[serde(default)]
    recipes: Vec<Recipe>,
}

#[derive(Deserialize)]
struct ItemFile {
    #[serde(default)]
    items: Vec<ItemInfo>,
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Ordered, validated list of recipes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    /// Build a catalog, validating every recipe.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRecipe`] for an empty or duplicate
    /// name, a zero duration, an empty result id, or an ingredient with an
    /// empty id or zero amount.
    pub fn new(recipes: Vec<Recipe>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for recipe in &recipes {
            validate_recipe(recipe)?;
            if !seen.insert(recipe.name.as_str()) {
                return Err(invalid(recipe, "duplicate name"));
            }
        }
        Ok(Self { recipes })
    }

    /// Parse a `{ "recipes": [...] }` document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed input, or a validation
    /// error from [`RecipeCatalog::new`].
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: RecipeFile = serde_json::from_str(json)?;
        Self::new(file.recipes)
    }

    /// Read and parse a recipe catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`RecipeCatalog::from_json_str`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json_str(&read_file(path)?)?;
        tracing::info!(path = %path.display(), recipes = catalog.len(), "Loaded recipe catalog");
        Ok(catalog)
    }

    /// Look up a recipe by name.
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// The recipe at `index`, clamped into range. `None` only when empty.
    pub fn select(&self, index: usize) -> Option<&Recipe> {
        let last = self.recipes.len().checked_sub(1)?;
        self.recipes.get(index.min(last))
    }

    /// All recipes in catalog order.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Iterate recipes in catalog order.
    pub fn iter(&self) -> core::slice::Iter<'_, Recipe> {
        self.recipes.iter()
    }

    /// Number of recipes.
    pub const fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the catalog has no recipes.
    pub const fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecipeCatalog {
    type Item = &'a Recipe;
    type IntoIter = core::slice::Iter<'a, Recipe>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn invalid(recipe: &Recipe, reason: &str) -> CatalogError {
    CatalogError::InvalidRecipe {
        recipe: recipe.name.clone(),
        reason: reason.to_owned(),
    }
}

fn validate_recipe(recipe: &Recipe) -> Result<(), CatalogError> {
    if recipe.name.is_empty() {
        return Err(invalid(recipe, "empty name"));
    }
    if recipe.duration_seconds == 0 {
        return Err(invalid(recipe, "duration must be greater than zero"));
    }
    if recipe.result_id.is_empty() {
        return Err(invalid(recipe, "empty result id"));
    }
    for ingredient in &recipe.ingredients {
        if ingredient.id.is_empty() {
            return Err(invalid(recipe, "ingredient with empty id"));
        }
        if ingredient.amount == 0 {
            return Err(CatalogError::InvalidRecipe {
                recipe: recipe.name.clone(),
                reason: format!("ingredient {} has zero amount", ingredient.id),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Item display metadata keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCatalog {
    items: BTreeMap<ItemId, ItemInfo>,
}

impl ItemCatalog {
    /// Build a catalog. A later entry with the same id replaces an earlier one.
    pub fn new(items: impl IntoIterator<Item = ItemInfo>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|info| (info.id.clone(), info))
                .collect(),
        }
    }

    /// Parse an `{ "items": [...] }` document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: ItemFile = serde_json::from_str(json)?;
        Ok(Self::new(file.items))
    }

    /// Read and parse an item catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`ItemCatalog::from_json_str`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json_str(&read_file(path)?)?;
        tracing::info!(path = %path.display(), items = catalog.len(), "Loaded item catalog");
        Ok(catalog)
    }

    /// Metadata for `id`, if known.
    pub fn get(&self, id: &str) -> Option<&ItemInfo> {
        self.items.get(id)
    }

    /// The item's display name, or the id itself when unknown.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.items.get(id).map_or(id, |info| info.name.as_str())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
