//! Recipe catalog and cookability matching.

mod cache;
mod matcher;

pub use cache::{
    canonical_inventory, inventory_fingerprint, SuggestionCache, DEFAULT_SUGGESTION_TTL,
};
pub use matcher::{
    find_matching_recipes, find_matching_recipes_by_category, match_ingredient, rank_recipes,
    MatchOptions, RecipeMatch, RecipeSuggestion, DEFAULT_INGREDIENT_THRESHOLD,
    DEFAULT_MIN_MATCH_PERCENTAGE, DEFAULT_MIN_MATCH_PERCENTAGE_BY_CATEGORY,
};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RecipeError;

/// A recipe as stored in the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Ingredient names as written by the recipe source.
    pub ingredients: Vec<String>,
    /// Canonical-vocabulary spelling of `ingredients`, position for position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients_normalized: Option<Vec<String>>,
    /// Fewest matched ingredients for the recipe to count as cookable.
    #[serde(default)]
    pub min_ingredients: usize,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl Recipe {
    pub fn new<I, S>(id: impl Into<String>, ingredients: I, min_ingredients: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            ingredients_normalized: None,
            min_ingredients,
            instructions: Vec::new(),
        }
    }

    /// The list to match against inventory: the normalized spellings when
    /// they line up with `ingredients`, else the originals.
    pub fn matching_terms(&self) -> &[String] {
        match &self.ingredients_normalized {
            Some(normalized) if normalized.len() == self.ingredients.len() => normalized,
            Some(normalized) => {
                tracing::debug!(
                    recipe = %self.id,
                    ingredients = self.ingredients.len(),
                    normalized = normalized.len(),
                    "Normalized ingredient list length mismatch, using originals"
                );
                &self.ingredients
            }
            None => &self.ingredients,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecipesFile {
    #[serde(default)]
    recipes: Vec<Recipe>,
}

/// The set of candidate recipes.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Parse `{"recipes": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, RecipeError> {
        let file: RecipesFile = serde_json::from_str(json)?;
        Ok(Self::new(file.recipes))
    }

    /// Load the catalog file. A missing file is an empty catalog.
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Recipe catalog not found, no recipes available");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let book = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), recipes = book.len(), "Recipe catalog loaded");
        Ok(book)
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
