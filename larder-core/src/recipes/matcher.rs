//! Scores recipes against a set of inventory terms.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Recipe;
use crate::levenshtein::similarity;
use crate::vocabulary::Vocabulary;

/// Minimum similarity for a recipe ingredient to count as in stock.
pub const DEFAULT_INGREDIENT_THRESHOLD: f64 = 0.7;

/// Minimum share of a recipe's ingredients that must be in stock.
pub const DEFAULT_MIN_MATCH_PERCENTAGE: f64 = 0.75;

/// Looser share used when category overlap is also required.
pub const DEFAULT_MIN_MATCH_PERCENTAGE_BY_CATEGORY: f64 = 0.3;

/// Knobs for [`rank_recipes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub ingredient_threshold: f64,
    pub min_match_percentage: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            ingredient_threshold: DEFAULT_INGREDIENT_THRESHOLD,
            min_match_percentage: DEFAULT_MIN_MATCH_PERCENTAGE,
        }
    }
}

/// How well the inventory covers one recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMatch {
    pub recipe_id: String,
    /// Inventory terms that covered at least one ingredient, first use first.
    pub matched_ingredients: Vec<String>,
    /// Recipe ingredients (as written) nothing in stock covered.
    pub missing_ingredients: Vec<String>,
    /// Matched ingredient count over total ingredient count, in [0, 1].
    pub match_percentage: f64,
}

/// A cookable recipe as presented to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSuggestion {
    pub recipe_id: String,
    pub name: String,
    /// Whole percent, 0 to 100.
    pub match_percentage: u8,
    pub matched_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl RecipeSuggestion {
    pub fn new(recipe: &Recipe, matched: RecipeMatch) -> Self {
        Self {
            recipe_id: matched.recipe_id,
            name: recipe.name.clone(),
            match_percentage: (matched.match_percentage * 100.0).round().clamp(0.0, 100.0) as u8,
            matched_ingredients: matched.matched_ingredients,
            missing_ingredients: matched.missing_ingredients,
            instructions: recipe.instructions.clone(),
        }
    }
}

/// Find the inventory term most similar to `ingredient`.
///
/// No cleaning or case folding is applied; callers pass normalized terms.
/// Returns `None` when the best score is below `threshold`. On equal
/// scores the earlier term wins.
pub fn match_ingredient<'a, S: AsRef<str>>(
    ingredient: &str,
    inventory_terms: &'a [S],
    threshold: f64,
) -> Option<&'a str> {
    let mut best: Option<(&'a str, f64)> = None;

    for term in inventory_terms {
        let term = term.as_ref();
        let score = similarity(ingredient, term);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((term, score)),
        }
    }

    best.filter(|(_, score)| *score >= threshold)
        .map(|(term, _)| term)
}

/// Recipes the inventory covers well enough, best coverage first.
pub fn find_matching_recipes<S: AsRef<str>>(
    recipes: &[Recipe],
    inventory_terms: &[S],
    min_match_percentage: f64,
) -> Vec<RecipeMatch> {
    let options = MatchOptions {
        min_match_percentage,
        ..MatchOptions::default()
    };
    rank_recipes(recipes, inventory_terms, &options)
        .into_iter()
        .map(|(_, matched)| matched)
        .collect()
}

/// Like [`find_matching_recipes`], but a recipe also needs an ingredient
/// from one of the inventory's categories.
///
/// Ingredient categories come from the vocabulary (canonical name or
/// synonym), comparing the localized category where one exists and the
/// raw category otherwise, case-insensitively.
pub fn find_matching_recipes_by_category<S: AsRef<str>, C: AsRef<str>>(
    recipes: &[Recipe],
    inventory_terms: &[S],
    inventory_categories: &[C],
    vocabulary: &Vocabulary,
    min_match_percentage: f64,
) -> Vec<RecipeMatch> {
    let categories: HashSet<String> = inventory_categories
        .iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();

    let options = MatchOptions {
        min_match_percentage,
        ..MatchOptions::default()
    };

    rank_recipes(recipes, inventory_terms, &options)
        .into_iter()
        .filter(|(recipe, _)| {
            recipe.matching_terms().iter().any(|ingredient| {
                vocabulary
                    .lookup(&ingredient.trim().to_lowercase())
                    .is_some_and(|entry| {
                        categories.contains(&entry.preferred_category().to_lowercase())
                    })
            })
        })
        .map(|(_, matched)| matched)
        .collect()
}

/// Score every recipe and keep the cookable ones, paired with the recipe.
///
/// A recipe is kept when at least `min_ingredients` of its ingredients are
/// in stock and the in-stock share reaches `options.min_match_percentage`.
/// The result is sorted by share, descending; equal shares keep catalog
/// order.
pub fn rank_recipes<'r, S: AsRef<str>>(
    recipes: &'r [Recipe],
    inventory_terms: &[S],
    options: &MatchOptions,
) -> Vec<(&'r Recipe, RecipeMatch)> {
    let mut matches: Vec<(&Recipe, RecipeMatch)> = recipes
        .iter()
        .filter_map(|recipe| {
            let (matched, count) = score_recipe(recipe, inventory_terms, options.ingredient_threshold);
            let cookable = count >= recipe.min_ingredients
                && matched.match_percentage >= options.min_match_percentage;
            cookable.then_some((recipe, matched))
        })
        .collect();

    matches.sort_by(|(_, a), (_, b)| b.match_percentage.total_cmp(&a.match_percentage));

    tracing::debug!(
        recipes = recipes.len(),
        inventory = inventory_terms.len(),
        cookable = matches.len(),
        "Ranked recipes"
    );

    matches
}

/// The match for one recipe plus how many of its ingredients were covered.
fn score_recipe<S: AsRef<str>>(
    recipe: &Recipe,
    inventory_terms: &[S],
    threshold: f64,
) -> (RecipeMatch, usize) {
    let mut matched_terms: Vec<String> = Vec::new();
    let mut missing = Vec::new();
    let mut count = 0;

    for (ingredient, original) in recipe.matching_terms().iter().zip(&recipe.ingredients) {
        match match_ingredient(ingredient, inventory_terms, threshold) {
            Some(term) => {
                count += 1;
                if !matched_terms.iter().any(|t| t == term) {
                    matched_terms.push(term.to_string());
                }
            }
            None => missing.push(original.clone()),
        }
    }

    let total = recipe.ingredients.len();
    let match_percentage = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    };

    let matched = RecipeMatch {
        recipe_id: recipe.id.clone(),
        matched_ingredients: matched_terms,
        missing_ingredients: missing,
        match_percentage,
    };
    (matched, count)
}
