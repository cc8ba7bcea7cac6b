//! Recipe matching against the catalog in `fixtures/recipes.json`.

use larder_core::recipes::{
    find_matching_recipes, find_matching_recipes_by_category, Recipe, RecipeBook,
    DEFAULT_MIN_MATCH_PERCENTAGE, DEFAULT_MIN_MATCH_PERCENTAGE_BY_CATEGORY,
};
use larder_core::Vocabulary;
use std::fs;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_book() -> RecipeBook {
    RecipeBook::load(&fixtures_dir().join("recipes.json")).expect("Failed to load recipes fixture")
}

fn load_vocabulary() -> Vocabulary {
    let content = fs::read_to_string(fixtures_dir().join("vocabulary.json"))
        .expect("Failed to read vocabulary fixture");
    Vocabulary::from_json(&content).expect("Failed to parse vocabulary fixture")
}

fn ids(matches: &[larder_core::RecipeMatch]) -> Vec<&str> {
    matches.iter().map(|m| m.recipe_id.as_str()).collect()
}

#[test]
fn test_catalog_loads() {
    let book = load_book();
    assert_eq!(book.len(), 4);
    assert!(book
        .recipes()
        .iter()
        .all(|r| r.matching_terms().len() == r.ingredients.len()));
}

#[test]
fn test_default_threshold_keeps_well_covered_recipes() {
    let book = load_book();
    let inventory = ["tomato", "onion", "rice", "chicken breast"];

    let matches = find_matching_recipes(book.recipes(), &inventory, DEFAULT_MIN_MATCH_PERCENTAGE);

    assert_eq!(ids(&matches), vec!["chicken-rice-bowl"]);
    assert_eq!(matches[0].match_percentage, 0.75);
    assert_eq!(matches[0].missing_ingredients, vec!["Soy Sauce"]);
    assert_eq!(
        matches[0].matched_ingredients,
        vec!["rice", "chicken breast", "onion"]
    );
}

#[test]
fn test_lower_threshold_sorted_by_coverage() {
    let book = load_book();
    let inventory = ["tomato", "onion", "rice", "chicken breast"];

    let matches = find_matching_recipes(book.recipes(), &inventory, 0.5);

    // Salsa covers 2 of 3; the risotto only 2 of 5.
    assert_eq!(ids(&matches), vec!["chicken-rice-bowl", "fresh-salsa"]);
    assert_eq!(matches[1].missing_ingredients, vec!["Salt"]);
}

#[test]
fn test_min_ingredients_gate_applies_before_percentage() {
    let recipes = vec![Recipe::new("salsa", ["tomato", "onion", "salt"], 2)];
    let inventory = ["tomate", "cebolla"];

    assert!(find_matching_recipes(&recipes, &inventory, 0.0).is_empty());
}

#[test]
fn test_empty_inventory_matches_nothing() {
    let book = load_book();
    let inventory: [&str; 0] = [];
    assert!(find_matching_recipes(book.recipes(), &inventory, 0.0).is_empty());
}

#[test]
fn test_by_category() {
    let book = load_book();
    let vocabulary = load_vocabulary();
    let inventory = ["rice", "cheese", "milk"];

    let dairy = find_matching_recipes_by_category(
        book.recipes(),
        &inventory,
        &["Lácteos"],
        &vocabulary,
        DEFAULT_MIN_MATCH_PERCENTAGE_BY_CATEGORY,
    );
    // The risotto reaches 40% but needs 3 ingredients in stock.
    assert_eq!(ids(&dairy), vec!["cheese-omelette"]);

    let grains = find_matching_recipes_by_category(
        book.recipes(),
        &inventory,
        &["granos"],
        &vocabulary,
        DEFAULT_MIN_MATCH_PERCENTAGE_BY_CATEGORY,
    );
    assert!(grains.is_empty());
}
