pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod levenshtein;
pub mod llm;
pub mod normalize;
pub mod recipes;
pub mod vocabulary;

pub use cleaner::clean;
pub use config::{ConfigError, EngineConfig, LlmConfig, ProviderKind};
pub use engine::{BatchRequest, Engine};
pub use error::{EngineError, RecipeError, VocabularyError};
pub use levenshtein::{distance, similarity};
pub use llm::{create_provider, LlmError, LlmProvider};
pub use normalize::{
    normalize_ingredient, normalize_ingredient_offline, FallbackClassifier, LlmFallback, Method,
    NormalizationResult,
};
pub use recipes::{
    canonical_inventory, find_matching_recipes, find_matching_recipes_by_category,
    inventory_fingerprint, match_ingredient, Recipe, RecipeBook, RecipeMatch, RecipeSuggestion,
    SuggestionCache,
};
pub use vocabulary::{
    JsonFileSource, StaticSource, Vocabulary, VocabularyEntry, VocabularySource, VocabularyStore,
};
