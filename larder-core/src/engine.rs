//! Entry points tying the vocabulary, cascade and recipe matcher together.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinSet;

use crate::config::{EngineConfig, DEFAULT_BATCH_CONCURRENCY};
use crate::error::{EngineError, VocabularyError};
use crate::llm::create_provider;
use crate::normalize::{normalize_ingredient, FallbackClassifier, LlmFallback, NormalizationResult};
use crate::recipes::{
    canonical_inventory, inventory_fingerprint, rank_recipes, MatchOptions, RecipeBook, RecipeSuggestion,
    SuggestionCache, DEFAULT_SUGGESTION_TTL,
};
use crate::vocabulary::{JsonFileSource, Vocabulary, VocabularyStore};

/// A validated batch request.
///
/// Wire form: `{"ingredients": ["..."], "useLlmFallback": true}`, where
/// `useLlmFallback` is optional and defaults to `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub ingredients: Vec<String>,
    pub use_llm_fallback: bool,
}

impl BatchRequest {
    pub fn from_json(payload: &Value) -> Result<Self, EngineError> {
        let ingredients = payload
            .get("ingredients")
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::InvalidArgument("ingredients must be an array".to_string()))?;

        let ingredients = ingredients
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    EngineError::InvalidArgument(format!("ingredients[{}] must be a string", i))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let use_llm_fallback = match payload.get("useLlmFallback") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(EngineError::InvalidArgument(
                    "useLlmFallback must be a boolean".to_string(),
                ))
            }
        };

        Ok(Self {
            ingredients,
            use_llm_fallback,
        })
    }
}

/// Normalization and recipe suggestion over a shared vocabulary.
#[derive(Debug)]
pub struct Engine {
    store: VocabularyStore,
    fallback: Option<Arc<dyn FallbackClassifier>>,
    recipes: RecipeBook,
    suggestions: SuggestionCache,
    match_options: MatchOptions,
    batch_concurrency: usize,
}

impl Engine {
    /// An engine with no fallback classifier and no recipes.
    pub fn new(store: VocabularyStore) -> Self {
        Self {
            store,
            fallback: None,
            recipes: RecipeBook::default(),
            suggestions: SuggestionCache::new(DEFAULT_SUGGESTION_TTL),
            match_options: MatchOptions::default(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Build an engine from configuration: vocabulary file, recipe catalog
    /// and, if enabled, the LLM fallback.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let source = Arc::new(JsonFileSource::new(config.vocabulary_path.clone()));
        let store = VocabularyStore::new(source, config.vocabulary_ttl);
        let recipes = RecipeBook::load(&config.recipes_path)?;

        let mut engine = Self::new(store)
            .with_recipes(recipes)
            .with_batch_concurrency(config.batch_concurrency)
            .with_suggestion_ttl(config.suggestion_ttl);

        if let Some(provider) = create_provider(&config.llm)? {
            tracing::info!(
                provider = provider.provider_name(),
                model = provider.model_name(),
                "LLM fallback enabled"
            );
            engine = engine.with_fallback(Arc::new(LlmFallback::new(provider, config.llm.timeout)));
        }

        Ok(engine)
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackClassifier>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_recipes(mut self, recipes: RecipeBook) -> Self {
        self.recipes = recipes;
        self.suggestions.clear();
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency.max(1);
        self
    }

    pub fn with_suggestion_ttl(mut self, ttl: Duration) -> Self {
        self.suggestions = SuggestionCache::new(ttl);
        self
    }

    pub fn with_min_match_percentage(mut self, min_match_percentage: f64) -> Self {
        self.match_options.min_match_percentage = min_match_percentage;
        self.suggestions.clear();
        self
    }

    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Current vocabulary snapshot, refreshed first if it has expired.
    pub async fn vocabulary(&self) -> Arc<Vocabulary> {
        self.store.get().await
    }

    /// Reload the vocabulary now, regardless of its age.
    pub async fn refresh_vocabulary(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        self.store.force_refresh().await
    }

    /// Classify one scanned label.
    pub async fn normalize(&self, name: &str, use_fallback: bool) -> NormalizationResult {
        let vocabulary = self.store.get().await;
        let fallback = self.fallback_for(use_fallback);
        normalize_ingredient(name, &vocabulary, fallback.as_deref()).await
    }

    /// Classify many labels concurrently; output order matches input order.
    ///
    /// The whole batch is classified against one vocabulary snapshot.
    pub async fn normalize_batch(
        &self,
        names: Vec<String>,
        use_fallback: bool,
    ) -> Vec<NormalizationResult> {
        let snapshot = self.store.get_with_status().await;
        if let Some(warning) = &snapshot.warning {
            tracing::warn!(warning = %warning, "Normalizing batch against a stale vocabulary");
        }
        let vocabulary = snapshot.vocabulary;
        let fallback = self.fallback_for(use_fallback);

        tracing::debug!(
            items = names.len(),
            use_fallback = fallback.is_some(),
            concurrency = self.batch_concurrency,
            "Normalizing batch"
        );

        let mut results: Vec<Option<NormalizationResult>> = vec![None; names.len()];
        let mut tasks = JoinSet::new();

        for (index, name) in names.iter().enumerate() {
            let vocabulary = Arc::clone(&vocabulary);
            let fallback = fallback.clone();
            let name = name.clone();

            tasks.spawn(async move {
                let result = normalize_ingredient(&name, &vocabulary, fallback.as_deref()).await;
                (index, result)
            });

            // Limit concurrency
            if tasks.len() >= self.batch_concurrency {
                if let Some(joined) = tasks.join_next().await {
                    store_result(&mut results, joined);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            store_result(&mut results, joined);
        }

        results
            .into_iter()
            .zip(&names)
            .map(|(result, name)| result.unwrap_or_else(|| NormalizationResult::unmatched(name)))
            .collect()
    }

    /// Validate a JSON batch request, then classify it.
    ///
    /// Nothing is classified if the payload is malformed.
    pub async fn normalize_batch_json(
        &self,
        payload: &Value,
    ) -> Result<Vec<NormalizationResult>, EngineError> {
        let request = BatchRequest::from_json(payload)?;
        Ok(self
            .normalize_batch(request.ingredients, request.use_llm_fallback)
            .await)
    }

    /// Cookable recipes for an inventory of canonical terms, best first.
    ///
    /// The inventory is canonicalized (trimmed, lower-cased, de-duplicated,
    /// sorted) before scoring, and results are cached per fingerprint of
    /// that canonical list.
    pub fn suggest_recipes<S: AsRef<str>>(&self, inventory_terms: &[S]) -> Vec<RecipeSuggestion> {
        let inventory = canonical_inventory(inventory_terms);
        let fingerprint = inventory_fingerprint(&inventory);
        if let Some(cached) = self.suggestions.get(&fingerprint) {
            tracing::debug!(fingerprint = %fingerprint, "Suggestion cache hit");
            return cached.as_ref().clone();
        }

        let suggestions: Vec<RecipeSuggestion> =
            rank_recipes(self.recipes.recipes(), &inventory, &self.match_options)
                .into_iter()
                .map(|(recipe, matched)| RecipeSuggestion::new(recipe, matched))
                .collect();

        self.suggestions
            .insert(fingerprint, suggestions)
            .as_ref()
            .clone()
    }

    fn fallback_for(&self, use_fallback: bool) -> Option<Arc<dyn FallbackClassifier>> {
        if use_fallback {
            self.fallback.clone()
        } else {
            None
        }
    }
}

fn store_result(
    results: &mut [Option<NormalizationResult>],
    joined: Result<(usize, NormalizationResult), tokio::task::JoinError>,
) {
    match joined {
        Ok((index, result)) => results[index] = Some(result),
        Err(e) => tracing::error!(error = %e, "Normalization task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeProvider;
    use crate::normalize::Method;
    use crate::recipes::Recipe;
    use crate::vocabulary::StaticSource;
    use serde_json::json;

    const VOCABULARY: &str = r#"{
        "ingredients": {
            "tomato": {
                "normalized": "tomato",
                "synonyms": ["tomate", "tomates"],
                "category": "vegetables",
                "categorySpanish": "Verduras",
                "frequency": 40
            },
            "onion": {
                "normalized": "onion",
                "synonyms": ["cebolla", "zwiebel"],
                "category": "vegetables",
                "frequency": 30
            },
            "milk": {
                "normalized": "milk",
                "synonyms": ["leche"],
                "category": "dairy",
                "frequency": 20
            }
        },
        "totalIngredients": 3
    }"#;

    fn engine() -> Engine {
        let source = Arc::new(StaticSource::from_json(VOCABULARY).unwrap());
        Engine::new(VocabularyStore::with_default_ttl(source))
    }

    fn engine_with_llm() -> Engine {
        let provider = FakeProvider::with_response("scanned item: \"tomtoes\"", "Tomato");
        let fallback = LlmFallback::new(Box::new(provider), Duration::from_secs(1));
        engine().with_fallback(Arc::new(fallback))
    }

    #[tokio::test]
    async fn test_normalize() {
        let engine = engine();

        let result = engine.normalize("Zwiebel", true).await;
        assert_eq!(result.normalized_name.as_deref(), Some("onion"));
        assert_eq!(result.method, Method::Synonym);
        assert_eq!(result.scanned_name, "Zwiebel");
    }

    #[tokio::test]
    async fn test_normalize_respects_fallback_flag() {
        let engine = engine_with_llm();

        let with_llm = engine.normalize("tomtoes", true).await;
        assert_eq!(with_llm.method, Method::Llm);
        assert_eq!(with_llm.normalized_name.as_deref(), Some("tomato"));

        let without_llm = engine.normalize("tomtoes", false).await;
        assert_eq!(without_llm.method, Method::Fuzzy);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let engine = engine().with_batch_concurrency(3);
        let names: Vec<String> = (0..40)
            .map(|i| match i % 4 {
                0 => "tomato".to_string(),
                1 => "LECHE".to_string(),
                2 => "xyzzyqux".to_string(),
                _ => format!("item {}", i),
            })
            .collect();

        let results = engine.normalize_batch(names.clone(), false).await;

        assert_eq!(results.len(), names.len());
        for (name, result) in names.iter().zip(&results) {
            assert_eq!(&result.scanned_name, name);
        }
        assert_eq!(results[0].normalized_name.as_deref(), Some("tomato"));
        assert_eq!(results[1].normalized_name.as_deref(), Some("milk"));
        assert_eq!(results[2].method, Method::None);
    }

    #[tokio::test]
    async fn test_batch_empty() {
        assert!(engine().normalize_batch(Vec::new(), true).await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_json() {
        let engine = engine_with_llm();

        let results = engine
            .normalize_batch_json(&json!({"ingredients": ["tomtoes", "cebolla"]}))
            .await
            .unwrap();
        assert_eq!(results[0].method, Method::Llm);
        assert_eq!(results[1].normalized_name.as_deref(), Some("onion"));

        let results = engine
            .normalize_batch_json(&json!({"ingredients": ["tomtoes"], "useLlmFallback": false}))
            .await
            .unwrap();
        assert_eq!(results[0].method, Method::Fuzzy);
    }

    #[tokio::test]
    async fn test_batch_json_rejects_malformed_payloads() {
        let engine = engine();

        for payload in [
            json!({}),
            json!({"ingredients": "tomato"}),
            json!({"ingredients": ["tomato", 3]}),
            json!({"ingredients": [], "useLlmFallback": "yes"}),
            json!(["tomato"]),
        ] {
            let err = engine.normalize_batch_json(&payload).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidArgument(_)), "{payload}");
        }
    }

    #[test]
    fn test_batch_request_defaults_to_fallback() {
        let request = BatchRequest::from_json(&json!({"ingredients": ["a"]})).unwrap();
        assert!(request.use_llm_fallback);
        assert_eq!(request.ingredients, vec!["a"]);
    }

    #[test]
    fn test_suggest_recipes() {
        let mut salsa = Recipe::new("salsa", ["tomato", "onion", "salt"], 2);
        salsa.name = "Salsa".to_string();
        salsa.instructions = vec!["Chop".to_string()];
        let engine = engine()
            .with_recipes(RecipeBook::new(vec![
                salsa,
                Recipe::new("soup", ["tomato", "cream", "basil", "stock"], 1),
            ]))
            .with_min_match_percentage(0.6);

        let suggestions = engine.suggest_recipes(&["tomato", "onion"]);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].recipe_id, "salsa");
        assert_eq!(suggestions[0].name, "Salsa");
        assert_eq!(suggestions[0].match_percentage, 67);
        assert_eq!(suggestions[0].missing_ingredients, vec!["salt"]);
        assert_eq!(suggestions[0].instructions, vec!["Chop"]);

        // Same inventory in another order hits the cache.
        assert_eq!(engine.suggest_recipes(&["onion", "Tomato"]), suggestions);
    }

    #[test]
    fn test_cached_suggestions_match_fresh_ranking() {
        let catalog = || {
            RecipeBook::new(vec![
                Recipe::new("salsa", ["tomato", "onion", "salt"], 2),
                Recipe::new("rice", ["rice"], 1),
            ])
        };
        let inventories: [(&[&str], &[&str]); 3] = [
            (&["tomato", "onion"], &["TOMATO", "ONION"]),
            (&["ricx", "ricy"], &["ricy", "ricx"]),
            (&["Onion ", "tomato", "onion"], &["tomato", "onion"]),
        ];

        for (first, second) in inventories {
            let warm = engine().with_recipes(catalog());
            let cold = engine().with_recipes(catalog());

            warm.suggest_recipes(first);
            let cached = warm.suggest_recipes(second);
            let fresh = cold.suggest_recipes(second);
            assert_eq!(cached, fresh, "{:?} then {:?}", first, second);
        }
    }

    /// Answers every label with a fixed term after a delay that shrinks as
    /// the label's trailing index grows, recording completion order.
    #[derive(Debug, Default)]
    struct StaggeredFallback {
        completed: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl FallbackClassifier for StaggeredFallback {
        async fn classify(
            &self,
            name: &str,
            _context_terms: &[&str],
        ) -> Result<Option<String>, crate::llm::LlmError> {
            let index: usize = name[name.len() - 3..].parse().unwrap();
            tokio::time::sleep(Duration::from_millis(15 * (8 - index as u64))).await;
            self.completed.lock().unwrap().push(index);
            Ok(Some("abcdefgh".to_string()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_order_survives_out_of_order_completion() {
        let source = StaticSource::from_json(
            r#"{"ingredients": {"abcdefgh": {"normalized": "abcdefgh", "category": "misc"}}}"#,
        )
        .unwrap();
        let fallback = Arc::new(StaggeredFallback::default());
        let engine = Engine::new(VocabularyStore::with_default_ttl(Arc::new(source)))
            .with_fallback(fallback.clone())
            .with_batch_concurrency(8);

        let names: Vec<String> = (0..8).map(|i| format!("abcde{:03}", i)).collect();
        let results = engine.normalize_batch(names.clone(), true).await;

        assert_eq!(results.len(), names.len());
        for (name, result) in names.iter().zip(&results) {
            assert_eq!(&result.scanned_name, name);
            assert_eq!(result.method, Method::Llm);
            assert_eq!(result.normalized_name.as_deref(), Some("abcdefgh"));
        }

        let completed = fallback.completed.lock().unwrap().clone();
        assert_eq!(completed.len(), 8);
        assert_ne!(completed[0], 0, "later labels should finish first");
    }
}
