//! Canonical ingredient vocabulary.
//!
//! A [`Vocabulary`] is an immutable snapshot mapping canonical names to their
//! entries. Snapshots are built once from a [`VocabularyDocument`], validated
//! at that point, and never modified afterwards. [`VocabularyStore`] owns the
//! current snapshot and replaces it wholesale when it goes stale.

mod source;
mod store;

pub use source::{JsonFileSource, StaticSource, VocabularySource};
pub use store::{VocabularySnapshot, VocabularyStore, DEFAULT_VOCABULARY_TTL};

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VocabularyError;

/// Category assigned to entries whose source omits one.
pub const DEFAULT_CATEGORY: &str = "other";

/// The vocabulary file as published by the ingestion scripts.
///
/// ```json
/// {
///   "ingredients": {
///     "tomato": {
///       "normalized": "tomato",
///       "synonyms": ["tomate", "tomates"],
///       "category": "vegetables",
///       "categorySpanish": "Verduras",
///       "frequency": 120
///     }
///   },
///   "totalIngredients": 1
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyDocument {
    pub ingredients: HashMap<String, RawVocabularyEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ingredients: Option<usize>,
}

/// A vocabulary entry exactly as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVocabularyEntry {
    #[serde(default)]
    pub normalized: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default, alias = "categorySpanish")]
    pub display_category: Option<String>,
    #[serde(default)]
    pub frequency: u32,
}

/// A validated canonical ingredient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub normalized_name: String,
    pub synonyms: Vec<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_category: Option<String>,
    pub frequency: u32,
}

impl VocabularyEntry {
    pub fn new(normalized_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            normalized_name: normalized_name.into().trim().to_lowercase(),
            synonyms: Vec::new(),
            category: category.into(),
            subcategory: None,
            display_category: None,
            frequency: 0,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_display_category(mut self, display_category: impl Into<String>) -> Self {
        self.display_category = Some(display_category.into());
        self
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// True if the lower-cased `term` equals one of the synonyms, ignoring case.
    pub fn has_synonym(&self, term: &str) -> bool {
        self.synonyms
            .iter()
            .any(|synonym| synonym.to_lowercase() == term)
    }

    /// The localized category if present, else the raw category.
    pub fn preferred_category(&self) -> &str {
        self.display_category.as_deref().unwrap_or(&self.category)
    }

    fn from_raw(key: &str, raw: RawVocabularyEntry) -> Result<Self, VocabularyError> {
        let normalized_name = key.trim().to_lowercase();
        if normalized_name.is_empty() {
            return Err(VocabularyError::InvalidEntry {
                key: key.to_string(),
                reason: "empty canonical name".to_string(),
            });
        }

        if let Some(declared) = raw.normalized.as_deref() {
            let declared = declared.trim();
            if declared.is_empty() {
                return Err(VocabularyError::InvalidEntry {
                    key: key.to_string(),
                    reason: "empty \"normalized\" field".to_string(),
                });
            }
            if declared.to_lowercase() != normalized_name {
                tracing::warn!(
                    key = key,
                    normalized = declared,
                    "Vocabulary entry key differs from its normalized name, using key"
                );
            }
        }

        let synonyms = raw
            .synonyms
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let category = raw
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(Self {
            normalized_name,
            synonyms,
            category,
            subcategory: raw.subcategory.filter(|s| !s.trim().is_empty()),
            display_category: raw.display_category.filter(|s| !s.trim().is_empty()),
            frequency: raw.frequency,
        })
    }
}

/// Immutable point-in-time view of the vocabulary.
///
/// Entries iterate in canonical-name order, so every stage that takes "the
/// first" candidate is deterministic for a given snapshot.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: BTreeMap<String, VocabularyEntry>,
    /// Canonical names, longest first, for substring matching.
    by_length: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl Vocabulary {
    fn build(entries: BTreeMap<String, VocabularyEntry>, loaded_at: DateTime<Utc>) -> Self {
        let mut by_length: Vec<String> = entries.keys().cloned().collect();
        // Longer names are more specific ("green onion" before "onion").
        // The sort is stable, so equal lengths keep alphabetical order.
        by_length.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        Self {
            entries,
            by_length,
            loaded_at,
        }
    }

    pub fn empty() -> Self {
        Self::build(BTreeMap::new(), DateTime::<Utc>::default())
    }

    /// Build a snapshot from already-validated entries.
    ///
    /// A later entry with the same canonical name replaces an earlier one.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = VocabularyEntry>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.normalized_name.clone(), entry))
            .collect();
        Self::build(entries, Utc::now())
    }

    /// Validate a wire document into a snapshot stamped with `loaded_at`.
    pub fn from_document(
        document: VocabularyDocument,
        loaded_at: DateTime<Utc>,
    ) -> Result<Self, VocabularyError> {
        let declared_total = document.total_ingredients;
        let mut entries = BTreeMap::new();

        for (key, raw) in document.ingredients {
            let entry = VocabularyEntry::from_raw(&key, raw)?;
            if entries.contains_key(&entry.normalized_name) {
                return Err(VocabularyError::InvalidEntry {
                    key,
                    reason: "duplicate canonical name".to_string(),
                });
            }
            entries.insert(entry.normalized_name.clone(), entry);
        }

        if let Some(total) = declared_total {
            if total != entries.len() {
                tracing::warn!(
                    declared = total,
                    actual = entries.len(),
                    "Vocabulary entry count differs from declared total"
                );
            }
        }

        Ok(Self::build(entries, loaded_at))
    }

    /// Parse and validate the JSON wire format.
    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let document: VocabularyDocument = serde_json::from_str(json)?;
        Self::from_document(document, Utc::now())
    }

    pub fn get(&self, normalized_name: &str) -> Option<&VocabularyEntry> {
        self.entries.get(normalized_name)
    }

    /// Resolve a lower-cased term to its entry by canonical name, then by synonym.
    pub fn lookup(&self, term: &str) -> Option<&VocabularyEntry> {
        self.entries.get(term).or_else(|| self.find_synonym(term))
    }

    /// Entry listing the lower-cased `term` as a synonym. When several
    /// entries share it, the most frequent wins, then vocabulary order.
    pub fn find_synonym(&self, term: &str) -> Option<&VocabularyEntry> {
        self.entries
            .values()
            .filter(|entry| entry.has_synonym(term))
            .fold(None, |best: Option<&VocabularyEntry>, entry| match best {
                Some(b) if b.frequency >= entry.frequency => Some(b),
                _ => Some(entry),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.values()
    }

    /// Canonical names in snapshot order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries ordered for substring matching: longest canonical name first.
    pub fn by_specificity(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.by_length.iter().filter_map(|name| self.entries.get(name))
    }

    /// Up to `limit` canonical names, most frequent first.
    pub fn top_terms(&self, limit: usize) -> Vec<&str> {
        let mut entries: Vec<&VocabularyEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        entries
            .into_iter()
            .take(limit)
            .map(|entry| entry.normalized_name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// True once the snapshot is older than `ttl`.
    pub fn is_stale(&self, ttl: std::time::Duration) -> bool {
        let age = (Utc::now() - self.loaded_at).to_std().unwrap_or_default();
        age > ttl
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::empty()
    }
}
