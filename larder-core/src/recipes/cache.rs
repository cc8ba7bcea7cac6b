//! In-memory cache of suggestion lists keyed by inventory fingerprint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use super::RecipeSuggestion;
use crate::config::DEFAULT_SUGGESTION_TTL_SECS;

/// Suggestion lists older than this are recomputed.
pub const DEFAULT_SUGGESTION_TTL: Duration = Duration::from_secs(DEFAULT_SUGGESTION_TTL_SECS);

/// Canonical form of an inventory: trimmed, lower-cased, de-duplicated and
/// sorted, with blank terms dropped.
///
/// Suggestions are scored against this list, so two inventories with the
/// same canonical form always produce the same suggestions.
pub fn canonical_inventory<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = terms
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Order-insensitive key for an inventory: SHA-256 of its canonical form
/// joined by `,`. `["Onion", "tomato"]` and `["tomato", "onion", "onion"]`
/// share a key.
pub fn inventory_fingerprint<S: AsRef<str>>(terms: &[S]) -> String {
    hex::encode(Sha256::digest(canonical_inventory(terms).join(",").as_bytes()))
}

#[derive(Debug)]
struct CachedSuggestions {
    stored_at: Instant,
    suggestions: Arc<Vec<RecipeSuggestion>>,
}

#[derive(Debug)]
pub struct SuggestionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedSuggestions>>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTION_TTL)
    }
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedSuggestions>> {
        // Entries are plain data; a panicked writer cannot leave them torn.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh suggestions for `fingerprint`, evicting an expired entry.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<Vec<RecipeSuggestion>>> {
        let mut entries = self.entries();
        match entries.get(fingerprint) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => {
                Some(Arc::clone(&cached.suggestions))
            }
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    /// Store `suggestions`, dropping every expired entry on the way.
    pub fn insert(
        &self,
        fingerprint: String,
        suggestions: Vec<RecipeSuggestion>,
    ) -> Arc<Vec<RecipeSuggestion>> {
        let suggestions = Arc::new(suggestions);
        let mut entries = self.entries();
        entries.retain(|_, cached| cached.stored_at.elapsed() < self.ttl);
        entries.insert(
            fingerprint,
            CachedSuggestions {
                stored_at: Instant::now(),
                suggestions: Arc::clone(&suggestions),
            },
        );
        suggestions
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
