//! Classification cascade: raw scanned label → canonical vocabulary term.
//!
//! Stages run in strict priority order and the first success wins:
//!
//! 1. exact canonical name (confidence 1.0)
//! 2. synonym (0.95)
//! 3. canonical name contained in the label (0.8)
//! 4. fuzzy match above 0.75 (the similarity itself)
//! 5. external fallback classifier, only when the best fuzzy score is in
//!    (0.5, 0.75] and a fallback is supplied (0.85)
//! 6. fuzzy match in (0.5, 0.75] (the similarity itself)
//! 7. no match (0.0)
//!
//! Stage 3 only looks at canonical names, never synonyms. A label that
//! contains a synonym but not the canonical name drops through to fuzzy
//! matching.

mod fallback;
mod prompt;

pub use fallback::{parse_answer, FallbackClassifier, LlmFallback};
pub use prompt::{render_normalize_prompt, UNKNOWN_ANSWER};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cleaner::clean;
use crate::levenshtein::similarity;
use crate::vocabulary::{Vocabulary, VocabularyEntry};

pub const EXACT_CONFIDENCE: f64 = 1.0;
pub const SYNONYM_CONFIDENCE: f64 = 0.95;
pub const PARTIAL_CONFIDENCE: f64 = 0.8;
pub const LLM_CONFIDENCE: f64 = 0.85;

/// Fuzzy scores above this are accepted without consulting the fallback.
pub const HIGH_FUZZY_THRESHOLD: f64 = 0.75;

/// Fuzzy scores at or below this are never used, not even to trigger the fallback.
pub const FUZZY_FLOOR: f64 = 0.5;

/// Maximum number of vocabulary terms sent to the fallback as context.
pub const FALLBACK_CONTEXT_TERMS: usize = 100;

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Exact,
    Synonym,
    Partial,
    Fuzzy,
    Llm,
    None,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Exact => "exact",
            Method::Synonym => "synonym",
            Method::Partial => "partial",
            Method::Fuzzy => "fuzzy",
            Method::Llm => "llm",
            Method::None => "none",
        };
        f.write_str(name)
    }
}

/// Outcome of classifying one scanned label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    /// The input exactly as received.
    pub scanned_name: String,
    pub normalized_name: Option<String>,
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_category: Option<String>,
    pub confidence: f64,
    pub method: Method,
}

impl NormalizationResult {
    fn matched(scanned_name: &str, entry: &VocabularyEntry, confidence: f64, method: Method) -> Self {
        Self {
            scanned_name: scanned_name.to_string(),
            normalized_name: Some(entry.normalized_name.clone()),
            category: Some(entry.category.clone()),
            display_category: entry.display_category.clone(),
            confidence,
            method,
        }
    }

    pub fn unmatched(scanned_name: &str) -> Self {
        Self {
            scanned_name: scanned_name.to_string(),
            normalized_name: None,
            category: None,
            display_category: None,
            confidence: 0.0,
            method: Method::None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.method != Method::None
    }
}

/// Best fuzzy candidate from stage 4.
#[derive(Debug, Clone, Copy)]
struct FuzzyCandidate<'a> {
    entry: &'a VocabularyEntry,
    score: f64,
}

/// Result of the stages that need no external help.
enum LocalOutcome<'a> {
    Resolved(NormalizationResult),
    /// Only a mid-confidence fuzzy candidate; the fallback may do better.
    Ambiguous {
        name: String,
        candidate: FuzzyCandidate<'a>,
    },
    Unmatched,
}

/// Lower-cased, trimmed, marketing-free form of a raw label.
pub fn prepare_name(raw: &str) -> String {
    clean(raw).to_lowercase().trim().to_string()
}

/// Classify a scanned label against a vocabulary snapshot.
///
/// Passing `None` for `fallback` skips stage 5. Never fails: fallback errors
/// are logged and treated as "no answer".
pub async fn normalize_ingredient(
    raw: &str,
    vocabulary: &Vocabulary,
    fallback: Option<&dyn FallbackClassifier>,
) -> NormalizationResult {
    let (name, candidate) = match classify_local(raw, vocabulary) {
        LocalOutcome::Resolved(result) => return result,
        LocalOutcome::Unmatched => return NormalizationResult::unmatched(raw),
        LocalOutcome::Ambiguous { name, candidate } => (name, candidate),
    };

    if let Some(fallback) = fallback {
        if let Some(entry) = ask_fallback(fallback, &name, vocabulary).await {
            tracing::debug!(raw = raw, normalized = %entry.normalized_name, "Classified by fallback");
            return NormalizationResult::matched(raw, entry, LLM_CONFIDENCE, Method::Llm);
        }
    }

    low_fuzzy(raw, candidate)
}

/// Classify without the fallback stage. Usable outside an async runtime.
pub fn normalize_ingredient_offline(raw: &str, vocabulary: &Vocabulary) -> NormalizationResult {
    match classify_local(raw, vocabulary) {
        LocalOutcome::Resolved(result) => result,
        LocalOutcome::Unmatched => NormalizationResult::unmatched(raw),
        LocalOutcome::Ambiguous { candidate, .. } => low_fuzzy(raw, candidate),
    }
}

fn low_fuzzy(raw: &str, candidate: FuzzyCandidate<'_>) -> NormalizationResult {
    NormalizationResult::matched(raw, candidate.entry, candidate.score, Method::Fuzzy)
}

/// Stages 1-4, plus the decision whether stage 5/6 applies.
fn classify_local<'a>(raw: &str, vocabulary: &'a Vocabulary) -> LocalOutcome<'a> {
    let name = prepare_name(raw);
    if name.is_empty() {
        return LocalOutcome::Unmatched;
    }

    if let Some(entry) = vocabulary.get(&name) {
        return LocalOutcome::Resolved(NormalizationResult::matched(
            raw,
            entry,
            EXACT_CONFIDENCE,
            Method::Exact,
        ));
    }

    if let Some(entry) = vocabulary.find_synonym(&name) {
        return LocalOutcome::Resolved(NormalizationResult::matched(
            raw,
            entry,
            SYNONYM_CONFIDENCE,
            Method::Synonym,
        ));
    }

    if let Some(entry) = vocabulary
        .by_specificity()
        .find(|entry| name.contains(entry.normalized_name.as_str()))
    {
        return LocalOutcome::Resolved(NormalizationResult::matched(
            raw,
            entry,
            PARTIAL_CONFIDENCE,
            Method::Partial,
        ));
    }

    match best_fuzzy(&name, vocabulary) {
        Some(candidate) if candidate.score > HIGH_FUZZY_THRESHOLD => LocalOutcome::Resolved(
            NormalizationResult::matched(raw, candidate.entry, candidate.score, Method::Fuzzy),
        ),
        Some(candidate) if candidate.score > FUZZY_FLOOR => {
            LocalOutcome::Ambiguous { name, candidate }
        }
        _ => LocalOutcome::Unmatched,
    }
}

/// Score of an entry: its best similarity over the canonical name and synonyms.
fn entry_score(name: &str, entry: &VocabularyEntry) -> f64 {
    entry
        .synonyms
        .iter()
        .map(|synonym| similarity(name, &synonym.to_lowercase()))
        .fold(similarity(name, &entry.normalized_name), f64::max)
}

/// Highest-scoring entry. On equal scores the first in vocabulary order wins.
fn best_fuzzy<'a>(name: &str, vocabulary: &'a Vocabulary) -> Option<FuzzyCandidate<'a>> {
    let mut best: Option<FuzzyCandidate<'a>> = None;

    for entry in vocabulary.iter() {
        let score = entry_score(name, entry);
        if best.map_or(true, |b| score > b.score) {
            best = Some(FuzzyCandidate { entry, score });
        }
    }

    best
}

/// Stage 5. Any error or unusable answer yields `None`.
async fn ask_fallback<'a>(
    fallback: &dyn FallbackClassifier,
    name: &str,
    vocabulary: &'a Vocabulary,
) -> Option<&'a VocabularyEntry> {
    let context = vocabulary.top_terms(FALLBACK_CONTEXT_TERMS);

    let answer = match fallback.classify(name, &context).await {
        Ok(Some(answer)) => answer,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(name = name, error = %e, "Fallback classifier failed");
            return None;
        }
    };

    let term = answer.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }

    let entry = vocabulary.lookup(&term);
    if entry.is_none() {
        tracing::debug!(name = name, answer = %term, "Fallback answer not in vocabulary");
    }
    entry
}
