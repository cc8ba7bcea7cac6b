//! TTL-refreshed holder of the current vocabulary snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::{Vocabulary, VocabularySource};
use crate::config::DEFAULT_VOCABULARY_TTL_SECS;
use crate::error::VocabularyError;

/// Snapshots older than this are refreshed on the next access.
pub const DEFAULT_VOCABULARY_TTL: Duration = Duration::from_secs(DEFAULT_VOCABULARY_TTL_SECS);

/// A vocabulary snapshot plus any non-fatal refresh failure.
#[derive(Debug, Clone)]
pub struct VocabularySnapshot {
    pub vocabulary: Arc<Vocabulary>,
    /// Set when a refresh was attempted and failed; `vocabulary` is then the
    /// previous (stale, possibly empty) snapshot.
    pub warning: Option<String>,
}

/// Owns the current vocabulary and swaps in a new one when it expires.
///
/// Readers clone an `Arc` out of the store and keep using it for the whole
/// cascade, so a concurrent refresh is never visible half-way through.
#[derive(Debug)]
pub struct VocabularyStore {
    source: Arc<dyn VocabularySource>,
    ttl: Duration,
    current: RwLock<Option<Arc<Vocabulary>>>,
    refresh_lock: Mutex<()>,
}

impl VocabularyStore {
    /// Create an empty store. Nothing is fetched until the first access.
    pub fn new(source: Arc<dyn VocabularySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_default_ttl(source: Arc<dyn VocabularySource>) -> Self {
        Self::new(source, DEFAULT_VOCABULARY_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a full replacement from the source and publish it.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        let _guard = self.refresh_lock.lock().await;
        self.load_locked().await
    }

    /// Alias of [`load`](Self::load) that ignores the TTL.
    pub async fn force_refresh(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        self.load().await
    }

    /// Current snapshot, refreshed first if missing or expired.
    ///
    /// Load failures are logged and swallowed; see
    /// [`get_with_status`](Self::get_with_status) to observe them.
    pub async fn get(&self) -> Arc<Vocabulary> {
        self.get_with_status().await.vocabulary
    }

    /// Like [`get`](Self::get), but reports a failed refresh to the caller.
    pub async fn get_with_status(&self) -> VocabularySnapshot {
        if let Some(vocabulary) = self.fresh_snapshot().await {
            return VocabularySnapshot {
                vocabulary,
                warning: None,
            };
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(vocabulary) = self.fresh_snapshot().await {
            return VocabularySnapshot {
                vocabulary,
                warning: None,
            };
        }

        match self.load_locked().await {
            Ok(vocabulary) => VocabularySnapshot {
                vocabulary,
                warning: None,
            },
            Err(e) => {
                let stale = self.current.read().await.clone();
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %e,
                    has_previous = stale.is_some(),
                    "Vocabulary refresh failed, serving previous snapshot"
                );
                VocabularySnapshot {
                    vocabulary: stale.unwrap_or_else(|| Arc::new(Vocabulary::empty())),
                    warning: Some(e.to_string()),
                }
            }
        }
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Vocabulary>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|vocabulary| !vocabulary.is_stale(self.ttl))
            .cloned()
    }

    /// Caller must hold `refresh_lock`.
    async fn load_locked(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        tracing::debug!(source = %self.source.describe(), "Loading vocabulary");

        let document = self.source.fetch().await?;
        let vocabulary = Arc::new(Vocabulary::from_document(document, Utc::now())?);

        tracing::info!(
            source = %self.source.describe(),
            entries = vocabulary.len(),
            "Vocabulary loaded"
        );

        *self.current.write().await = Some(Arc::clone(&vocabulary));
        Ok(vocabulary)
    }
}
