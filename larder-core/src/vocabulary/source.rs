//! Where vocabulary documents come from.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use super::VocabularyDocument;
use crate::error::VocabularyError;

/// Supplier of complete vocabulary documents.
///
/// Every fetch returns the full mapping. The store replaces its snapshot
/// with whatever the source returns and never merges.
#[async_trait]
pub trait VocabularySource: Send + Sync + fmt::Debug {
    async fn fetch(&self) -> Result<VocabularyDocument, VocabularyError>;

    /// Short description for log lines (e.g., a file path).
    fn describe(&self) -> String;
}

/// Reads the vocabulary JSON file from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VocabularySource for JsonFileSource {
    async fn fetch(&self) -> Result<VocabularyDocument, VocabularyError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a fixed in-memory document.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    document: VocabularyDocument,
}

impl StaticSource {
    pub fn new(document: VocabularyDocument) -> Self {
        Self { document }
    }

    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl VocabularySource for StaticSource {
    async fn fetch(&self) -> Result<VocabularyDocument, VocabularyError> {
        Ok(self.document.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
