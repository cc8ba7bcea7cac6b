use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("Failed to read vocabulary: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid vocabulary JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid vocabulary entry {key:?}: {reason}")]
    InvalidEntry { key: String, reason: String },

    #[error("Vocabulary source unavailable: {0}")]
    SourceUnavailable(String),
}

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Failed to read recipes: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid recipes JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Recipes(#[from] RecipeError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
