//! Engine configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default vocabulary file location.
pub const DEFAULT_VOCABULARY_PATH: &str = "data/normalized-ingredients.json";

/// Default recipe catalog location.
pub const DEFAULT_RECIPES_PATH: &str = "data/recipes.json";

/// Default Ollama generate endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Default model for the fallback classifier.
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_VOCABULARY_TTL_SECS: u64 = 3600;
pub const DEFAULT_SUGGESTION_TTL_SECS: u64 = 24 * 3600;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown LLM provider: {0} (expected \"ollama\", \"fake\" or \"none\")")]
    UnknownProvider(String),
}

/// Which LLM backs the fallback classification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Fallback stage disabled.
    None,
    /// Canned responses, for offline runs.
    Fake,
    /// Local or remote Ollama server.
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "fake" => Ok(Self::Fake),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Fallback LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Generate endpoint URL.
    pub endpoint: String,
    pub model: String,
    /// Upper bound for one fallback call.
    pub timeout: Duration,
    /// If set, responses are cached on disk here.
    pub cache_dir: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::None,
            endpoint: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            cache_dir: None,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub vocabulary_path: PathBuf,
    pub vocabulary_ttl: Duration,
    pub recipes_path: PathBuf,
    pub llm: LlmConfig,
    /// Maximum classifications in flight per batch.
    pub batch_concurrency: usize,
    /// How long suggestion lists stay cached per inventory fingerprint.
    pub suggestion_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vocabulary_path: PathBuf::from(DEFAULT_VOCABULARY_PATH),
            vocabulary_ttl: Duration::from_secs(DEFAULT_VOCABULARY_TTL_SECS),
            recipes_path: PathBuf::from(DEFAULT_RECIPES_PATH),
            llm: LlmConfig::default(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            suggestion_ttl: Duration::from_secs(DEFAULT_SUGGESTION_TTL_SECS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `LARDER_VOCABULARY_PATH` (default: "data/normalized-ingredients.json")
    /// - `LARDER_VOCABULARY_TTL_SECS` (default: 3600)
    /// - `LARDER_RECIPES_PATH` (default: "data/recipes.json")
    /// - `LARDER_LLM_PROVIDER`: "ollama", "fake" or "none" (default: "none")
    /// - `OLLAMA_URL` (default: "http://localhost:11434/api/generate")
    /// - `LARDER_LLM_MODEL` (default: "llama3.1:8b")
    /// - `LARDER_LLM_TIMEOUT_SECS` (default: 30)
    /// - `LARDER_LLM_CACHE_DIR`: enables the on-disk response cache; an
    ///   empty value selects `~/.larder/llm-cache`
    /// - `LARDER_BATCH_CONCURRENCY` (default: 16)
    /// - `LARDER_SUGGESTION_TTL_SECS` (default: 86400)
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(var(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };

        let provider = match var("LARDER_LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::None,
        };

        let llm = LlmConfig {
            provider,
            endpoint: var("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: var("LARDER_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: secs("LARDER_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            cache_dir: var("LARDER_LLM_CACHE_DIR").map(|dir| {
                if dir.trim().is_empty() {
                    Self::default_llm_cache_dir()
                } else {
                    PathBuf::from(dir)
                }
            }),
        };

        let batch_concurrency = var("LARDER_BATCH_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_BATCH_CONCURRENCY);

        Ok(Self {
            vocabulary_path: var("LARDER_VOCABULARY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VOCABULARY_PATH)),
            vocabulary_ttl: secs("LARDER_VOCABULARY_TTL_SECS", DEFAULT_VOCABULARY_TTL_SECS),
            recipes_path: var("LARDER_RECIPES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RECIPES_PATH)),
            llm,
            batch_concurrency,
            suggestion_ttl: secs("LARDER_SUGGESTION_TTL_SECS", DEFAULT_SUGGESTION_TTL_SECS),
        })
    }

    /// Default LLM cache directory: ~/.larder/llm-cache
    pub fn default_llm_cache_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".larder").join("llm-cache"))
            .unwrap_or_else(|| PathBuf::from("data/llm-cache"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::None);
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.vocabulary_ttl, Duration::from_secs(3600));
        assert_eq!(config.batch_concurrency, DEFAULT_BATCH_CONCURRENCY);
        assert!(config.llm.cache_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LARDER_LLM_PROVIDER", "Ollama"),
            ("OLLAMA_URL", "http://gpu-box:11434/api/generate"),
            ("LARDER_LLM_TIMEOUT_SECS", "5"),
            ("LARDER_VOCABULARY_PATH", "/srv/vocab.json"),
            ("LARDER_LLM_CACHE_DIR", "/tmp/llm"),
        ])
        .unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.endpoint, "http://gpu-box:11434/api/generate");
        assert_eq!(config.llm.timeout, Duration::from_secs(5));
        assert_eq!(config.vocabulary_path, PathBuf::from("/srv/vocab.json"));
        assert_eq!(config.llm.cache_dir, Some(PathBuf::from("/tmp/llm")));
    }

    #[test]
    fn test_empty_cache_dir_uses_default_location() {
        for value in ["", "  "] {
            let config = config_from(&[("LARDER_LLM_CACHE_DIR", value)]).unwrap();
            assert_eq!(
                config.llm.cache_dir,
                Some(EngineConfig::default_llm_cache_dir())
            );
        }
    }

    #[test]
    fn test_default_ttl_constants_agree() {
        assert_eq!(
            crate::vocabulary::DEFAULT_VOCABULARY_TTL,
            Duration::from_secs(DEFAULT_VOCABULARY_TTL_SECS)
        );
        assert_eq!(
            crate::recipes::DEFAULT_SUGGESTION_TTL,
            Duration::from_secs(DEFAULT_SUGGESTION_TTL_SECS)
        );
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = config_from(&[
            ("LARDER_VOCABULARY_TTL_SECS", "soon"),
            ("LARDER_BATCH_CONCURRENCY", "0"),
        ])
        .unwrap();
        assert_eq!(config.vocabulary_ttl, Duration::from_secs(3600));
        assert_eq!(config.batch_concurrency, DEFAULT_BATCH_CONCURRENCY);
    }

    #[test]
    fn test_unknown_provider() {
        let err = config_from(&[("LARDER_LLM_PROVIDER", "gpt")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(p) if p == "gpt"));
    }
}
