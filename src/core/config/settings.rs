use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

/// Runtime settings for the service.
///
/// Loaded from an optional `config.yml` in the data directory, then
/// overridden by environment variables. The OpenAI endpoint serves both
/// embeddings and chat completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the OpenAI-compatible endpoint.
    pub openai_base_url: String,
    /// API key; empty means unauthenticated (local endpoints).
    pub openai_api_key: String,
    /// Chat completion model.
    pub chat_model: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Embedding dimension; every vector the provider returns is checked
    /// against it.
    pub embedding_dimensions: usize,
    /// Maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Number of nearest neighbours requested per query.
    pub top_k: usize,
    /// Default similarity threshold in percent (0-100).
    pub default_threshold: f32,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            max_chunk_size: 1000,
            top_k: 3,
            default_threshold: 40.0,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then `config.yml` if present, then env vars.
    pub fn load(paths: &AppPaths) -> Self {
        let mut settings = match fs::read_to_string(&paths.config_path) {
            Ok(raw) => match serde_yaml::from_str::<Settings>(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(
                        "Failed to parse {}: {}; using defaults",
                        paths.config_path.display(),
                        err
                    );
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        };

        settings.apply_env();
        settings
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.openai_api_key = key;
        }
        if let Ok(model) = env::var("DOCRAG_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Ok(model) = env::var("DOCRAG_EMBEDDING_MODEL") {
            self.embedding_model = model;
        }
        if let Ok(val) = env::var("DOCRAG_MAX_CHUNK_SIZE") {
            if let Ok(parsed) = val.parse() {
                self.max_chunk_size = parsed;
            }
        }
        if let Ok(val) = env::var("DOCRAG_TOP_K") {
            if let Ok(parsed) = val.parse() {
                self.top_k = parsed;
            }
        }
        if let Ok(val) = env::var("DOCRAG_DEFAULT_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                self.default_threshold = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_expectations() {
        let settings = Settings::default();
        assert_eq!(settings.embedding_dimensions, 1536);
        assert_eq!(settings.max_chunk_size, 1000);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.default_threshold, 40.0);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let parsed: Settings =
            serde_yaml::from_str("chat_model: gpt-4o\ntop_k: 5\n").unwrap();
        assert_eq!(parsed.chat_model, "gpt-4o");
        assert_eq!(parsed.top_k, 5);
        // untouched fields keep defaults
        assert_eq!(parsed.max_chunk_size, 1000);
    }
}
