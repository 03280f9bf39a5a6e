//! Configuration for the embedding service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Default Korean sentence-embedding model.
pub const DEFAULT_MODEL: &str = "jhgan/ko-sroberta-multitask";

/// Multilingual model tried when the default model cannot be loaded.
pub const FALLBACK_MODEL: &str = "distiluse-base-multilingual-cased";

/// Default number of texts sent to the model per request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// A model served by an embedding server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    /// Model identifier.
    pub name: String,

    /// Base URL of the server hosting the model.
    pub base_url: String,
}

impl ModelEndpoint {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

/// Configuration for [`crate::EmbeddingService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Primary model.
    pub model: ModelEndpoint,

    /// Model tried when the primary cannot be loaded.
    pub fallback: Option<ModelEndpoint>,

    /// Device reported in model info.
    pub device: String,

    /// Texts per model request.
    pub batch_size: usize,

    /// Whether embeddings are cached.
    pub cache_enabled: bool,

    /// Directory for the on-disk cache.
    pub cache_dir: PathBuf,

    /// HTTP timeout for model requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: ModelEndpoint::new(DEFAULT_MODEL, "http://127.0.0.1:8080"),
            fallback: Some(ModelEndpoint::new(FALLBACK_MODEL, "http://127.0.0.1:8081")),
            device: "cpu".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            cache_enabled: true,
            cache_dir: PathBuf::from("./vector_cache"),
            request_timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Load a configuration from a TOML file. Missing fields keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EmbeddingError::Config(format!("{}: {e}", path.display())))
    }

    /// Set the primary model.
    pub fn with_model(mut self, model: ModelEndpoint) -> Self {
        self.model = model;
        self
    }

    /// Set or remove the fallback model.
    pub fn with_fallback(mut self, fallback: Option<ModelEndpoint>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Disable caching.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}
