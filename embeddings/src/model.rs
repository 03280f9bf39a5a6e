//! Embedding model backends.
//!
//! The model runtime is an external collaborator. [`HttpEmbeddingModel`]
//! reaches a sentence-embedding server speaking the text-embeddings-inference
//! `/embed` protocol; tests and embedders with their own runtime implement
//! [`EmbeddingModel`] directly.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Trait for embedding model backends.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Identifier of the model, used in cache keys and reported metadata.
    fn model_id(&self) -> &str;

    /// Where the model runs (e.g. `cpu`, `cuda`).
    fn device(&self) -> &str;

    /// Embed every text, returning one vector per input in input order.
    async fn embed(&self, texts: &[String], normalize: bool) -> Result<Vec<Embedding>>;
}

/// Client for a text-embeddings-inference compatible server.
pub struct HttpEmbeddingModel {
    /// Model identifier served at `base_url`.
    model_id: String,

    /// Server base URL.
    base_url: String,

    /// Device reported by the server deployment.
    device: String,

    /// HTTP client.
    client: reqwest::Client,
}

impl HttpEmbeddingModel {
    /// Create a client for `model_id` served at `base_url`.
    pub fn new(model_id: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(model_id, base_url, Duration::from_secs(30))
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        model_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model_id: model_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            device: "cpu".to_string(),
            client,
        })
    }

    /// Set the reported device.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> &str {
        &self.device
    }

    async fn embed(&self, texts: &[String], normalize_output: bool) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Requesting {} embeddings from {} (model: {})",
            texts.len(),
            self.base_url,
            self.model_id
        );

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                inputs: texts,
                normalize: normalize_output,
            })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "embedding server returned {status}: {error_text}"
            )));
        }

        let mut embeddings: Vec<Embedding> = response.json().await?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        if normalize_output {
            for embedding in &mut embeddings {
                normalize(embedding);
            }
        }

        info!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
