//! Language model seam and the Gemini REST client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GenerationParams, GeneratorConfig};
use crate::error::{GenerationError, Result};

/// A model that turns a prompt into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Name reported as `model_used`.
    fn model_name(&self) -> &str;

    /// Generate a completion. `Ok(None)` when the model returned no candidate text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client from `config`. Fails with
    /// [`GenerationError::NotConfigured`] when no API key is set.
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GenerationError::NotConfigured("GEMINI_API_KEY is not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            params: config.params,
            client,
        })
    }

    /// Model name without a `models/` prefix.
    fn api_model_name(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationParams,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.api_model_name()
        );
        debug!("Sending {} prompt characters to {url}", prompt.chars().count());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest {
                contents: [Content {
                    parts: [TextPart { text: prompt }],
                }],
                generation_config: self.params,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!(
                "Gemini API error {status}: {error_text}"
            )));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(format!("{e}: {body}")))?;

        Ok(parsed
            .first_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}
