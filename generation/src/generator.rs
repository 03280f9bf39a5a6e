//! The response generator and its degraded mode.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use crate::gemini::{GeminiClient, LanguageModel};
use crate::prompt::{KoreanAnalysis, NO_ANSWER, build_prompt, fallback_answer};

/// `model_used` reported by fallback answers.
pub const FALLBACK_MODEL_NAME: &str = "fallback-mode";

fn default_user_id() -> String {
    "default".to_string()
}

/// An explicit `null` user id means the default one.
fn user_id_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_user_id))
}

/// A question with its retrieved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub query: String,
    pub context: String,
    #[serde(default)]
    pub korean_analysis: Option<KoreanAnalysis>,
    #[serde(default = "default_user_id", deserialize_with = "user_id_or_default")]
    pub user_id: String,
}

impl GenerateRequest {
    pub fn new(query: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: context.into(),
            korean_analysis: None,
            user_id: default_user_id(),
        }
    }

    pub fn with_analysis(mut self, analysis: KoreanAnalysis) -> Self {
        self.korean_analysis = Some(analysis);
        self
    }
}

/// A generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub model_used: String,
    /// Seconds spent producing the answer.
    pub processing_time: f64,
    /// Context length in characters.
    pub context_length: usize,
    pub korean_optimized: bool,
}

enum State {
    Ready(Arc<dyn LanguageModel>),
    Degraded { reason: String },
}

/// Produces answers from a language model, or templated answers when no
/// model could be set up. A degraded generator stays degraded.
pub struct ResponseGenerator {
    state: State,
    model_name: String,
    api_key_configured: bool,
}

impl ResponseGenerator {
    /// Set up the Gemini client described by `config`. Never fails: a
    /// missing key or client error yields a degraded generator.
    pub fn initialize(config: &GeneratorConfig) -> Self {
        match GeminiClient::new(config) {
            Ok(client) => {
                info!("Gemini API initialized: {}", config.model);
                Self {
                    state: State::Ready(Arc::new(client)),
                    model_name: config.model.clone(),
                    api_key_configured: true,
                }
            }
            Err(e) => {
                if config.api_key_configured() {
                    error!("Gemini API initialization failed: {e}");
                } else {
                    warn!("GEMINI_API_KEY is not set, running in fallback mode");
                }
                Self {
                    state: State::Degraded {
                        reason: e.to_string(),
                    },
                    model_name: config.model.clone(),
                    api_key_configured: config.api_key_configured(),
                }
            }
        }
    }

    /// Use an already constructed model.
    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model_name: model.model_name().to_string(),
            state: State::Ready(model),
            api_key_configured: true,
        }
    }

    /// A generator that only produces fallback answers.
    pub fn degraded(model_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            state: State::Degraded {
                reason: reason.into(),
            },
            model_name: model_name.into(),
            api_key_configured: false,
        }
    }

    /// Whether answers come from the language model.
    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Configured model name, whether or not it is reachable.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Whether an API key was supplied.
    pub fn api_key_configured(&self) -> bool {
        self.api_key_configured
    }

    /// Generate with the language model. Fails with
    /// [`GenerationError::NotConfigured`] when degraded.
    pub async fn try_generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let model = match &self.state {
            State::Ready(model) => model,
            State::Degraded { reason } => {
                return Err(GenerationError::NotConfigured(reason.clone()));
            }
        };

        let start = Instant::now();
        let prompt = build_prompt(
            &request.query,
            &request.context,
            request.korean_analysis.as_ref(),
        );

        let text = model.generate(&prompt).await.inspect_err(|e| {
            error!("Gemini response generation failed: {e}");
        })?;

        Ok(GenerateResponse {
            response: text.unwrap_or_else(|| NO_ANSWER.to_string()),
            model_used: self.model_name.clone(),
            processing_time: start.elapsed().as_secs_f64(),
            context_length: request.context.chars().count(),
            korean_optimized: true,
        })
    }

    /// Generate an answer, using the fallback template when degraded. Errors
    /// from a reachable model are returned, not replaced by the fallback.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if self.is_available() {
            return self.try_generate(request).await;
        }

        warn!("Gemini API is not initialized, returning fallback answer");
        let start = Instant::now();
        let response = fallback_answer(&request.query, &request.context);

        Ok(GenerateResponse {
            response,
            model_used: FALLBACK_MODEL_NAME.to_string(),
            processing_time: start.elapsed().as_secs_f64(),
            context_length: request.context.chars().count(),
            korean_optimized: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Result<Option<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: Result<Option<String>>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted-model"
        }

        async fn generate(&self, prompt: &str) -> Result<Option<String>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(GenerationError::Api(e.to_string())),
            }
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new("한국어 처리란?", "한국어 자연어 처리 문서")
    }

    #[tokio::test]
    async fn test_generate_with_model() {
        let model = ScriptedModel::replying(Ok(Some("답변입니다".to_string())));
        let generator = ResponseGenerator::with_model(model.clone());

        let response = generator.generate(&request()).await.unwrap();

        assert_eq!(response.response, "답변입니다");
        assert_eq!(response.model_used, "scripted-model");
        assert!(response.korean_optimized);
        assert_eq!(response.context_length, "한국어 자연어 처리 문서".chars().count());
        assert!(response.processing_time >= 0.0);
        assert!(model.prompts.lock().unwrap()[0].contains("한국어 처리란?"));
    }

    #[tokio::test]
    async fn test_no_candidate_yields_apology() {
        let generator = ResponseGenerator::with_model(ScriptedModel::replying(Ok(None)));

        let response = generator.generate(&request()).await.unwrap();

        assert_eq!(response.response, NO_ANSWER);
        assert!(response.korean_optimized);
    }

    #[tokio::test]
    async fn test_model_error_is_not_replaced_by_fallback() {
        let generator = ResponseGenerator::with_model(ScriptedModel::replying(Err(
            GenerationError::Api("quota exceeded".to_string()),
        )));

        assert!(matches!(
            generator.generate(&request()).await,
            Err(GenerationError::Api(_))
        ));
    }

    #[tokio::test]
    async fn test_degraded_generator_uses_fallback() {
        let generator = ResponseGenerator::initialize(&GeneratorConfig::default());
        assert!(!generator.is_available());
        assert!(!generator.api_key_configured());
        assert_eq!(generator.model_name(), "gemini-1.5-flash");

        let response = generator.generate(&request()).await.unwrap();

        assert_eq!(response.model_used, FALLBACK_MODEL_NAME);
        assert!(!response.korean_optimized);
        assert!(response.response.contains("한국어 처리란?"));
        assert!(response.response.contains("한국어 자연어 처리 문서"));

        assert!(matches!(
            generator.try_generate(&request()).await,
            Err(GenerationError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_analysis_reaches_prompt() {
        let model = ScriptedModel::replying(Ok(Some("ok".to_string())));
        let generator = ResponseGenerator::with_model(model.clone());
        let request = request().with_analysis(KoreanAnalysis {
            original_query: "한국어 처리란?".to_string(),
            processed_query: "한국어 처리".to_string(),
            tokenized: vec!["한국어".to_string()],
            keywords: vec!["처리".to_string()],
        });

        generator.generate(&request).await.unwrap();

        assert!(model.prompts.lock().unwrap()[0].contains("- 처리된 쿼리: 한국어 처리"));
    }

    #[test]
    fn test_request_defaults_user_id() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"query": "q", "context": "c"}"#).unwrap();
        assert_eq!(request.user_id, "default");
        assert_eq!(request.korean_analysis, None);
    }

    #[test]
    fn test_request_null_user_id_is_default() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"query": "q", "context": "c", "user_id": null}"#).unwrap();
        assert_eq!(request.user_id, "default");

        let request: GenerateRequest =
            serde_json::from_str(r#"{"query": "q", "context": "c", "user_id": "kim"}"#).unwrap();
        assert_eq!(request.user_id, "kim");
    }
}
