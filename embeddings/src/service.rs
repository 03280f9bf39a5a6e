//! Cached single and batch encoding on top of an [`EmbeddingModel`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::Embedding;
use crate::cache::EmbeddingCache;
use crate::config::{DEFAULT_BATCH_SIZE, EmbeddingConfig, ModelEndpoint};
use crate::error::{EmbeddingError, Result};
use crate::model::{EmbeddingModel, HttpEmbeddingModel};
use crate::similarity::{SimilarMatch, SimilarityMethod, rank_by_dot, similarity};

/// Text used to discover the embedding dimension of a freshly loaded model.
const DIMENSION_SAMPLE: &str = "테스트";

/// A JSON document passed through [`EmbeddingService::encode_documents`].
pub type Document = Map<String, Value>;

/// Options for a batch encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Texts per model request. Zero is treated as one.
    pub batch_size: usize,

    /// Whether to read from and write to the cache.
    pub use_cache: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            use_cache: true,
        }
    }
}

impl BatchOptions {
    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Bypass the cache.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Description of the loaded model and cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub embedding_dimension: usize,
    pub device: String,
    pub cache_enabled: bool,
    pub cache_dir: Option<PathBuf>,
}

/// Embedding service: blank handling, caching and batching around a model.
///
/// The service is built once by the composition root and shared by handle;
/// it holds no global state.
pub struct EmbeddingService {
    model: Arc<dyn EmbeddingModel>,
    cache: Option<EmbeddingCache>,
    dimension: usize,
    batch_size: usize,
}

impl EmbeddingService {
    /// Connect to the configured model, falling back to the secondary model
    /// if the primary cannot produce an embedding.
    pub async fn initialize(config: &EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        info!("Loading embedding model: {}", config.model.name);
        let primary = connect(&config.model, &config.device, timeout)?;
        let (model, dimension) = match detect_dimension(&primary).await {
            Ok(dimension) => (primary, dimension),
            Err(e) => {
                error!("Failed to load embedding model {}: {e}", config.model.name);
                let Some(fallback) = &config.fallback else {
                    return Err(e.into_unavailable());
                };

                info!("Switching to fallback embedding model: {}", fallback.name);
                let model = connect(fallback, &config.device, timeout)?;
                let dimension = detect_dimension(&model).await.map_err(|e| {
                    error!("Failed to load fallback embedding model {}: {e}", fallback.name);
                    EmbeddingError::ModelUnavailable(format!(
                        "neither {} nor {} could be loaded",
                        config.model.name, fallback.name
                    ))
                })?;
                (model, dimension)
            }
        };

        info!(
            "Embedding model ready - dimension: {dimension}, device: {}",
            model.device()
        );

        let cache = if config.cache_enabled {
            Some(EmbeddingCache::on_disk(&config.cache_dir).await?)
        } else {
            None
        };

        Ok(Self::with_model(Arc::new(model), dimension, cache).with_batch_size(config.batch_size))
    }

    /// Build a service from a model whose output dimension is already known.
    pub fn with_model(
        model: Arc<dyn EmbeddingModel>,
        dimension: usize,
        cache: Option<EmbeddingCache>,
    ) -> Self {
        Self {
            model,
            cache,
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size used by [`Self::default_batch_options`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Identifier of the loaded model.
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Length of every vector this service returns.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The cache, if enabled.
    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }

    /// Batch options using the configured batch size and the cache.
    pub fn default_batch_options(&self) -> BatchOptions {
        BatchOptions::default().with_batch_size(self.batch_size)
    }

    fn zero_vector(&self) -> Embedding {
        vec![0.0; self.dimension]
    }

    fn cache_for(&self, use_cache: bool) -> Option<&EmbeddingCache> {
        if use_cache { self.cache.as_ref() } else { None }
    }

    async fn cached(&self, cache: &EmbeddingCache, text: &str) -> Option<Embedding> {
        let key = EmbeddingCache::key_for(self.model_id(), text);
        let embedding = cache.get(&key).await?;
        if embedding.len() == self.dimension {
            Some(embedding)
        } else {
            warn!(
                "Ignoring cached embedding {key} with dimension {} (expected {})",
                embedding.len(),
                self.dimension
            );
            None
        }
    }

    async fn store(&self, cache: &EmbeddingCache, text: &str, embedding: &[f32]) {
        let key = EmbeddingCache::key_for(self.model_id(), text);
        cache.put(&key, self.model_id(), embedding).await;
    }

    /// Call the model and check that it returned one vector of the right
    /// dimension per input.
    async fn embed_checked(&self, inputs: &[String]) -> Result<Vec<Embedding>> {
        let embeddings = self
            .model
            .embed(inputs, true)
            .await
            .map_err(EmbeddingError::into_unavailable)?;

        if embeddings.len() != inputs.len() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "model returned {} embeddings for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            }
            .into_unavailable());
        }

        Ok(embeddings)
    }

    /// Encode one text, reporting model failures to the caller.
    pub async fn try_encode_single(&self, text: &str, use_cache: bool) -> Result<Embedding> {
        if is_blank(text) {
            return Ok(self.zero_vector());
        }

        let cache = self.cache_for(use_cache);
        if let Some(cache) = cache
            && let Some(embedding) = self.cached(cache, text).await
        {
            return Ok(embedding);
        }

        let embedding = self
            .embed_checked(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ModelUnavailable("model returned nothing".to_string()))?;

        if let Some(cache) = cache {
            self.store(cache, text, &embedding).await;
        }

        Ok(embedding)
    }

    /// Encode one text. Blank text and model failures yield a zero vector.
    pub async fn encode_single(&self, text: &str, use_cache: bool) -> Embedding {
        match self.try_encode_single(text, use_cache).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!("Failed to generate embedding: {e}");
                self.zero_vector()
            }
        }
    }

    /// Resolve every position of `texts`, returning the positions that could
    /// not be computed as `None` together with the error that stopped the run.
    async fn reconcile(
        &self,
        texts: &[String],
        options: BatchOptions,
    ) -> (Vec<Option<Embedding>>, Option<EmbeddingError>) {
        let cache = self.cache_for(options.use_cache);
        let mut results: Vec<Option<Embedding>> = vec![None; texts.len()];
        let mut pending: Vec<(usize, &str)> = Vec::new();

        for (position, text) in texts.iter().enumerate() {
            if is_blank(text) {
                results[position] = Some(self.zero_vector());
                continue;
            }

            if let Some(cache) = cache
                && let Some(embedding) = self.cached(cache, text).await
            {
                results[position] = Some(embedding);
                continue;
            }

            pending.push((position, text.as_str()));
        }

        if pending.is_empty() {
            return (results, None);
        }

        info!("Generating batch embeddings for {} texts", pending.len());

        for chunk in pending.chunks(options.batch_size.max(1)) {
            let inputs: Vec<String> = chunk.iter().map(|(_, text)| (*text).to_string()).collect();
            let embeddings = match self.embed_checked(&inputs).await {
                Ok(embeddings) => embeddings,
                Err(e) => return (results, Some(e)),
            };

            for (&(position, text), embedding) in chunk.iter().zip(embeddings) {
                if let Some(cache) = cache {
                    self.store(cache, text, &embedding).await;
                }
                results[position] = Some(embedding);
            }
        }

        (results, None)
    }

    /// Encode a batch, reporting the first model failure to the caller.
    pub async fn try_encode_batch(
        &self,
        texts: &[String],
        options: BatchOptions,
    ) -> Result<Vec<Embedding>> {
        let (results, failure) = self.reconcile(texts, options).await;
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| self.zero_vector()))
            .collect())
    }

    /// Encode a batch. The result always has one vector per input, in input
    /// order; positions the model could not compute hold zero vectors.
    pub async fn encode_batch(&self, texts: &[String], options: BatchOptions) -> Vec<Embedding> {
        let (results, failure) = self.reconcile(texts, options).await;
        if let Some(e) = failure {
            let unresolved = results.iter().filter(|r| r.is_none()).count();
            error!("Batch embedding failed, zero-filling {unresolved} texts: {e}");
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| self.zero_vector()))
            .collect()
    }

    /// Return copies of `documents` with `embedding`, `embedding_model` and
    /// `embedding_dim` added. A missing or non-string `text_field` embeds as blank.
    pub async fn encode_documents(
        &self,
        documents: &[Document],
        text_field: &str,
    ) -> Vec<Document> {
        if documents.is_empty() {
            return Vec::new();
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|doc| {
                doc.get(text_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        let embeddings = self.encode_batch(&texts, self.default_batch_options()).await;

        documents
            .iter()
            .zip(embeddings)
            .map(|(doc, embedding)| {
                let mut enriched = doc.clone();
                enriched.insert("embedding".to_string(), json!(embedding));
                enriched.insert("embedding_model".to_string(), json!(self.model_id()));
                enriched.insert("embedding_dim".to_string(), json!(self.dimension));
                enriched
            })
            .collect()
    }

    /// Similarity of two texts. `method` is `cosine` or `dot`.
    pub async fn similarity(&self, text1: &str, text2: &str, method: &str) -> Result<f32> {
        let method: SimilarityMethod = method.parse()?;
        let a = self.encode_single(text1, true).await;
        let b = self.encode_single(text2, true).await;
        similarity(&a, &b, method)
    }

    /// The `top_k` candidates most similar to `query`, best first.
    pub async fn find_most_similar(
        &self,
        query: &str,
        candidates: &[String],
        top_k: usize,
    ) -> Result<Vec<SimilarMatch>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.encode_single(query, true).await;
        let candidate_embeddings = self
            .encode_batch(candidates, self.default_batch_options())
            .await;

        rank_by_dot(&query_embedding, candidates, &candidate_embeddings, top_k)
    }

    /// Describe the loaded model and cache.
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_id().to_string(),
            embedding_dimension: self.dimension,
            device: self.model.device().to_string(),
            cache_enabled: self.cache.is_some(),
            cache_dir: self
                .cache
                .as_ref()
                .and_then(EmbeddingCache::location)
                .map(PathBuf::from),
        }
    }

    /// Remove every cached embedding.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear_all().await;
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn connect(
    endpoint: &ModelEndpoint,
    device: &str,
    timeout: Duration,
) -> Result<HttpEmbeddingModel> {
    Ok(
        HttpEmbeddingModel::with_timeout(&endpoint.name, &endpoint.base_url, timeout)?
            .with_device(device),
    )
}

async fn detect_dimension(model: &dyn EmbeddingModel) -> Result<usize> {
    let sample = model.embed(&[DIMENSION_SAMPLE.to_string()], true).await?;
    match sample.first().map(Vec::len) {
        Some(dimension) if dimension > 0 => Ok(dimension),
        _ => Err(EmbeddingError::InvalidResponse(
            "model returned no embedding for the sample text".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::normalize;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const DIM: usize = 4;

    fn fake_vector(text: &str) -> Embedding {
        let mut v = vec![1.0, 0.0, 0.0, 0.0];
        for (i, c) in text.chars().enumerate() {
            v[(c as usize + i) % DIM] += (c as u32 % 7) as f32 + 1.0;
        }
        normalize(&mut v);
        v
    }

    /// Deterministic model that records every request and can be told to
    /// fail from a given call onwards.
    #[derive(Default)]
    struct FakeModel {
        calls: Mutex<Vec<Vec<String>>>,
        fail_from_call: Option<usize>,
        dimension_override: Option<usize>,
    }

    impl FakeModel {
        fn failing_from(call: usize) -> Self {
            Self {
                fail_from_call: Some(call),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmbeddingModel for FakeModel {
        fn model_id(&self) -> &str {
            "fake-ko-model"
        }

        fn device(&self) -> &str {
            "cpu"
        }

        async fn embed(&self, texts: &[String], _normalize: bool) -> Result<Vec<Embedding>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(texts.to_vec());
                calls.len() - 1
            };
            if self.fail_from_call.is_some_and(|n| call >= n) {
                return Err(EmbeddingError::ApiRequest("backend down".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| match self.dimension_override {
                    Some(dim) => vec![1.0; dim],
                    None => fake_vector(t),
                })
                .collect())
        }
    }

    fn service(model: Arc<FakeModel>) -> EmbeddingService {
        EmbeddingService::with_model(model, DIM, Some(EmbeddingCache::in_memory()))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_blank_text_is_zero_vector_without_cache_or_model() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        for text in ["", "   ", "\n\t"] {
            assert_eq!(service.encode_single(text, true).await, vec![0.0; DIM]);
        }

        assert!(model.calls().is_empty());
        assert_eq!(service.cache().unwrap().len().await, 0);
    }

    #[tokio::test]
    async fn test_single_encode_is_cached() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        let first = service.encode_single("인공지능은 미래의 핵심 기술입니다.", true).await;
        let second = service.encode_single("인공지능은 미래의 핵심 기술입니다.", true).await;

        assert_eq!(first, second);
        assert_eq!(first, fake_vector("인공지능은 미래의 핵심 기술입니다."));
        assert_eq!(model.calls().len(), 1);
        assert_eq!(service.cache().unwrap().len().await, 1);
    }

    #[tokio::test]
    async fn test_single_encode_failure_is_zero_vector() {
        let model = Arc::new(FakeModel::failing_from(0));
        let service = service(model);

        assert_eq!(service.encode_single("안녕", true).await, vec![0.0; DIM]);
        assert!(matches!(
            service.try_encode_single("안녕", true).await,
            Err(EmbeddingError::ModelUnavailable(_))
        ));
        assert_eq!(service.cache().unwrap().len().await, 0);
    }

    #[tokio::test]
    async fn test_batch_duplicates_and_blank() {
        let model = Arc::new(FakeModel::default());
        let service = service(model);

        let result = service
            .encode_batch(&strings(&["안녕하세요", "", "안녕하세요"]), BatchOptions::default())
            .await;

        assert_eq!(result.len(), 3);
        assert_eq!(result[0], fake_vector("안녕하세요"));
        assert_eq!(result[1], vec![0.0; DIM]);
        assert_eq!(result[0], result[2]);
        assert_eq!(service.cache().unwrap().len().await, 1);
        assert_eq!(service.encode_single("안녕하세요", true).await, result[0]);
    }

    #[tokio::test]
    async fn test_batch_only_sends_uncached_texts_and_keeps_order() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        service.encode_single("둘", true).await;
        let texts = strings(&["하나", "둘", "셋"]);
        let result = service.encode_batch(&texts, BatchOptions::default()).await;

        let expected: Vec<Embedding> = texts.iter().map(|t| fake_vector(t)).collect();
        assert_eq!(result, expected);
        assert_eq!(model.calls()[1], strings(&["하나", "셋"]));
        assert_eq!(service.cache().unwrap().len().await, 3);
    }

    #[tokio::test]
    async fn test_batch_is_chunked() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        let texts = strings(&["a", "b", "c", "d", "e"]);
        let result = service
            .encode_batch(&texts, BatchOptions::default().with_batch_size(2))
            .await;

        assert_eq!(result.len(), 5);
        let sizes: Vec<usize> = model.calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_treated_as_one() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        let result = service
            .encode_batch(&strings(&["a", "b"]), BatchOptions::default().with_batch_size(0))
            .await;

        assert_eq!(result.len(), 2);
        assert_eq!(model.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_failure_fills_zero_vectors() {
        let model = Arc::new(FakeModel::failing_from(0));
        let service = service(model);
        let texts = strings(&["a", "", "b"]);

        let result = service.encode_batch(&texts, BatchOptions::default()).await;

        assert_eq!(result, vec![vec![0.0; DIM]; 3]);
        assert_eq!(service.cache().unwrap().len().await, 0);
        assert!(matches!(
            service.try_encode_batch(&texts, BatchOptions::default()).await,
            Err(EmbeddingError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_completed_chunks() {
        let model = Arc::new(FakeModel::failing_from(1));
        let service = service(model);
        let texts = strings(&["first", "second", "third"]);

        let result = service
            .encode_batch(&texts, BatchOptions::default().with_batch_size(1))
            .await;

        assert_eq!(result[0], fake_vector("first"));
        assert_eq!(result[1], vec![0.0; DIM]);
        assert_eq!(result[2], vec![0.0; DIM]);
        assert_eq!(service.cache().unwrap().len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_from_model_is_a_failure() {
        let model = Arc::new(FakeModel {
            dimension_override: Some(DIM + 1),
            ..FakeModel::default()
        });
        let service = service(model);

        let result = service
            .encode_batch(&strings(&["a"]), BatchOptions::default())
            .await;

        assert_eq!(result, vec![vec![0.0; DIM]]);
        assert_eq!(service.cache().unwrap().len().await, 0);
    }

    #[tokio::test]
    async fn test_use_cache_false_bypasses_cache() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        service.encode_single("text", false).await;
        service
            .encode_batch(&strings(&["text"]), BatchOptions::default().without_cache())
            .await;

        assert_eq!(model.calls().len(), 2);
        assert_eq!(service.cache().unwrap().len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_recompute() {
        let model = Arc::new(FakeModel::default());
        let service = service(model.clone());

        service.encode_single("캐시", true).await;
        service.clear_cache().await;
        assert_eq!(service.cache().unwrap().len().await, 0);

        service.encode_single("캐시", true).await;
        assert_eq!(service.cache().unwrap().len().await, 1);
        assert_eq!(model.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_encode_documents_adds_fields() {
        let model = Arc::new(FakeModel::default());
        let service = service(model);

        let mut with_text = Document::new();
        with_text.insert("id".to_string(), json!(1));
        with_text.insert("text".to_string(), json!("문서 내용"));
        let mut without_text = Document::new();
        without_text.insert("id".to_string(), json!(2));

        let documents = vec![with_text, without_text];
        let enriched = service.encode_documents(&documents, "text").await;

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0]["id"], json!(1));
        assert_eq!(enriched[0]["embedding_model"], json!("fake-ko-model"));
        assert_eq!(enriched[0]["embedding_dim"], json!(DIM));
        assert_eq!(enriched[0]["embedding"].as_array().unwrap().len(), DIM);
        assert_eq!(enriched[1]["embedding"], json!(vec![0.0; DIM]));
        assert!(!documents[0].contains_key("embedding"));
    }

    #[tokio::test]
    async fn test_find_most_similar() {
        let model = Arc::new(FakeModel::default());
        let service = service(model);
        let candidates = strings(&[
            "인공지능은 미래의 핵심 기술입니다.",
            "오늘 날씨가 정말 좋네요.",
            "맛있는 음식을 먹고 싶어요.",
        ]);

        let results = service
            .find_most_similar("오늘 날씨가 정말 좋네요.", &candidates, 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
        assert!(results[0].similarity >= results[1].similarity);

        let all = service
            .find_most_similar("질문", &candidates, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        assert!(service.find_most_similar("질문", &[], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similarity_methods() {
        let model = Arc::new(FakeModel::default());
        let service = service(model);

        let cosine = service.similarity("같은 문장", "같은 문장", "cosine").await.unwrap();
        assert!((cosine - 1.0).abs() < 1e-5);

        let dot = service.similarity("같은 문장", "같은 문장", "dot").await.unwrap();
        assert!((dot - 1.0).abs() < 1e-5);

        assert!(matches!(
            service.similarity("a", "b", "manhattan").await,
            Err(EmbeddingError::UnsupportedSimilarity(_))
        ));
    }

    #[tokio::test]
    async fn test_model_info() {
        let model = Arc::new(FakeModel::default());
        let info = service(model.clone()).model_info();

        assert_eq!(
            info,
            ModelInfo {
                model_name: "fake-ko-model".to_string(),
                embedding_dimension: DIM,
                device: "cpu".to_string(),
                cache_enabled: true,
                cache_dir: None,
            }
        );

        let uncached = EmbeddingService::with_model(model, DIM, None);
        assert!(!uncached.model_info().cache_enabled);
    }

    mod initialize {
        use super::*;
        use pretty_assertions::assert_eq;
        use tempfile::TempDir;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn healthy_server(vector: serde_json::Value) -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/embed"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([vector])))
                .mount(&server)
                .await;
            server
        }

        async fn broken_server() -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
            server
        }

        #[tokio::test]
        async fn test_primary_model_sets_dimension() {
            let server = healthy_server(json!([0.0, 0.6, 0.8])).await;
            let temp_dir = TempDir::new().unwrap();
            let config = EmbeddingConfig::default()
                .with_model(ModelEndpoint::new("primary", server.uri()))
                .with_fallback(None)
                .with_cache_dir(temp_dir.path().join("cache"));

            let service = EmbeddingService::initialize(&config).await.unwrap();

            assert_eq!(service.model_id(), "primary");
            assert_eq!(service.dimension(), 3);
            assert_eq!(
                service.model_info().cache_dir,
                Some(temp_dir.path().join("cache"))
            );
        }

        #[tokio::test]
        async fn test_falls_back_when_primary_fails() {
            let primary = broken_server().await;
            let fallback = healthy_server(json!([1.0, 0.0])).await;
            let temp_dir = TempDir::new().unwrap();
            let config = EmbeddingConfig::default()
                .with_model(ModelEndpoint::new("primary", primary.uri()))
                .with_fallback(Some(ModelEndpoint::new("fallback", fallback.uri())))
                .with_cache_dir(temp_dir.path());

            let service = EmbeddingService::initialize(&config).await.unwrap();

            assert_eq!(service.model_id(), "fallback");
            assert_eq!(service.dimension(), 2);
        }

        #[tokio::test]
        async fn test_both_models_failing_is_unavailable() {
            let primary = broken_server().await;
            let fallback = broken_server().await;
            let config = EmbeddingConfig::default()
                .with_model(ModelEndpoint::new("primary", primary.uri()))
                .with_fallback(Some(ModelEndpoint::new("fallback", fallback.uri())))
                .without_cache();

            assert!(matches!(
                EmbeddingService::initialize(&config).await,
                Err(EmbeddingError::ModelUnavailable(_))
            ));
        }
    }
}
