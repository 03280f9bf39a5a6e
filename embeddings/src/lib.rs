//! # Embeddings
//!
//! This crate turns Korean text into sentence embeddings with a persistent
//! cache in front of the model.
//!
//! ## Features
//!
//! - **Batch Reconciliation**: Mixed cache hits and misses resolved in input order
//! - **Caching**: Versioned on-disk entries behind a pluggable [`CacheStore`]
//! - **Fallback Model**: A multilingual model is tried when the primary fails
//! - **Similarity Search**: Cosine or dot scoring and top-k ranking
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embedding Service                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  texts ──► blank check ──► EmbeddingCache ──► EmbeddingModel    │
//! │                                 │                   │           │
//! │                                 ▼                   ▼           │
//! │                           CacheStore          /embed server     │
//! │                        (fs / memory)                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod similarity;

pub use cache::{CacheKey, CacheStore, EmbeddingCache, FsCacheStore, MemoryCacheStore};
pub use config::{EmbeddingConfig, ModelEndpoint};
pub use error::{EmbeddingError, Result};
pub use model::{EmbeddingModel, HttpEmbeddingModel};
pub use service::{BatchOptions, Document, EmbeddingService, ModelInfo};
pub use similarity::{SimilarMatch, SimilarityMethod, cosine_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
