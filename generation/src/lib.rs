//! # Generation
//!
//! Korean answers grounded in retrieved context, produced by the Gemini
//! API. When no API key is configured the generator runs degraded and
//! returns a templated answer that echoes the question and context.
//!
//! ```text
//! GenerateRequest ──► build_prompt ──► LanguageModel ──► GenerateResponse
//!        │                                                     ▲
//!        └──────────── (degraded) fallback_answer ─────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;

pub use config::{GenerationParams, GeneratorConfig};
pub use error::{GenerationError, Result};
pub use gemini::{GeminiClient, LanguageModel};
pub use generator::{FALLBACK_MODEL_NAME, GenerateRequest, GenerateResponse, ResponseGenerator};
pub use prompt::KoreanAnalysis;
