//! Application state shared across handlers.

use std::sync::Arc;

use korag_generation::ResponseGenerator;

/// Display name reported by `/` and `/stats`.
pub const SERVICE_NAME: &str = "Korean RAG Gemini Service";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Answer generator, built once at startup.
    pub generator: Arc<ResponseGenerator>,
}

impl AppState {
    pub fn new(generator: ResponseGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}
