//! Health check handler.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the language model is available, `degraded` otherwise.
    pub status: &'static str,
    pub gemini_api_available: bool,
    pub model: Option<String>,
    /// RFC 3339.
    pub timestamp: String,
}

/// Handle health check requests.
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let available = state.generator.is_available();
    Json(HealthResponse {
        status: if available { "healthy" } else { "degraded" },
        gemini_api_available: available,
        model: available.then(|| state.generator.model_name().to_string()),
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}
