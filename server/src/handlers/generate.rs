//! Answer generation handler.

use axum::{Json, extract::State};
use korag_generation::{GenerateRequest, GenerateResponse};
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

/// Handle `POST /generate`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ServerError> {
    if request.query.trim().is_empty() {
        return Err(ServerError::InvalidRequest("쿼리가 비어있습니다.".to_string()));
    }
    if request.context.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "컨텍스트가 비어있습니다.".to_string(),
        ));
    }

    let response = state.generator.generate(&request).await?;

    info!(
        "Response generated - user: {}, model: {}, processing time: {:.3}s",
        request.user_id, response.model_used, response.processing_time
    );
    Ok(Json(response))
}
