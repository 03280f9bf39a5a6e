//! HTTP error handling and response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use korag_generation::GenerationError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Generation(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("응답 생성 중 오류 발생: {e}"),
            ),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
