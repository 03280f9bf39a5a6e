//! Service descriptor and stats handlers.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::{AppState, SERVICE_NAME};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "status": "running",
        "description": "Gemini API를 활용한 한국어 RAG 응답 생성 서비스",
        "features": [
            "Gemini 모델 기반 응답 생성",
            "한국어 최적화 프롬프트",
            "컨텍스트 기반 응답 생성",
            "한국어 분석 정보 활용",
        ],
    }))
}

pub async fn handle_stats(State(state): State<AppState>) -> Json<Value> {
    let generator = &state.generator;
    Json(json!({
        "service": SERVICE_NAME,
        "gemini": {
            "available": generator.is_available(),
            "model": generator.model_name(),
            "api_key_configured": generator.api_key_configured(),
        },
        "features": {
            "korean_optimization": true,
            "context_based_generation": true,
            "multilingual": true,
        },
        "version": VERSION,
    }))
}
