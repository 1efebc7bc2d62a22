use crate::config::has_key;
use crate::services::classify::classify_provider_error;
use crate::startup::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const SERVICE_NAME: &str = "assessment-service";

/// `GET /api/health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "activeProvider": state.assessments.provider().name(),
        "providers": {
            "openai": {
                "configured": has_key(&config.openai.api_key),
                "model": config.openai.model,
            },
            "gemini": {
                "configured": has_key(&config.gemini.api_key),
                "model": config.gemini.model,
            },
        },
    }))
}

/// `GET /api/test-gemini`: probe Gemini with a model-metadata request.
pub async fn test_gemini(State(state): State<AppState>) -> Response {
    match state.gemini.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "model": state.gemini.model(),
            })),
        )
            .into_response(),
        Err(err) => {
            let kind = classify_provider_error(&err);
            tracing::warn!(error = %err, error_type = kind.as_str(), "Gemini probe failed");
            (
                kind.status(),
                Json(json!({
                    "status": "error",
                    "errorType": kind.as_str(),
                    "error": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}
