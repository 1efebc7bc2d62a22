//! Shared helpers for assessment-service integration tests.

#![allow(dead_code)]

use assessment_service::config::{AssessmentConfig, ProviderSelection};
use assessment_service::services::providers::mock::MockVisionProvider;
use assessment_service::services::providers::VisionProvider;
use assessment_service::{build_router, AppState};
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;

/// An 8-byte PNG signature, enough for MIME sniffing.
pub const PNG_BASE64: &str = "iVBORw0KGgo=";

/// A JPEG SOI marker followed by an APP0 header.
pub const JPEG_BYTES: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

/// Config with no API keys, no rate limiting and mock fallback on.
pub fn test_config() -> AssessmentConfig {
    let mut config = AssessmentConfig::default();
    config.common.port = 0;
    config.common.log_level = "error".to_string();
    config.limits.rate_limit_per_minute = 0;
    config
}

/// Router whose active provider is `provider`; Gemini probe is unconfigured.
pub fn app_with_provider(config: AssessmentConfig, provider: Arc<dyn VisionProvider>) -> Router {
    let gemini = Arc::new(MockVisionProvider::failing(
        assessment_service::services::providers::ProviderError::NotConfigured(
            "GOOGLE_GENERATIVE_AI_API_KEY is not configured".to_string(),
        ),
    ));
    build_router(AppState::with_providers(config, provider, gemini))
}

/// Router built the way `main` builds it, from config alone.
pub fn app_from_config(config: AssessmentConfig) -> Router {
    let state = AppState::from_config(config).expect("Failed to build state");
    build_router(state)
}

/// Router that talks to the real OpenAI provider with no key configured.
pub fn app_without_keys() -> Router {
    let mut config = test_config();
    config.provider = ProviderSelection::OpenAi;
    app_from_config(config)
}

pub fn scripted_app(answer: &Value) -> Router {
    app_with_provider(
        test_config(),
        Arc::new(MockVisionProvider::scripted(answer.to_string())),
    )
}

/// A well-formed model answer.
pub fn model_answer() -> Value {
    json!({
        "riskLevel": "moderate",
        "explanation": "Mild haziness visible in the left lens.",
        "confidence": 0.72,
        "findings": ["Slight lens haziness"],
        "recommendations": ["Schedule an eye exam within three months"],
        "technicalMetrics": {
            "imageQuality": 82,
            "pupilClarity": 61,
            "lensOpacity": 34,
            "scleraRedness": 2,
            "symmetryScore": 88
        }
    })
}

/// A well-formed batch answer with a progression block.
pub fn batch_answer(trend: &str) -> Value {
    let mut answer = model_answer();
    answer["progressionAnalysis"] = json!({
        "trend": trend,
        "summary": "Opacity increased slightly between the first and last photo.",
        "consistencyScore": 0.8
    });
    answer
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Build a multipart body from `(name, content_type, bytes)` parts.
pub fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let boundary = "assessment-test-boundary";
    let mut body = Vec::new();
    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"eye.jpg\"\r\nContent-Type: {}\r\n\r\n",
                    name, ct
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        panic!(
            "Response body is not JSON: {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}
