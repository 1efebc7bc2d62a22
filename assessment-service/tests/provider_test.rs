//! HTTP contract tests for the hosted vision providers.

mod common;

use assessment_service::config::{
    AssessmentConfig, GeminiConfig, OpenAiConfig, ProviderSelection,
};
use assessment_service::services::classify::{classify_provider_error, ErrorKind};
use assessment_service::services::image::decode_base64_image;
use assessment_service::services::providers::gemini::GeminiVisionProvider;
use assessment_service::services::providers::openai::OpenAiVisionProvider;
use assessment_service::services::providers::{GenerationParams, ProviderError, VisionProvider};
use axum::http::StatusCode;
use common::*;
use secrecy::Secret;
use serde_json::json;
use tower::util::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_config(server: &MockServer) -> OpenAiConfig {
    OpenAiConfig {
        api_key: Some(Secret::new("sk-test".to_string())),
        model: "gpt-4o".to_string(),
        api_base: format!("{}/v1", server.uri()),
        timeout_secs: 5,
    }
}

fn gemini_config(server: &MockServer) -> GeminiConfig {
    GeminiConfig {
        api_key: Some(Secret::new("g-test".to_string())),
        model: "gemini-1.5-flash".to_string(),
        api_base: format!("{}/v1beta", server.uri()),
        timeout_secs: 5,
    }
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 812, "completion_tokens": 143, "total_tokens": 955 }
    })
}

fn gemini_answer(text: &str, finish_reason: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": finish_reason
        }],
        "usageMetadata": { "promptTokenCount": 300, "candidatesTokenCount": 90 }
    })
}

#[tokio::test]
async fn openai_sends_image_as_data_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion(&model_answer().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiVisionProvider::new(openai_config(&server)).unwrap();
    let image = decode_base64_image(PNG_BASE64).unwrap();

    let response = provider
        .analyze("Assess this eye.", &[image], &GenerationParams::default())
        .await
        .unwrap();

    assert!(response.text.contains("moderate"));
    assert_eq!(response.input_tokens, 812);
    assert_eq!(response.output_tokens, 143);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let url = body["messages"][0]["content"][1]["image_url"]["url"]
        .as_str()
        .unwrap();
    assert_eq!(url, format!("data:image/png;base64,{}", PNG_BASE64));
}

#[tokio::test]
async fn openai_unauthorized_classifies_as_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiVisionProvider::new(openai_config(&server)).unwrap();
    let image = decode_base64_image(PNG_BASE64).unwrap();

    let err = provider
        .analyze("Assess this eye.", &[image], &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Unauthorized(_)));
    assert_eq!(classify_provider_error(&err), ErrorKind::ApiKey);
}

#[tokio::test]
async fn openai_quota_error_classifies_as_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "You exceeded your current quota, please check your plan and billing details.",
                "code": "insufficient_quota"
            }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiVisionProvider::new(openai_config(&server)).unwrap();
    let image = decode_base64_image(PNG_BASE64).unwrap();

    let err = provider
        .analyze("Assess this eye.", &[image], &GenerationParams::default())
        .await
        .unwrap_err();

    assert_eq!(classify_provider_error(&err), ErrorKind::Quota);
}

#[tokio::test]
async fn gemini_sends_inline_data_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "g-test"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_answer(&model_answer().to_string(), "STOP")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiVisionProvider::new(gemini_config(&server)).unwrap();
    let image = decode_base64_image(PNG_BASE64).unwrap();

    let response = provider
        .analyze("Assess this eye.", &[image.clone(), image], &GenerationParams::default())
        .await
        .unwrap();

    assert_eq!(response.input_tokens, 300);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1]["inline_data"]["mimeType"], "image/png");
}

#[tokio::test]
async fn gemini_safety_stop_is_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer("", "SAFETY")))
        .mount(&server)
        .await;

    let provider = GeminiVisionProvider::new(gemini_config(&server)).unwrap();
    let image = decode_base64_image(PNG_BASE64).unwrap();

    let err = provider
        .analyze("Assess this eye.", &[image], &GenerationParams::default())
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::ContentFiltered);
    assert_eq!(classify_provider_error(&err), ErrorKind::ContentFiltered);
}

#[tokio::test]
async fn assess_endpoint_uses_configured_openai() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion(&model_answer().to_string())),
        )
        .mount(&server)
        .await;

    let mut config: AssessmentConfig = test_config();
    config.provider = ProviderSelection::OpenAi;
    config.openai = openai_config(&server);
    let app = app_from_config(config);

    let response = app
        .oneshot(json_request("/api/assess-eyes", &json!({ "image": PNG_BASE64 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["isMockResult"], false);
}

#[tokio::test]
async fn upstream_rejection_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.provider = ProviderSelection::OpenAi;
    config.openai = openai_config(&server);
    let app = app_from_config(config);

    let response = app
        .oneshot(json_request("/api/assess-eyes", &json!({ "image": PNG_BASE64 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["errorType"], "api_key");
    assert_eq!(body["isMockResult"], true);
    assert_eq!(body["mockResult"]["isMockResult"], true);
}

#[tokio::test]
async fn test_gemini_probes_model_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-1.5-flash"))
        .and(query_param("key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/gemini-1.5-flash"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.gemini = gemini_config(&server);
    let app = app_from_config(config);

    let response = app.oneshot(get_request("/api/test-gemini")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "gemini-1.5-flash");
}
