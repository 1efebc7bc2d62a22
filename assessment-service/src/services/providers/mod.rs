//! Vision provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction over hosted multimodal
//! models, allowing the assessment flow to switch between OpenAI, Gemini and
//! a local mock backend.

pub mod gemini;
pub mod mock;
pub mod openai;

use crate::models::ImageInput;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status from a provider API.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Unauthorized(message),
            413 => ProviderError::PayloadTooLarge(message),
            429 => ProviderError::RateLimited(message),
            400 => ProviderError::InvalidRequest(message),
            _ => ProviderError::ApiError(format!("{}: {}", status, message)),
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        // Gemini carries the API key in the query string.
        let err = err.without_url();
        if err.is_timeout() {
            ProviderError::NetworkError(format!("request timed out: {}", err))
        } else {
            ProviderError::NetworkError(err.to_string())
        }
    }
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Raw text answer. Expected to hold a JSON object.
    pub text: String,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    /// Finish reason.
    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

/// Generation parameters for vision requests.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,

    /// Ask the model for a bare JSON object.
    pub json_output: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: Some(0.2),
            max_tokens: Some(1500),
            json_output: true,
        }
    }
}

/// Trait for image-understanding providers.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Short provider label used in responses, logs and metrics.
    fn name(&self) -> &'static str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Analyze one or more images with the given prompt.
    async fn analyze(
        &self,
        prompt: &str,
        images: &[ImageInput],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Pull a human-readable message out of a provider error body.
///
/// Both OpenAI and Gemini wrap errors as `{"error": {"message": ...}}`.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ProviderError::NetworkError(format!("Failed to create HTTP client: {}", e)))
}
