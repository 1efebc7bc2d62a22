//! OpenAI vision provider implementation.
//!
//! Uses the Chat Completions API with images attached as base64 `data:` URLs.

use super::{
    error_message, http_client, FinishReason, GenerationParams, ProviderError, ProviderResponse,
    VisionProvider,
};
use crate::config::{has_key, OpenAiConfig};
use crate::models::ImageInput;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// OpenAI vision provider.
pub struct OpenAiVisionProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiVisionProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        match &self.config.api_key {
            Some(key) if has_key(&self.config.api_key) => Ok(key.expose_secret()),
            _ => Err(ProviderError::NotConfigured(
                "OPENAI_API_KEY is not configured".to_string(),
            )),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn build_request(
        &self,
        prompt: &str,
        images: &[ImageInput],
        params: &GenerationParams,
    ) -> ChatCompletionRequest {
        let mut content = vec![MessagePart::Text {
            text: prompt.to_string(),
        }];
        content.extend(images.iter().map(|image| MessagePart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url(),
                detail: "high".to_string(),
            },
        }));

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params.json_output.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        has_key(&self.config.api_key)
    }

    async fn analyze(
        &self,
        prompt: &str,
        images: &[ImageInput],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.api_key()?;
        let request = self.build_request(prompt, images, params);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            image_count = images.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, error_message(&error_text)));
        }

        let api_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("OpenAI returned no choices".to_string())
        })?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Complete,
        };

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
            tracing::warn!(refusal = %refusal, "OpenAI refused the request");
            return Err(ProviderError::ContentFiltered);
        }

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "OpenAI returned an empty response".to_string(),
            ));
        }

        let usage = api_response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.api_url(&format!("models/{}", self.config.model)))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(ProviderError::from_status(status, error_message(&error_text)))
        }
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<MessagePart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessagePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i32,
    #[serde(default)]
    completion_tokens: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn provider() -> OpenAiVisionProvider {
        OpenAiVisionProvider::new(OpenAiConfig {
            api_key: Some(Secret::new("sk-test".to_string())),
            model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1/".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn request_attaches_images_as_data_urls() {
        let image = ImageInput {
            mime_type: "image/png".to_string(),
            data_base64: "iVBORw0KGgo=".to_string(),
            byte_len: 8,
        };
        let request = provider().build_request("assess", &[image], &GenerationParams::default());
        let value = serde_json::to_value(&request).unwrap();

        let parts = &value["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,iVBORw0KGgo="
        );
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn api_url_tolerates_trailing_slash() {
        assert_eq!(
            provider().api_url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
