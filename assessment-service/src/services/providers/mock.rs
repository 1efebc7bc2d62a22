//! Mock vision provider for local runs and testing.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, VisionProvider};
use crate::models::ImageInput;
use crate::services::mock_data::{self, MOCK_MODEL, MOCK_PROVIDER};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Behavior {
    /// Answer from the canned catalogue.
    Catalogue,
    /// Answer with fixed text.
    Scripted(String),
    /// Fail every call.
    Failing(ProviderError),
}

/// Mock vision provider.
pub struct MockVisionProvider {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockVisionProvider {
    /// Answers with a random catalogue entry, including a progression block.
    pub fn catalogue() -> Self {
        Self::with_behavior(Behavior::Catalogue)
    }

    /// Answers every call with `text`.
    pub fn scripted(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Scripted(text.into()))
    }

    /// Fails every call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_behavior(Behavior::Failing(error))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `analyze` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &'static str {
        MOCK_PROVIDER
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn analyze(
        &self,
        prompt: &str,
        images: &[ImageInput],
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = match &self.behavior {
            Behavior::Catalogue => {
                let batch = mock_data::mock_batch_assessment(images.len());
                serde_json::to_string(&batch)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
            }
            Behavior::Scripted(text) => text.clone(),
            Behavior::Failing(error) => return Err(error.clone()),
        };

        Ok(ProviderResponse {
            output_tokens: text.len() as i32 / 4,
            text,
            input_tokens: prompt.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.behavior {
            Behavior::Failing(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }
}
