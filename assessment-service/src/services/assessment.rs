//! Assessment flow: prompt, provider call, schema validation, fallback.

use super::classify::{classify_provider_error, classify_validation_failure, ErrorKind};
use super::metrics;
use super::mock_data::{self, MOCK_PROVIDER};
use super::prompts;
use super::providers::{GenerationParams, ProviderResponse, VisionProvider};
use super::validation::{parse_assessment, parse_batch_assessment};
use crate::models::{Assessment, BatchAssessment, ImageInput};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const SINGLE_ENDPOINT: &str = "assess-eyes";
pub const BATCH_ENDPOINT: &str = "assess-eyes-batch";

/// Substitute result attached to a failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MockResult {
    Single(Assessment),
    Batch(BatchAssessment),
}

/// A classified assessment failure.
#[derive(Debug, Clone)]
pub struct AssessmentFailure {
    pub kind: ErrorKind,
    /// Sanitized technical detail for logs and the response body.
    pub details: String,
    pub mock_result: Option<MockResult>,
}

/// Optional subject context sent along with the images.
#[derive(Debug, Clone, Default)]
pub struct SubjectContext {
    pub age: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct AssessmentService {
    provider: Arc<dyn VisionProvider>,
    mock_fallback: bool,
    params: GenerationParams,
}

impl AssessmentService {
    pub fn new(provider: Arc<dyn VisionProvider>, mock_fallback: bool) -> Self {
        Self {
            provider,
            mock_fallback,
            params: GenerationParams::default(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn VisionProvider> {
        &self.provider
    }

    /// Assess a single photo.
    pub async fn assess(
        &self,
        image: &ImageInput,
        context: &SubjectContext,
    ) -> Result<Assessment, AssessmentFailure> {
        let prompt = prompts::single_image_prompt(context.age, context.notes.as_deref());
        let images = std::slice::from_ref(image);

        let outcome = match self.call(SINGLE_ENDPOINT, &prompt, images).await {
            Ok(response) => parse_assessment(&response.text).map_err(|failure| {
                tracing::warn!(
                    provider = self.provider.name(),
                    error = %failure,
                    "Model response failed schema validation"
                );
                (classify_validation_failure(&failure), failure.to_string())
            }),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(mut assessment) => {
                self.stamp(&mut assessment);
                metrics::record_assessment(SINGLE_ENDPOINT, self.provider.name(), "success");
                Ok(assessment)
            }
            Err((kind, details)) => Err(self.fail(SINGLE_ENDPOINT, kind, details, || {
                MockResult::Single(mock_data::mock_assessment())
            })),
        }
    }

    /// Assess a chronological series of photos in one provider call.
    pub async fn assess_batch(
        &self,
        images: &[ImageInput],
        context: &SubjectContext,
    ) -> Result<BatchAssessment, AssessmentFailure> {
        let prompt = prompts::batch_prompt(images.len(), context.age, context.notes.as_deref());

        let outcome = match self.call(BATCH_ENDPOINT, &prompt, images).await {
            Ok(response) => {
                parse_batch_assessment(&response.text, images.len()).map_err(|failure| {
                    tracing::warn!(
                        provider = self.provider.name(),
                        error = %failure,
                        "Batch model response failed schema validation"
                    );
                    (classify_validation_failure(&failure), failure.to_string())
                })
            }
            Err(err) => Err(err),
        };

        let image_count = images.len();
        match outcome {
            Ok(mut batch) => {
                self.stamp(&mut batch.assessment);
                metrics::record_assessment(BATCH_ENDPOINT, self.provider.name(), "success");
                Ok(batch)
            }
            Err((kind, details)) => Err(self.fail(BATCH_ENDPOINT, kind, details, || {
                MockResult::Batch(mock_data::mock_batch_assessment(image_count))
            })),
        }
    }

    async fn call(
        &self,
        endpoint: &str,
        prompt: &str,
        images: &[ImageInput],
    ) -> Result<ProviderResponse, (ErrorKind, String)> {
        let provider = self.provider.name();
        let model = self.provider.model();
        let started = Instant::now();

        tracing::info!(
            endpoint,
            provider,
            model,
            image_count = images.len(),
            image_bytes = images.iter().map(|i| i.byte_len).sum::<usize>(),
            "Requesting vision assessment"
        );

        let result = self.provider.analyze(prompt, images, &self.params).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_provider_latency(provider, model, elapsed);

        match result {
            Ok(response) => {
                metrics::record_tokens(
                    provider,
                    model,
                    response.input_tokens,
                    response.output_tokens,
                );
                tracing::info!(
                    endpoint,
                    provider,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    finish_reason = response.finish_reason.as_str(),
                    elapsed_secs = elapsed,
                    "Vision provider responded"
                );
                Ok(response)
            }
            Err(err) => {
                let kind = classify_provider_error(&err);
                metrics::record_provider_error(provider, kind.as_str());
                tracing::error!(
                    endpoint,
                    provider,
                    error = %err,
                    error_type = kind.as_str(),
                    elapsed_secs = elapsed,
                    "Vision provider call failed"
                );
                Err((kind, err.to_string()))
            }
        }
    }

    fn stamp(&self, assessment: &mut Assessment) {
        let provider = self.provider.name();
        assessment.stamp(provider, self.provider.model(), provider == MOCK_PROVIDER);
    }

    fn fail(
        &self,
        endpoint: &str,
        kind: ErrorKind,
        details: String,
        mock: impl FnOnce() -> MockResult,
    ) -> AssessmentFailure {
        let mock_result = if self.mock_fallback {
            metrics::record_mock_fallback(endpoint, kind.as_str());
            metrics::record_assessment(endpoint, self.provider.name(), "fallback");
            Some(mock())
        } else {
            metrics::record_assessment(endpoint, self.provider.name(), "error");
            None
        };

        AssessmentFailure {
            kind,
            details,
            mock_result,
        }
    }
}
