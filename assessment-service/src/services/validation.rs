//! Schema validation for model output.
//!
//! Model text is reduced to its outermost JSON object, deserialized into the
//! typed result (presence and enum checks), then range-checked.

use crate::models::{Assessment, BatchAssessment};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error("Model response contained no JSON object")]
    NoJson,

    #[error("Failed to parse JSON from model response: {0}")]
    Json(String),

    #[error("Model response does not match the assessment schema: {0}")]
    Schema(String),

    #[error("Model response is out of range: {0}")]
    Constraints(#[from] validator::ValidationErrors),
}

/// Slice the outermost `{ ... }` from model text. Tolerates Markdown code
/// fences and prose around the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_value(text: &str) -> Result<Value, ValidationFailure> {
    let json = extract_json_object(text).ok_or(ValidationFailure::NoJson)?;
    serde_json::from_str(json).map_err(|e| ValidationFailure::Json(e.to_string()))
}

fn validate_typed<T>(value: &Value) -> Result<T, ValidationFailure>
where
    T: DeserializeOwned + Validate,
{
    let typed: T = serde_json::from_value(value.clone())
        .map_err(|e| ValidationFailure::Schema(e.to_string()))?;
    typed.validate()?;
    Ok(typed)
}

/// Validate an already-parsed JSON value as a single assessment.
pub fn validate_assessment(value: &Value) -> Result<Assessment, ValidationFailure> {
    validate_typed(value)
}

/// Validate an already-parsed JSON value as a batch assessment.
pub fn validate_batch_assessment(value: &Value) -> Result<BatchAssessment, ValidationFailure> {
    validate_typed(value)
}

/// Parse and validate raw model text as a single assessment.
pub fn parse_assessment(text: &str) -> Result<Assessment, ValidationFailure> {
    validate_assessment(&parse_value(text)?)
}

/// Parse and validate raw model text as a batch assessment covering
/// `image_count` images.
pub fn parse_batch_assessment(
    text: &str,
    image_count: usize,
) -> Result<BatchAssessment, ValidationFailure> {
    let mut batch = validate_batch_assessment(&parse_value(text)?)?;
    batch.progression_analysis.normalize(image_count);
    Ok(batch)
}
