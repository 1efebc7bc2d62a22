//! Multi-image assessment with progression analysis.

use crate::config::MAX_BATCH_IMAGES;
use crate::error::AssessError;
use crate::models::{BatchAssessRequest, BatchAssessment, ImageInput};
use crate::services::assessment::BATCH_ENDPOINT;
use crate::services::image::decode_base64_image;
use crate::services::{metrics, SubjectContext};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::rejection_error;

/// Enforce the image count and combined size ceilings.
///
/// Count is checked before size so an empty or oversized list always
/// yields 400.
pub fn check_batch_limits(request: &BatchAssessRequest, max_bytes: usize) -> Result<(), AppError> {
    match request.images.len() {
        0 => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "At least one image is required"
            )))
        }
        n if n > MAX_BATCH_IMAGES => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Too many images: {} provided, maximum is {}",
                n,
                MAX_BATCH_IMAGES
            )))
        }
        _ => {}
    }

    let total = request.encoded_len();
    if total > max_bytes {
        return Err(AppError::PayloadTooLarge(anyhow::anyhow!(
            "Combined image size of {} bytes exceeds the {} byte limit",
            total,
            max_bytes
        )));
    }

    Ok(())
}

fn decode_all(images: &[String]) -> Result<Vec<ImageInput>, AppError> {
    images
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            decode_base64_image(raw).map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Image {}: {}", index + 1, e))
            })
        })
        .collect()
}

/// `POST /api/assess-eyes-batch`
pub async fn assess_eyes_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchAssessRequest>, JsonRejection>,
) -> Result<Json<BatchAssessment>, AssessError> {
    let Json(request) = payload.map_err(|e| rejection_error(e.status(), e.body_text()))?;

    check_batch_limits(&request, state.config.limits.max_batch_bytes).map_err(|e| {
        tracing::warn!(
            image_count = request.images.len(),
            encoded_bytes = request.encoded_len(),
            error = %e,
            "Rejected batch request"
        );
        e
    })?;
    request.validate()?;

    let images = decode_all(&request.images)?;
    for image in &images {
        metrics::record_image(BATCH_ENDPOINT, &image.mime_type);
    }

    let context = SubjectContext {
        age: request.age,
        notes: request.notes.filter(|n| !n.trim().is_empty()),
    };

    let batch = state.assessments.assess_batch(&images, &context).await?;

    tracing::info!(
        image_count = images.len(),
        risk_level = %batch.assessment.risk_level,
        trend = ?batch.progression_analysis.trend,
        "Batch eye assessment completed"
    );

    Ok(Json(batch))
}
