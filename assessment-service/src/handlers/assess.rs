//! Single-image assessment.

use crate::error::AssessError;
use crate::models::{AssessRequest, Assessment, ImageInput};
use crate::services::assessment::SINGLE_ENDPOINT;
use crate::services::image::{self, ImageError};
use crate::services::{metrics, SubjectContext};
use crate::startup::AppState;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::rejection_error;

/// A decoded upload for the single-image endpoint.
///
/// Accepts `multipart/form-data` (file field `image` or `file`, text fields
/// `age` and `notes`) and otherwise treats the body as JSON.
#[derive(Debug)]
pub struct AssessUpload {
    pub image: ImageInput,
    pub context: SubjectContext,
}

#[async_trait]
impl<S> FromRequest<S> for AssessUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        let (image, request) = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejection_error(e.status(), e.body_text()))?;
            read_multipart(multipart).await?
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| rejection_error(e.status(), e.body_text()))?;
            read_json(&body)?
        };

        let image = image.map_err(image_error)?;
        request.validate()?;

        Ok(AssessUpload {
            image,
            context: SubjectContext {
                age: request.age,
                notes: request.notes.filter(|n| !n.trim().is_empty()),
            },
        })
    }
}

fn image_error(err: ImageError) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(err))
}

fn read_json(body: &[u8]) -> Result<(Result<ImageInput, ImageError>, AssessRequest), AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest(anyhow::anyhow!("No image provided")));
    }

    let request: AssessRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e)))?;

    let image = match request.image.as_deref() {
        Some(raw) => image::decode_base64_image(raw),
        None => Err(ImageError::Missing),
    };

    Ok((image, request))
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Result<ImageInput, ImageError>, AssessRequest), AppError> {
    let mut image = Err(ImageError::Missing);
    let mut request = AssessRequest {
        image: None,
        age: None,
        notes: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection_error(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "file" => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| rejection_error(e.status(), e.body_text()))?;
                image = image_from_part(data.to_vec(), content_type.as_deref());
            }
            "age" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| rejection_error(e.status(), e.body_text()))?;
                let text = text.trim();
                if !text.is_empty() {
                    let age = text.parse::<u32>().map_err(|_| {
                        AppError::BadRequest(anyhow::anyhow!("age must be a whole number"))
                    })?;
                    request.age = Some(age);
                }
            }
            "notes" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| rejection_error(e.status(), e.body_text()))?;
                request.notes = Some(text);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok((image, request))
}

/// Multipart clients send either the raw file or its base64 text.
fn image_from_part(data: Vec<u8>, content_type: Option<&str>) -> Result<ImageInput, ImageError> {
    if data.is_empty() {
        return Err(ImageError::Missing);
    }

    let is_text = content_type
        .map(|ct| ct.starts_with("text/"))
        .unwrap_or(true);

    if image::sniff_mime(&data).is_none() && is_text {
        if let Ok(text) = std::str::from_utf8(&data) {
            return image::decode_base64_image(text);
        }
    }

    image::from_bytes(data, content_type)
}

/// `POST /api/assess-eyes`
pub async fn assess_eyes(
    State(state): State<AppState>,
    upload: AssessUpload,
) -> Result<Json<Assessment>, AssessError> {
    metrics::record_image(SINGLE_ENDPOINT, &upload.image.mime_type);

    let assessment = state
        .assessments
        .assess(&upload.image, &upload.context)
        .await?;

    tracing::info!(
        risk_level = %assessment.risk_level,
        confidence = assessment.confidence,
        "Eye assessment completed"
    );

    Ok(Json(assessment))
}
