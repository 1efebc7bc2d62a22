//! HTTP handlers for the assessment service.

pub mod assess;
pub mod batch;
pub mod health;
pub mod metrics;

use axum::http::{StatusCode, Uri};
use service_core::error::AppError;

/// Map a body-extraction rejection onto the service error shape.
pub(crate) fn rejection_error(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(anyhow::anyhow!(
            "Request body exceeds the upload limit"
        )),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            AppError::UnsupportedMediaType(anyhow::anyhow!(message))
        }
        _ => AppError::BadRequest(anyhow::anyhow!(message)),
    }
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}
