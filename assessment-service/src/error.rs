//! Response type for the assessment endpoints.

use crate::services::{AssessmentFailure, MockResult};
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;

/// Errors returned by the assessment handlers.
///
/// Request problems render through [`AppError`]. Provider and model failures
/// render the classified body, with the mock result when fallback is on.
#[derive(Debug)]
pub enum AssessError {
    Request(AppError),
    Assessment(AssessmentFailure),
}

impl From<AppError> for AssessError {
    fn from(err: AppError) -> Self {
        AssessError::Request(err)
    }
}

impl From<AssessmentFailure> for AssessError {
    fn from(failure: AssessmentFailure) -> Self {
        AssessError::Assessment(failure)
    }
}

impl From<validator::ValidationErrors> for AssessError {
    fn from(err: validator::ValidationErrors) -> Self {
        AssessError::Request(AppError::ValidationError(err))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureBody {
    error: &'static str,
    error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    is_mock_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mock_result: Option<MockResult>,
}

impl IntoResponse for AssessError {
    fn into_response(self) -> Response {
        match self {
            AssessError::Request(err) => err.into_response(),
            AssessError::Assessment(failure) => {
                let status = failure.kind.status();
                let body = FailureBody {
                    error: failure.kind.user_message(),
                    error_type: failure.kind.as_str(),
                    details: Some(failure.details).filter(|d| !d.is_empty()),
                    is_mock_result: failure.mock_result.is_some(),
                    mock_result: failure.mock_result,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
