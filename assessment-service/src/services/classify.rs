//! Maps assessment failures to a user-facing message and HTTP status.
//!
//! Typed provider errors are mapped directly. Free-form provider messages
//! are matched case-insensitively against known substrings, in table order.

use super::providers::ProviderError;
use super::validation::ValidationFailure;
use axum::http::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ApiKey,
    Quota,
    PayloadTooLarge,
    InvalidResponse,
    ContentFiltered,
    Timeout,
    Unknown,
}

const PATTERNS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::ApiKey,
        &["api key", "api_key", "apikey", "unauthorized", "authentication"],
    ),
    (
        ErrorKind::Quota,
        &[
            "quota",
            "billing",
            "rate limit",
            "insufficient_quota",
            "resource_exhausted",
        ],
    ),
    (
        ErrorKind::PayloadTooLarge,
        &[
            "too large",
            "payload size",
            "payload too large",
            "request entity",
            "exceeds the limit",
        ],
    ),
    (ErrorKind::InvalidResponse, &["json", "parse", "unexpected token"]),
    (ErrorKind::ContentFiltered, &["safety", "blocked"]),
    (ErrorKind::Timeout, &["timed out", "timeout", "deadline"]),
];

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Quota => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::InvalidResponse => StatusCode::BAD_GATEWAY,
            ErrorKind::ContentFiltered => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::ApiKey => {
                "The AI service is not configured correctly. Please contact support."
            }
            ErrorKind::Quota => "The AI service quota has been exceeded. Please try again later.",
            ErrorKind::PayloadTooLarge => {
                "The images are too large to analyze. Please use smaller or fewer images."
            }
            ErrorKind::InvalidResponse => {
                "The AI service returned a response that could not be understood."
            }
            ErrorKind::ContentFiltered => {
                "The image could not be analyzed due to content restrictions."
            }
            ErrorKind::Timeout => "The AI service took too long to respond. Please try again.",
            ErrorKind::Unknown => "Failed to analyze the image. Please try again.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ApiKey => "api_key",
            ErrorKind::Quota => "quota",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::ContentFiltered => "content_filtered",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Classify a free-form error message.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Classify a provider error.
pub fn classify_provider_error(error: &ProviderError) -> ErrorKind {
    match error {
        ProviderError::NotConfigured(_) | ProviderError::Unauthorized(_) => ErrorKind::ApiKey,
        ProviderError::RateLimited(_) => ErrorKind::Quota,
        ProviderError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
        ProviderError::ContentFiltered => ErrorKind::ContentFiltered,
        ProviderError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        ProviderError::ApiError(msg)
        | ProviderError::InvalidRequest(msg)
        | ProviderError::NetworkError(msg) => classify_message(msg),
    }
}

/// Model output that fails parsing or the schema is always an invalid response.
pub fn classify_validation_failure(_failure: &ValidationFailure) -> ErrorKind {
    ErrorKind::InvalidResponse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_matching_is_case_insensitive() {
        assert_eq!(classify_message("Incorrect API key provided"), ErrorKind::ApiKey);
        assert_eq!(
            classify_message("You exceeded your current QUOTA, check billing"),
            ErrorKind::Quota
        );
        assert_eq!(
            classify_message("Request Entity Too Large"),
            ErrorKind::PayloadTooLarge
        );
        assert_eq!(
            classify_message("Unexpected token < in JSON at position 0"),
            ErrorKind::InvalidResponse
        );
        assert_eq!(classify_message("operation timed out"), ErrorKind::Timeout);
        assert_eq!(classify_message("connection reset"), ErrorKind::Unknown);
    }

    #[test]
    fn malformed_request_payload_is_not_too_large() {
        let err = ProviderError::InvalidRequest(
            "Invalid JSON payload received. Unknown name \"foo\" at 'contents[0]': Cannot find field."
                .to_string(),
        );
        assert_eq!(classify_provider_error(&err), ErrorKind::InvalidResponse);
        assert_eq!(
            classify_message("Request payload size exceeds the limit: 20971520 bytes."),
            ErrorKind::PayloadTooLarge
        );
    }

    #[test]
    fn earlier_rows_win() {
        // Mentions both a key problem and JSON; the key problem is reported.
        assert_eq!(
            classify_message("invalid api_key in JSON body"),
            ErrorKind::ApiKey
        );
    }

    #[test]
    fn typed_errors_map_directly() {
        assert_eq!(
            classify_provider_error(&ProviderError::NotConfigured("x".into())),
            ErrorKind::ApiKey
        );
        assert_eq!(
            classify_provider_error(&ProviderError::RateLimited("slow".into())),
            ErrorKind::Quota
        );
        assert_eq!(
            classify_provider_error(&ProviderError::ContentFiltered),
            ErrorKind::ContentFiltered
        );
        assert_eq!(
            classify_provider_error(&ProviderError::ApiError(
                "500: billing hard limit reached".into()
            )),
            ErrorKind::Quota
        );
    }

    #[test]
    fn statuses() {
        assert_eq!(ErrorKind::ApiKey.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorKind::Quota.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorKind::InvalidResponse.status(), StatusCode::BAD_GATEWAY);
    }
}
