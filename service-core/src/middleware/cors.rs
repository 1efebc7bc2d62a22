//! CORS policy built from an `ALLOWED_ORIGIN` style setting.
//!
//! The setting is either `*` (any origin) or a comma-separated allow-list of
//! exact origins such as `https://app.example.com,http://localhost:3000`.

use axum::http::{header, HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Parsed origin policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    /// Parse the raw setting. Unset, blank and `*` all mean any origin.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("*") => return AllowedOrigins::Any,
            Some(raw) => raw,
        };

        let origins = raw
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| {
                if origin == "*" {
                    return None;
                }
                match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        // A wildcard anywhere in the list widens the policy.
        if raw.split(',').any(|origin| origin.trim() == "*") {
            return AllowedOrigins::Any;
        }

        if origins.is_empty() {
            tracing::warn!(setting = %raw, "No valid CORS origins configured; cross-origin requests will be refused");
        }

        AllowedOrigins::List(origins)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AllowedOrigins::Any)
    }

    #[cfg(test)]
    fn allows(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(list) => list.iter().any(|allowed| allowed == origin),
        }
    }
}

/// Build the CORS layer for the given origin policy.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(24 * 60 * 60));

    match origins {
        AllowedOrigins::Any => layer.allow_origin(Any),
        AllowedOrigins::List(list) => layer.allow_origin(AllowOrigin::list(list.clone())),
    }
}
