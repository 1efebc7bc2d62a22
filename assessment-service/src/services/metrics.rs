//! Prometheus metrics for assessment-service.
//!
//! Provides HTTP and provider-specific metrics for observability.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Assessment metrics
pub static ASSESSMENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static MOCK_FALLBACKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static IMAGES_RECEIVED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Provider metrics
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; only the first call
/// registers anything.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("Failed to create http_requests_total metric");

    let http_request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"],
    )
    .expect("Failed to create http_request_duration_seconds metric");

    // outcome: success, fallback, error
    let assessments_total = IntCounterVec::new(
        Opts::new("assessments_total", "Total assessment requests by outcome"),
        &["endpoint", "provider", "outcome"],
    )
    .expect("Failed to create assessments_total metric");

    let mock_fallbacks = IntCounterVec::new(
        Opts::new(
            "assessment_mock_fallbacks_total",
            "Mock results substituted for failed provider calls",
        ),
        &["endpoint", "error_type"],
    )
    .expect("Failed to create assessment_mock_fallbacks_total metric");

    let images_received = IntCounterVec::new(
        Opts::new("assessment_images_total", "Images accepted for assessment"),
        &["endpoint", "mime_type"],
    )
    .expect("Failed to create assessment_images_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "vision_provider_latency_seconds",
            "Vision provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create vision_provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("vision_provider_errors_total", "Total vision provider errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create vision_provider_errors_total metric");

    // type: input, output
    let provider_tokens = IntCounterVec::new(
        Opts::new("vision_provider_tokens_total", "Total tokens processed"),
        &["provider", "model", "type"],
    )
    .expect("Failed to create vision_provider_tokens_total metric");

    // Register all metrics
    registry
        .register(Box::new(http_requests_total.clone()))
        .expect("Failed to register http_requests_total");
    registry
        .register(Box::new(http_request_duration.clone()))
        .expect("Failed to register http_request_duration_seconds");
    registry
        .register(Box::new(assessments_total.clone()))
        .expect("Failed to register assessments_total");
    registry
        .register(Box::new(mock_fallbacks.clone()))
        .expect("Failed to register assessment_mock_fallbacks_total");
    registry
        .register(Box::new(images_received.clone()))
        .expect("Failed to register assessment_images_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register vision_provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register vision_provider_errors_total");
    registry
        .register(Box::new(provider_tokens.clone()))
        .expect("Failed to register vision_provider_tokens_total");

    // Initialize globals
    if REGISTRY.set(registry).is_err() {
        // Lost a race with a concurrent initializer; its metrics win.
        return;
    }
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(http_request_duration);
    let _ = ASSESSMENTS_TOTAL.set(assessments_total);
    let _ = MOCK_FALLBACKS_TOTAL.set(mock_fallbacks);
    let _ = IMAGES_RECEIVED_TOTAL.set(images_received);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = PROVIDER_TOKENS_TOTAL.set(provider_tokens);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter
            .with_label_values(&[method, path, status.as_str()])
            .inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Record the outcome of an assessment.
pub fn record_assessment(endpoint: &str, provider: &str, outcome: &str) {
    if let Some(counter) = ASSESSMENTS_TOTAL.get() {
        counter
            .with_label_values(&[endpoint, provider, outcome])
            .inc();
    }
}

/// Record a mock result substituted for a failed call.
pub fn record_mock_fallback(endpoint: &str, error_type: &str) {
    if let Some(counter) = MOCK_FALLBACKS_TOTAL.get() {
        counter.with_label_values(&[endpoint, error_type]).inc();
    }
}

/// Record an accepted image.
pub fn record_image(endpoint: &str, mime_type: &str) {
    if let Some(counter) = IMAGES_RECEIVED_TOTAL.get() {
        counter.with_label_values(&[endpoint, mime_type]).inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}

/// Record token usage.
pub fn record_tokens(provider: &str, model: &str, input_tokens: i32, output_tokens: i32) {
    if let Some(counter) = PROVIDER_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[provider, model, "input"])
            .inc_by(input_tokens.max(0) as u64);
        counter
            .with_label_values(&[provider, model, "output"])
            .inc_by(output_tokens.max(0) as u64);
    }
}
