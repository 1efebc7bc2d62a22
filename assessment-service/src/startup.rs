//! Application startup and lifecycle management.

use crate::config::{AssessmentConfig, ProviderSelection};
use crate::handlers::{
    assess::assess_eyes,
    batch::assess_eyes_batch,
    health::{health_check, test_gemini},
    metrics::metrics,
    not_found,
};
use crate::middleware::http_metrics_middleware;
use crate::services::providers::{
    gemini::GeminiVisionProvider, mock::MockVisionProvider, openai::OpenAiVisionProvider,
    ProviderError, VisionProvider,
};
use crate::services::AssessmentService;
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors_layer, create_ip_rate_limiter, ip_rate_limit_middleware, request_id_middleware,
    security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Headroom above the batch ceiling so the handler, not the body limit,
/// reports oversized batches.
const BATCH_BODY_HEADROOM: usize = 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AssessmentConfig>,
    pub assessments: AssessmentService,
    /// Gemini client used by the connectivity probe, whatever the active provider.
    pub gemini: Arc<dyn VisionProvider>,
}

impl AppState {
    /// Build state with the providers selected by `config`.
    pub fn from_config(config: AssessmentConfig) -> Result<Self, AppError> {
        let gemini: Arc<dyn VisionProvider> =
            Arc::new(GeminiVisionProvider::new(config.gemini.clone()).map_err(provider_setup)?);

        let provider: Arc<dyn VisionProvider> = match config.active_provider() {
            ProviderSelection::Gemini | ProviderSelection::Auto => gemini.clone(),
            ProviderSelection::OpenAi => Arc::new(
                OpenAiVisionProvider::new(config.openai.clone()).map_err(provider_setup)?,
            ),
            ProviderSelection::Mock => Arc::new(MockVisionProvider::catalogue()),
        };

        if !provider.is_configured() {
            tracing::warn!(
                provider = provider.name(),
                "Vision provider has no API key; assessments will fail over to mock results"
            );
        }

        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "Initialized vision provider"
        );

        Ok(Self::with_providers(config, provider, gemini))
    }

    /// Build state around explicit providers.
    pub fn with_providers(
        config: AssessmentConfig,
        provider: Arc<dyn VisionProvider>,
        gemini: Arc<dyn VisionProvider>,
    ) -> Self {
        let assessments = AssessmentService::new(provider, config.mock_fallback);
        Self {
            config: Arc::new(config),
            assessments,
            gemini,
        }
    }
}

fn provider_setup(err: ProviderError) -> AppError {
    AppError::ConfigError(anyhow::anyhow!("Failed to initialize vision provider: {}", err))
}

pub fn build_router(state: AppState) -> Router {
    let limits = state.config.limits.clone();
    let origins = state.config.allowed_origins();

    if origins.is_any() {
        tracing::info!("CORS allows any origin");
    }

    let mut assessment_routes = Router::new()
        .route(
            "/api/assess-eyes",
            post(assess_eyes).layer(DefaultBodyLimit::max(limits.max_upload_bytes)),
        )
        .route(
            "/api/assess-eyes-batch",
            post(assess_eyes_batch).layer(DefaultBodyLimit::max(
                limits.max_batch_bytes.saturating_add(BATCH_BODY_HEADROOM),
            )),
        );

    if limits.rate_limit_per_minute > 0 {
        let limiter = create_ip_rate_limiter(limits.rate_limit_per_minute, 60);
        assessment_routes =
            assessment_routes.layer(from_fn_with_state(limiter, ip_rate_limit_middleware));
    }

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/test-gemini", get(test_gemini))
        .route("/metrics", get(metrics))
        .merge(assessment_routes)
        .fallback(not_found)
        .layer(from_fn(http_metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&origins))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: AssessmentConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config)?;
        Self::with_state(state).await
    }

    /// Build the application around prepared state. Port 0 binds a random port.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Assessment service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
