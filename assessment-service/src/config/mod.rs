use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::middleware::AllowedOrigins;
use std::env;
use std::str::FromStr;

/// Combined encoded size ceiling for a batch request (100MB).
pub const DEFAULT_MAX_BATCH_BYTES: usize = 100 * 1024 * 1024;

/// Ceiling for a single-image request body (20MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Upper bound on images accepted by the batch endpoint.
pub const MAX_BATCH_IMAGES: usize = 6;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub common: core_config::Config,
    pub provider: ProviderSelection,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub limits: LimitConfig,
    pub allowed_origin: Option<String>,
    pub mock_fallback: bool,
    pub otlp_endpoint: Option<String>,
}

/// Which vision backend answers assessment requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    /// Gemini when its key is present, otherwise OpenAI.
    Auto,
    OpenAi,
    Gemini,
    Mock,
}

impl FromStr for ProviderSelection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(ProviderSelection::Auto),
            "openai" | "gpt" => Ok(ProviderSelection::OpenAi),
            "gemini" | "google" => Ok(ProviderSelection::Gemini),
            "mock" => Ok(ProviderSelection::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown VISION_PROVIDER '{}' (expected auto, openai, gemini or mock)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Combined encoded image size ceiling for the batch endpoint.
    pub max_batch_bytes: usize,
    /// Request body ceiling for the single-image endpoint.
    pub max_upload_bytes: usize,
    /// Assessment requests per minute per client IP. 0 disables limiting.
    pub rate_limit_per_minute: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_per_minute: 30,
        }
    }
}

impl Default for AssessmentConfig {
    /// Local defaults: no API keys, provider auto-selection, stock limits.
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            provider: ProviderSelection::Auto,
            openai: OpenAiConfig {
                api_key: None,
                model: "gpt-4o".to_string(),
                api_base: OPENAI_API_BASE.to_string(),
                timeout_secs: 60,
            },
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                api_base: GEMINI_API_BASE.to_string(),
                timeout_secs: 60,
            },
            limits: LimitConfig::default(),
            allowed_origin: None,
            mock_fallback: true,
            otlp_endpoint: None,
        }
    }
}

impl AssessmentConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let timeout_secs = parse_env("PROVIDER_TIMEOUT_SECS", 60u64)?;

        Ok(AssessmentConfig {
            common: common_config,
            provider: get_env("VISION_PROVIDER", Some("auto"), false)?.parse()?,
            openai: OpenAiConfig {
                api_key: optional_secret("OPENAI_API_KEY"),
                model: get_env("OPENAI_VISION_MODEL", Some("gpt-4o"), is_prod)?,
                api_base: get_env("OPENAI_API_BASE", Some(OPENAI_API_BASE), false)?,
                timeout_secs,
            },
            gemini: GeminiConfig {
                api_key: optional_secret("GOOGLE_GENERATIVE_AI_API_KEY"),
                model: get_env("GEMINI_VISION_MODEL", Some("gemini-1.5-flash"), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE), false)?,
                timeout_secs,
            },
            limits: LimitConfig {
                max_batch_bytes: parse_env("ASSESSMENT_MAX_BATCH_BYTES", DEFAULT_MAX_BATCH_BYTES)?,
                max_upload_bytes: parse_env(
                    "ASSESSMENT_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                )?,
                rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 30u32)?,
            },
            allowed_origin: env::var("ALLOWED_ORIGIN").ok(),
            mock_fallback: match env::var("ASSESSMENT_MOCK_FALLBACK") {
                Ok(raw) => core_config::parse_bool(&raw).ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "ASSESSMENT_MOCK_FALLBACK must be a boolean, got '{}'",
                        raw
                    ))
                })?,
                Err(_) => true,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Resolve `auto` against the configured keys.
    pub fn active_provider(&self) -> ProviderSelection {
        match self.provider {
            ProviderSelection::Auto => {
                if has_key(&self.gemini.api_key) {
                    ProviderSelection::Gemini
                } else {
                    ProviderSelection::OpenAi
                }
            }
            other => other,
        }
    }

    pub fn allowed_origins(&self) -> AllowedOrigins {
        AllowedOrigins::parse(self.allowed_origin.as_deref())
    }
}

/// True when the secret is present and not blank.
pub fn has_key(key: &Option<Secret<String>>) -> bool {
    key.as_ref()
        .map(|k| !k.expose_secret().trim().is_empty())
        .unwrap_or(false)
}

fn optional_secret(key: &str) -> Option<Secret<String>> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Secret::new)
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
