//! Assessment result shapes exchanged with the vision model and the client.
//!
//! The model fills the analytical fields; `isMockResult`, `provider`, `model`
//! and `analyzedAt` are always stamped by the server after validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Severity label returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image-derived measurements reported alongside the risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetrics {
    /// Overall usability of the photo for assessment (0-100).
    #[validate(range(min = 0.0, max = 100.0))]
    pub image_quality: f64,

    /// Clarity of the pupil region (0-100).
    #[validate(range(min = 0.0, max = 100.0))]
    pub pupil_clarity: f64,

    /// Estimated lens opacity (0-100, higher is more clouded).
    #[validate(range(min = 0.0, max = 100.0))]
    pub lens_opacity: f64,

    /// Visible redness of the sclera (0-10).
    #[validate(range(min = 0.0, max = 10.0))]
    pub sclera_redness: f64,

    /// Left/right or image-to-image symmetry (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub symmetry_score: Option<f64>,
}

/// A single assessment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub risk_level: RiskLevel,

    #[validate(length(min = 1, max = 4000))]
    pub explanation: String,

    /// Model confidence (0.0-1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    #[validate(length(max = 20))]
    pub findings: Vec<String>,

    #[validate(length(max = 20))]
    pub recommendations: Vec<String>,

    #[validate(nested)]
    pub technical_metrics: TechnicalMetrics,

    #[serde(default)]
    pub is_mock_result: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    /// Stamp the server-owned fields.
    pub fn stamp(&mut self, provider: &str, model: &str, is_mock: bool) {
        self.provider = Some(provider.to_string());
        self.model = Some(model.to_string());
        self.is_mock_result = is_mock;
        self.analyzed_at = Some(Utc::now());
    }
}

/// Direction of change across a chronological series of photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
    Inconclusive,
}

/// Progression block attached to batch results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionAnalysis {
    pub trend: Trend,

    #[validate(length(min = 1, max = 4000))]
    pub summary: String,

    /// How consistent the images are with one another (0.0-1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    pub consistency_score: f64,

    /// Number of images the analysis covers. Set by the server.
    #[serde(default)]
    pub images_analyzed: usize,
}

impl ProgressionAnalysis {
    /// Apply the server-side invariants for `image_count` accepted images.
    pub fn normalize(&mut self, image_count: usize) {
        self.images_analyzed = image_count;
        if image_count < 2 {
            self.trend = Trend::Inconclusive;
        }
    }
}

/// Batch result: the combined assessment plus the progression block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchAssessment {
    #[serde(flatten)]
    #[validate(nested)]
    pub assessment: Assessment,

    #[validate(nested)]
    pub progression_analysis: ProgressionAnalysis,
}
