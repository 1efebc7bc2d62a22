//! Domain models for the assessment service.

pub mod assessment;
pub mod request;

pub use assessment::{
    Assessment, BatchAssessment, ProgressionAnalysis, RiskLevel, TechnicalMetrics, Trend,
};
pub use request::{AssessRequest, BatchAssessRequest, ImageInput};
