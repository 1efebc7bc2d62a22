pub mod assessment;
pub mod classify;
pub mod image;
pub mod metrics;
pub mod mock_data;
pub mod prompts;
pub mod providers;
pub mod validation;

pub use assessment::{AssessmentFailure, AssessmentService, MockResult, SubjectContext};
pub use classify::ErrorKind;
