//! Document submissions and their upload requirements.

mod repository;
mod types;

pub use repository::{RequirementRepository, SubmissionRepository};
pub use types::{
    effective_status, DocumentRequirement, DocumentSubmission, DocumentType, NewRequirement,
    SubmissionStatus,
};
