//! Submission intercept: diverts entity writes into pending approvals.

pub mod request;
pub mod service;

pub use request::{ChangeRequest, SubmissionOutcome};
pub use service::SubmissionService;
