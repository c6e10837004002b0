//! # approval-service
//!
//! Use cases of the approval workflow. Services follow constructor
//! injection: the store, codec and policies are handed in as `Arc`s.
//!
//! - [`SubmissionService`] diverts writes into pending records.
//! - [`WorkflowService`] approves or rejects them.
//! - [`QueryService`] serves the review queue.

pub mod context;
pub mod policy;
pub mod query;
pub mod submission;
pub mod workflow;

pub use context::ActorContext;
pub use policy::PolicyRegistry;
pub use query::QueryService;
pub use submission::{ChangeRequest, SubmissionOutcome, SubmissionService};
pub use workflow::WorkflowService;
