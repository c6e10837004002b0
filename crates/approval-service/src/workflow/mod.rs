//! Review decisions: approve and reject.

pub mod service;

pub use service::WorkflowService;
