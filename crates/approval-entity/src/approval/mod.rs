//! Approval record domain entities.

pub mod action;
pub mod filter;
pub mod model;
pub mod status;

pub use action::ApprovalAction;
pub use filter::ApprovalFilter;
pub use model::{ApprovalRecord, NewApproval};
pub use status::ApprovalStatus;
