//! Core traits defined in `approval-core` and implemented by other crates.

pub mod policy;

pub use policy::{AlwaysRequireApproval, ApprovalPolicy, NeverRequireApproval};
