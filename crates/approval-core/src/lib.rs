//! # approval-core
//!
//! Core crate for the approval workflow. Contains configuration schemas,
//! typed identifiers, pagination types, the approval policy trait,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other workflow crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
