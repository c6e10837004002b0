//! Review queue listings.

pub mod service;

pub use service::QueryService;
