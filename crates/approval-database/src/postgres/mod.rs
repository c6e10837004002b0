//! PostgreSQL implementation of the approval store.

mod entity;
pub mod store;
pub mod transaction;

pub use store::PgApprovalStore;
pub use transaction::PgApprovalTransaction;
