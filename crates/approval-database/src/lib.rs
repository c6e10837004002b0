//! # approval-database
//!
//! Persistence for approval records and the entities they govern.
//! [`store`] defines the transactional seam the workflow runs against;
//! [`postgres`] implements it on sqlx, [`memory`] in process.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryApprovalStore;
pub use postgres::PgApprovalStore;
pub use store::{ApprovalStore, ApprovalTransaction, StatusCounts};
