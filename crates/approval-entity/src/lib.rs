//! # approval-entity
//!
//! Domain models for the approval workflow. [`approval`] holds the
//! persisted approval record and its enums; [`schema`] describes the
//! application entity types that opt into review; [`snapshot`] turns
//! proposed entity state into a portable JSON blob and back.

pub mod approvable;
pub mod approval;
pub mod schema;
pub mod snapshot;

pub use approvable::Approvable;
pub use approval::{
    ApprovalAction, ApprovalFilter, ApprovalRecord, ApprovalStatus, NewApproval,
};
pub use schema::{EntitySchema, FieldDef, FieldKind, FieldMap, FieldValue, SchemaRegistry};
pub use snapshot::{DecodedSnapshot, SnapshotCodec};
