//! Snapshot codec: proposed entity state as a portable JSON document.

pub mod codec;
pub mod diff;

pub use codec::{DecodedSnapshot, Snapshot, SnapshotCodec};
pub use diff::describe_changes;
