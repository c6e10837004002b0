//! Storage seam for approval records and the entities they govern.
//!
//! Every state change runs inside one [`ApprovalTransaction`]: the
//! approval record, any conflicting records it retires, and the entity
//! row it materializes are committed together or not at all.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, PageRequest, PageResponse, TargetId};
use approval_entity::approval::{ApprovalFilter, ApprovalRecord, ApprovalStatus, NewApproval};
use approval_entity::schema::{EntitySchema, FieldMap};

/// A unit of work against the store.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls
/// back everything it wrote.
#[async_trait]
pub trait ApprovalTransaction: Send {
    /// Read an approval record and lock it until the transaction ends.
    async fn lock_approval(&mut self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>>;

    /// Read and lock every pending record for a target, oldest first.
    async fn lock_pending_for_target(
        &mut self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>>;

    /// Insert a new pending record.
    async fn insert_approval(&mut self, data: NewApproval) -> AppResult<ApprovalRecord>;

    /// Persist the mutable columns of an existing record.
    async fn save_approval(&mut self, record: &ApprovalRecord) -> AppResult<()>;

    /// Load the current field values of an entity.
    async fn fetch_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
    ) -> AppResult<Option<FieldMap>>;

    /// Insert an entity row and return its new identifier.
    async fn create_entity(&mut self, schema: &EntitySchema, fields: &FieldMap)
    -> AppResult<TargetId>;

    /// Overwrite the given fields of an entity. Returns `false` if it does not exist.
    async fn update_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
        fields: &FieldMap,
    ) -> AppResult<bool>;

    /// Delete an entity. Returns `false` if it did not exist.
    async fn delete_entity(&mut self, schema: &EntitySchema, id: TargetId) -> AppResult<bool>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Record counts per decision status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Records awaiting review.
    pub pending: u64,
    /// Approved records.
    pub approved: u64,
    /// Rejected records.
    pub rejected: u64,
}

impl StatusCounts {
    /// Add one record of `status`.
    pub fn add(&mut self, status: ApprovalStatus, count: u64) {
        match status {
            ApprovalStatus::Pending => self.pending += count,
            ApprovalStatus::Approved => self.approved += count,
            ApprovalStatus::Rejected => self.rejected += count,
        }
    }

    /// Total across all statuses.
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

/// Persistent store of approval records.
///
/// Read methods see committed state only.
#[async_trait]
pub trait ApprovalStore: fmt::Debug + Send + Sync + 'static {
    /// Open a transaction.
    async fn begin(&self) -> AppResult<Box<dyn ApprovalTransaction>>;

    /// Find a record by ID.
    async fn find_by_id(&self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>>;

    /// Pending records for a target, ordered by creation time ascending.
    async fn find_pending_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>>;

    /// Every record that ever referenced a target, ordered by creation time.
    async fn find_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>>;

    /// One page of records matching `filter`.
    ///
    /// Ordered by target type, target id (creations first), creation time
    /// and id, so repeated queries page through the same sequence.
    async fn find_by_filter(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ApprovalRecord>>;

    /// Record counts per status, optionally for one entity type.
    async fn count_by_status(&self, target_type: Option<&str>) -> AppResult<StatusCounts>;
}
