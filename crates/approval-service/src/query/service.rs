//! Review queue and reverse lookup.

use std::sync::Arc;

use approval_core::config::ApprovalConfig;
use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, PageRequest, PageResponse, TargetId};
use approval_database::store::{ApprovalStore, StatusCounts};
use approval_entity::Approvable;
use approval_entity::approval::{ApprovalFilter, ApprovalRecord};
use approval_entity::snapshot::SnapshotCodec;

/// Read-only access to approval records.
#[derive(Debug, Clone)]
pub struct QueryService {
    /// Approval persistence.
    store: Arc<dyn ApprovalStore>,
    /// Snapshot codec, for presenting proposed entities.
    codec: Arc<SnapshotCodec>,
    /// Page size used when the caller gives none.
    default_page_size: u64,
}

impl QueryService {
    /// Creates a new query service.
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        codec: Arc<SnapshotCodec>,
        config: &ApprovalConfig,
    ) -> Self {
        Self {
            store,
            codec,
            default_page_size: config.default_page_size,
        }
    }

    /// Fetches one record.
    pub async fn get(&self, approval_id: ApprovalId) -> AppResult<ApprovalRecord> {
        self.store
            .find_by_id(approval_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Approval {approval_id} not found")))
    }

    /// Lists pending records, optionally narrowed to a type and target.
    pub async fn list_pending(
        &self,
        target_type: Option<&str>,
        target_id: Option<TargetId>,
        page: Option<PageRequest>,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        let mut filter = ApprovalFilter::pending();
        filter.target_type = target_type.map(str::to_string);
        filter.target_id = target_id;
        self.list_by_filter(&filter, page).await
    }

    /// Lists records matching `filter` in review-queue order.
    pub async fn list_by_filter(
        &self,
        filter: &ApprovalFilter,
        page: Option<PageRequest>,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        let page = page.unwrap_or_else(|| PageRequest::first(self.default_page_size));
        self.store.find_by_filter(filter, &page).await
    }

    /// Pending records for one target, oldest first.
    pub async fn pending_for(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        self.store.find_pending_for_target(target_type, target_id).await
    }

    /// Every record that ever referenced a typed entity, oldest first.
    pub async fn approvals_for<T: Approvable>(
        &self,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        self.store.find_for_target(T::ENTITY_TYPE, target_id).await
    }

    /// Rebuilds the entity a create or update record proposes.
    pub fn proposed_entity<T: Approvable>(&self, record: &ApprovalRecord) -> AppResult<T> {
        let raw = record.snapshot.as_ref().ok_or_else(|| {
            AppError::malformed_snapshot(format!("Approval {} has no snapshot", record.id))
        })?;
        let (_, entity) = self.codec.decode_entity::<T>(raw)?;
        Ok(entity)
    }

    /// Record counts per status.
    pub async fn counts(&self, target_type: Option<&str>) -> AppResult<StatusCounts> {
        self.store.count_by_status(target_type).await
    }
}
