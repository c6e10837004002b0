//! Wiring of the approval services behind one handle.

use std::sync::Arc;

use tracing::info;

use approval_core::config::{AppConfig, ApprovalConfig};
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, PageRequest, PageResponse, TargetId};
use approval_database::{ApprovalStore, DatabasePool, PgApprovalStore};
use approval_entity::{Approvable, ApprovalFilter, ApprovalRecord, SchemaRegistry, SnapshotCodec};
use approval_service::{
    ActorContext, ChangeRequest, PolicyRegistry, QueryService, SubmissionOutcome,
    SubmissionService, WorkflowService,
};

/// The approval workflow, assembled.
///
/// Services are shared through `Arc`, so cloning the engine is cheap.
#[derive(Debug, Clone)]
pub struct ApprovalEngine {
    codec: Arc<SnapshotCodec>,
    store: Arc<dyn ApprovalStore>,
    submission: SubmissionService,
    workflow: WorkflowService,
    query: QueryService,
}

impl ApprovalEngine {
    /// Connect to PostgreSQL and build the engine.
    pub async fn connect(
        config: &AppConfig,
        registry: SchemaRegistry,
        policies: PolicyRegistry,
    ) -> AppResult<Self> {
        let db = DatabasePool::connect(&config.database).await?;
        let store = Arc::new(PgApprovalStore::from_database(&db));
        Ok(Self::with_store(store, &config.approval, registry, policies))
    }

    /// Build the engine over an existing store.
    pub fn with_store(
        store: Arc<dyn ApprovalStore>,
        config: &ApprovalConfig,
        registry: SchemaRegistry,
        policies: PolicyRegistry,
    ) -> Self {
        info!(
            entity_types = ?registry.entity_types(),
            "Initializing approval engine"
        );

        let codec = Arc::new(SnapshotCodec::new(Arc::new(registry)));
        let policies = Arc::new(policies);

        Self {
            submission: SubmissionService::new(store.clone(), codec.clone(), policies, config),
            workflow: WorkflowService::new(store.clone(), codec.clone(), config),
            query: QueryService::new(store.clone(), codec.clone(), config),
            codec,
            store,
        }
    }

    /// The snapshot codec and its schema registry.
    pub fn codec(&self) -> &SnapshotCodec {
        &self.codec
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ApprovalStore> {
        &self.store
    }

    pub fn submission(&self) -> &SubmissionService {
        &self.submission
    }

    pub fn workflow(&self) -> &WorkflowService {
        &self.workflow
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    /// Submit a write attempt.
    pub async fn submit(
        &self,
        ctx: &ActorContext,
        request: ChangeRequest,
    ) -> AppResult<SubmissionOutcome> {
        self.submission.submit(ctx, request).await
    }

    /// Approve a pending record.
    pub async fn approve(
        &self,
        ctx: &ActorContext,
        approval_id: ApprovalId,
    ) -> AppResult<ApprovalRecord> {
        self.workflow.approve(ctx, approval_id, None).await
    }

    /// Reject a pending record.
    pub async fn reject(
        &self,
        ctx: &ActorContext,
        approval_id: ApprovalId,
    ) -> AppResult<ApprovalRecord> {
        self.workflow.reject(ctx, approval_id, None).await
    }

    /// List pending records, optionally for one type and target.
    pub async fn list_pending(
        &self,
        target_type: Option<&str>,
        target_id: Option<TargetId>,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        self.query.list_pending(target_type, target_id, None).await
    }

    /// List records matching a filter.
    pub async fn list_by_filter(
        &self,
        filter: &ApprovalFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        self.query.list_by_filter(filter, Some(page)).await
    }

    /// Every record that referenced a typed entity.
    pub async fn approvals_for<T: Approvable>(
        &self,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        self.query.approvals_for::<T>(target_id).await
    }
}
