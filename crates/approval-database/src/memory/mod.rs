//! In-process implementation of [`ApprovalStore`].
//!
//! All state sits behind one `tokio::sync::Mutex`. A transaction holds the
//! lock for its whole lifetime and works on a private copy of the state,
//! which replaces the shared state on commit. Transactions are therefore
//! fully serialized and a dropped transaction leaves no trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, PageRequest, PageResponse, TargetId};
use approval_entity::approval::{ApprovalFilter, ApprovalRecord, NewApproval};
use approval_entity::schema::{EntitySchema, FieldMap};

use crate::store::{ApprovalStore, ApprovalTransaction, StatusCounts};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    approvals: BTreeMap<ApprovalId, ApprovalRecord>,
    /// Table name → rows.
    entities: HashMap<String, BTreeMap<TargetId, FieldMap>>,
}

impl MemoryState {
    fn for_target<'a>(
        &'a self,
        target_type: &'a str,
        target_id: TargetId,
    ) -> impl Iterator<Item = &'a ApprovalRecord> + 'a {
        self.approvals
            .values()
            .filter(move |r| r.target_type == target_type && r.target_id == Some(target_id))
    }
}

/// Store keeping approvals and entity rows in memory.
///
/// Useful for tests and for embedding the workflow without a database.
#[derive(Debug, Clone, Default)]
pub struct MemoryApprovalStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryApprovalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an entity row directly.
    pub async fn entity(&self, schema: &EntitySchema, id: TargetId) -> Option<FieldMap> {
        let state = self.state.lock().await;
        state
            .entities
            .get(&schema.table)
            .and_then(|rows| rows.get(&id))
            .cloned()
    }

    /// Number of rows stored for an entity type.
    pub async fn entity_count(&self, schema: &EntitySchema) -> usize {
        let state = self.state.lock().await;
        state.entities.get(&schema.table).map_or(0, BTreeMap::len)
    }

    /// Insert an entity row outside the workflow.
    pub async fn seed_entity(&self, schema: &EntitySchema, fields: FieldMap) -> TargetId {
        let id = TargetId::new();
        let mut state = self.state.lock().await;
        state
            .entities
            .entry(schema.table.clone())
            .or_default()
            .insert(id, fields);
        id
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn begin(&self) -> AppResult<Box<dyn ApprovalTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn find_by_id(&self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>> {
        let state = self.state.lock().await;
        Ok(state.approvals.get(&id).cloned())
    }

    async fn find_pending_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        let state = self.state.lock().await;
        Ok(pending_oldest_first(&state, target_type, target_id))
    }

    async fn find_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<ApprovalRecord> =
            state.for_target(target_type, target_id).cloned().collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        Ok(records)
    }

    async fn find_by_filter(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<ApprovalRecord> = state
            .approvals
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (&a.target_type, a.target_id, a.created_at, a.id)
                .cmp(&(&b.target_type, b.target_id, b.created_at, b.id))
        });
        Ok(PageResponse::from_ordered(records, page))
    }

    async fn count_by_status(&self, target_type: Option<&str>) -> AppResult<StatusCounts> {
        let state = self.state.lock().await;
        let mut counts = StatusCounts::default();
        state
            .approvals
            .values()
            .filter(|r| target_type.is_none_or(|t| t == r.target_type))
            .for_each(|r| counts.add(r.status, 1));
        Ok(counts)
    }
}

fn pending_oldest_first(
    state: &MemoryState,
    target_type: &str,
    target_id: TargetId,
) -> Vec<ApprovalRecord> {
    let mut records: Vec<ApprovalRecord> = state
        .for_target(target_type, target_id)
        .filter(|r| r.is_pending())
        .cloned()
        .collect();
    records.sort_by_key(|r| (r.created_at, r.id));
    records
}

/// Transaction over a private copy of the store state.
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTransaction {
    fn rows(&mut self, schema: &EntitySchema) -> &mut BTreeMap<TargetId, FieldMap> {
        self.working
            .entities
            .entry(schema.table.clone())
            .or_default()
    }
}

#[async_trait]
impl ApprovalTransaction for MemoryTransaction {
    async fn lock_approval(&mut self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>> {
        Ok(self.working.approvals.get(&id).cloned())
    }

    async fn lock_pending_for_target(
        &mut self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        Ok(pending_oldest_first(&self.working, target_type, target_id))
    }

    async fn insert_approval(&mut self, data: NewApproval) -> AppResult<ApprovalRecord> {
        let record = data.into_record(Utc::now());
        self.working.approvals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save_approval(&mut self, record: &ApprovalRecord) -> AppResult<()> {
        match self.working.approvals.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Approval {} not found",
                record.id
            ))),
        }
    }

    async fn fetch_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
    ) -> AppResult<Option<FieldMap>> {
        Ok(self
            .working
            .entities
            .get(&schema.table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    async fn create_entity(
        &mut self,
        schema: &EntitySchema,
        fields: &FieldMap,
    ) -> AppResult<TargetId> {
        let id = TargetId::new();
        self.rows(schema).insert(id, fields.clone());
        Ok(id)
    }

    async fn update_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
        fields: &FieldMap,
    ) -> AppResult<bool> {
        let Some(row) = self.rows(schema).get_mut(&id) else {
            return Ok(false);
        };
        row.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(true)
    }

    async fn delete_entity(&mut self, schema: &EntitySchema, id: TargetId) -> AppResult<bool> {
        Ok(self.rows(schema).remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        debug!("Memory transaction committed");
        Ok(())
    }
}
