//! Approval state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use approval_core::config::ApprovalConfig;
use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, TargetId, UserId};
use approval_database::store::{ApprovalStore, ApprovalTransaction};
use approval_entity::approval::{ApprovalAction, ApprovalRecord};
use approval_entity::schema::{EntitySchema, FieldMap};
use approval_entity::snapshot::SnapshotCodec;

use crate::context::ActorContext;

/// Moves pending approval records to a terminal state.
///
/// Each decision runs in one store transaction: the record, the entity
/// write and any conflicting records retired by it commit together.
#[derive(Debug, Clone)]
pub struct WorkflowService {
    /// Approval and entity persistence.
    store: Arc<dyn ApprovalStore>,
    /// Snapshot codec (owns the schema registry).
    codec: Arc<SnapshotCodec>,
    /// Maximum comment length after reviewer remarks are appended.
    max_comment_length: usize,
}

impl WorkflowService {
    /// Creates a new workflow service.
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        codec: Arc<SnapshotCodec>,
        config: &ApprovalConfig,
    ) -> Self {
        Self {
            store,
            codec,
            max_comment_length: config.max_comment_length,
        }
    }

    /// Approves a pending record and materializes its change.
    ///
    /// Approving an update rejects every other pending record for the same
    /// target on behalf of the same reviewer.
    pub async fn approve(
        &self,
        ctx: &ActorContext,
        approval_id: ApprovalId,
        remark: Option<&str>,
    ) -> AppResult<ApprovalRecord> {
        let actor = ctx.require_user()?;
        let mut tx = self.store.begin().await?;
        let mut record = self.lock_pending(tx.as_mut(), approval_id, remark).await?;
        let now = Utc::now();

        let target_id = match record.action {
            ApprovalAction::Create => {
                let (schema, fields) = self.decode_record(&record)?;
                Some(tx.create_entity(&schema, &fields).await?)
            }
            ApprovalAction::Update => {
                let target_id = require_target(&record)?;
                let (schema, fields) = self.decode_record(&record)?;
                if !tx.update_entity(&schema, target_id, &fields).await? {
                    return Err(target_missing(&record, target_id));
                }
                Some(target_id)
            }
            ApprovalAction::Delete => {
                let target_id = require_target(&record)?;
                let schema = self.schema_for(&record)?;
                if !tx.delete_entity(&schema, target_id).await? {
                    return Err(target_missing(&record, target_id));
                }
                None
            }
        };

        record.mark_approved(actor, target_id, now)?;
        tx.save_approval(&record).await?;

        let retired = match (record.action, target_id) {
            (ApprovalAction::Update, Some(target_id)) => {
                retire_conflicts(tx.as_mut(), &record, target_id, actor, now).await?
            }
            _ => 0,
        };

        tx.commit().await?;

        info!(
            approval_id = %record.id,
            target_type = %record.target_type,
            action = %record.action,
            target_id = ?record.target_id,
            actor = %actor,
            retired,
            "Approval approved"
        );

        Ok(record)
    }

    /// Rejects a pending record. The target entity is not touched.
    pub async fn reject(
        &self,
        ctx: &ActorContext,
        approval_id: ApprovalId,
        remark: Option<&str>,
    ) -> AppResult<ApprovalRecord> {
        let actor = ctx.require_user()?;
        let mut tx = self.store.begin().await?;
        let mut record = self.lock_pending(tx.as_mut(), approval_id, remark).await?;

        record.mark_rejected(actor, Utc::now())?;
        tx.save_approval(&record).await?;
        tx.commit().await?;

        info!(
            approval_id = %record.id,
            target_type = %record.target_type,
            action = %record.action,
            actor = %actor,
            "Approval rejected"
        );

        Ok(record)
    }

    async fn lock_pending(
        &self,
        tx: &mut dyn ApprovalTransaction,
        approval_id: ApprovalId,
        remark: Option<&str>,
    ) -> AppResult<ApprovalRecord> {
        let mut record = tx
            .lock_approval(approval_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Approval {approval_id} not found")))?;
        record.ensure_pending()?;

        if let Some(remark) = remark {
            record.append_comment(remark);
            let too_long = record
                .comment
                .as_ref()
                .is_some_and(|c| c.chars().count() > self.max_comment_length);
            if too_long {
                return Err(AppError::validation(format!(
                    "Comment exceeds {} characters",
                    self.max_comment_length
                )));
            }
        }
        Ok(record)
    }

    fn schema_for(&self, record: &ApprovalRecord) -> AppResult<Arc<EntitySchema>> {
        self.codec
            .registry()
            .resolve(&record.target_type)
            .ok_or_else(|| {
                AppError::inconsistent_state(format!(
                    "Approval {} targets unregistered type {}",
                    record.id, record.target_type
                ))
            })
    }

    fn decode_record(&self, record: &ApprovalRecord) -> AppResult<(Arc<EntitySchema>, FieldMap)> {
        let raw = record.snapshot.as_ref().ok_or_else(|| {
            AppError::malformed_snapshot(format!("Approval {} has no snapshot", record.id))
        })?;

        let decoded = self.codec.decode(raw).inspect_err(|e| {
            warn!(approval_id = %record.id, error = %e, "Snapshot could not be decoded");
        })?;
        if decoded.entity_type != record.target_type {
            return Err(AppError::malformed_snapshot(format!(
                "Approval {} snapshot holds a {}, expected {}",
                record.id, decoded.entity_type, record.target_type
            )));
        }

        let schema = self.schema_for(record)?;
        Ok((schema, decoded.fields))
    }
}

fn require_target(record: &ApprovalRecord) -> AppResult<TargetId> {
    record.target_id.ok_or_else(|| {
        AppError::inconsistent_state(format!(
            "Approval {} requests {} without a target id",
            record.id, record.action
        ))
    })
}

fn target_missing(record: &ApprovalRecord, target_id: TargetId) -> AppError {
    AppError::not_found(format!(
        "{} {target_id} targeted by approval {} no longer exists",
        record.target_type, record.id
    ))
}

/// Reject every other pending record for the approved update's target.
async fn retire_conflicts(
    tx: &mut dyn ApprovalTransaction,
    approved: &ApprovalRecord,
    target_id: TargetId,
    actor: UserId,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    let conflicting = tx
        .lock_pending_for_target(&approved.target_type, target_id)
        .await?;

    let mut retired = 0;
    for mut other in conflicting.into_iter().filter(|r| r.id != approved.id) {
        other.mark_rejected(actor, now)?;
        tx.save_approval(&other).await?;
        retired += 1;
    }
    Ok(retired)
}
