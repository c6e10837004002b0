//! Submission service.

use std::sync::Arc;

use tracing::info;

use approval_core::config::ApprovalConfig;
use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::TargetId;
use approval_database::store::{ApprovalStore, ApprovalTransaction};
use approval_entity::approval::{ApprovalAction, NewApproval};
use approval_entity::schema::{EntitySchema, FieldMap, canonical_fields};
use approval_entity::snapshot::{SnapshotCodec, describe_changes};
use approval_entity::Approvable;

use super::request::{ChangeRequest, SubmissionOutcome};
use crate::context::ActorContext;
use crate::policy::PolicyRegistry;

/// Intercepts writes to registered entity types.
///
/// When the policy for the type asks for review, the proposed state is
/// snapshotted into a pending approval record and returned in place of the
/// entity. Otherwise the write is applied directly.
#[derive(Debug, Clone)]
pub struct SubmissionService {
    /// Approval and entity persistence.
    store: Arc<dyn ApprovalStore>,
    /// Snapshot codec (owns the schema registry).
    codec: Arc<SnapshotCodec>,
    /// Per-type approval policies.
    policies: Arc<PolicyRegistry>,
    /// Maximum comment length.
    max_comment_length: usize,
}

impl SubmissionService {
    /// Creates a new submission service.
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        codec: Arc<SnapshotCodec>,
        policies: Arc<PolicyRegistry>,
        config: &ApprovalConfig,
    ) -> Self {
        Self {
            store,
            codec,
            policies,
            max_comment_length: config.max_comment_length,
        }
    }

    /// Submits a create (`target_id` absent) or update (`target_id` given).
    ///
    /// Updates may carry a subset of fields; the rest keep their current
    /// values.
    pub async fn submit_change(
        &self,
        ctx: &ActorContext,
        entity_type: &str,
        target_id: Option<TargetId>,
        fields: FieldMap,
        comment: Option<String>,
    ) -> AppResult<SubmissionOutcome> {
        let schema = self.codec.registry().require(entity_type)?;
        let fields = canonical_fields(fields);
        schema.validate(&fields, target_id.is_some())?;
        self.check_comment(comment.as_deref())?;

        match target_id {
            None => self.submit_create(ctx, &schema, fields, comment).await,
            Some(id) => self.submit_update(ctx, &schema, id, fields, comment).await,
        }
    }

    /// Submits the removal of an existing entity.
    pub async fn submit_delete(
        &self,
        ctx: &ActorContext,
        entity_type: &str,
        target_id: TargetId,
        comment: Option<String>,
    ) -> AppResult<SubmissionOutcome> {
        let schema = self.codec.registry().require(entity_type)?;
        self.check_comment(comment.as_deref())?;

        let mut tx = self.store.begin().await?;
        let current = load_target(tx.as_mut(), &schema, target_id).await?;

        if self.policies.needs_approval(entity_type, ctx.identity()) {
            let data = NewApproval {
                target_type: schema.entity_type.clone(),
                target_id: Some(target_id),
                action: ApprovalAction::Delete,
                snapshot: None,
                diff: None,
                comment,
                requested_by: ctx.user_id,
            };
            return self.persist_pending(tx, data).await;
        }

        tx.delete_entity(&schema, target_id).await?;
        tx.commit().await?;

        info!(
            entity_type = %schema.entity_type,
            target_id = %target_id,
            "Delete applied without review"
        );

        Ok(SubmissionOutcome::Applied {
            entity_type: schema.entity_type.clone(),
            action: ApprovalAction::Delete,
            target_id,
            fields: current,
        })
    }

    /// Submits a request with an explicit action.
    ///
    /// The action must agree with the presence of a target id.
    pub async fn submit(
        &self,
        ctx: &ActorContext,
        request: ChangeRequest,
    ) -> AppResult<SubmissionOutcome> {
        let ChangeRequest {
            entity_type,
            action,
            target_id,
            fields,
            comment,
        } = request;

        match (action, target_id) {
            (ApprovalAction::Create, None) => {
                self.submit_change(ctx, &entity_type, None, fields, comment)
                    .await
            }
            (ApprovalAction::Create, Some(_)) => Err(AppError::validation(
                "A create request must not reference an existing target",
            )),
            (ApprovalAction::Update, Some(id)) => {
                self.submit_change(ctx, &entity_type, Some(id), fields, comment)
                    .await
            }
            (ApprovalAction::Delete, Some(id)) => {
                if !fields.is_empty() {
                    return Err(AppError::validation(
                        "A delete request carries no field values",
                    ));
                }
                self.submit_delete(ctx, &entity_type, id, comment).await
            }
            (action, None) => Err(AppError::validation(format!(
                "A target id is required for {action} requests"
            ))),
        }
    }

    /// Submits a typed entity as a create or update.
    pub async fn submit_entity<T: Approvable>(
        &self,
        ctx: &ActorContext,
        entity: &T,
        target_id: Option<TargetId>,
        comment: Option<String>,
    ) -> AppResult<SubmissionOutcome> {
        let fields = self.codec.fields_of(entity)?;
        self.submit_change(ctx, T::ENTITY_TYPE, target_id, fields, comment)
            .await
    }

    async fn submit_create(
        &self,
        ctx: &ActorContext,
        schema: &EntitySchema,
        fields: FieldMap,
        comment: Option<String>,
    ) -> AppResult<SubmissionOutcome> {
        let mut tx = self.store.begin().await?;

        if self.policies.needs_approval(&schema.entity_type, ctx.identity()) {
            let snapshot = self.codec.encode(&schema.entity_type, None, &fields)?;
            let data = NewApproval {
                target_type: schema.entity_type.clone(),
                target_id: None,
                action: ApprovalAction::Create,
                snapshot: Some(snapshot),
                diff: None,
                comment,
                requested_by: ctx.user_id,
            };
            return self.persist_pending(tx, data).await;
        }

        let fields = schema.normalize(fields);
        let target_id = tx.create_entity(schema, &fields).await?;
        tx.commit().await?;

        info!(
            entity_type = %schema.entity_type,
            target_id = %target_id,
            "Create applied without review"
        );

        Ok(SubmissionOutcome::Applied {
            entity_type: schema.entity_type.clone(),
            action: ApprovalAction::Create,
            target_id,
            fields,
        })
    }

    async fn submit_update(
        &self,
        ctx: &ActorContext,
        schema: &EntitySchema,
        target_id: TargetId,
        fields: FieldMap,
        comment: Option<String>,
    ) -> AppResult<SubmissionOutcome> {
        let mut tx = self.store.begin().await?;
        let current = load_target(tx.as_mut(), schema, target_id).await?;

        let mut merged = current.clone();
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        if self.policies.needs_approval(&schema.entity_type, ctx.identity()) {
            let snapshot = self
                .codec
                .encode(&schema.entity_type, Some(target_id), &merged)?;
            let data = NewApproval {
                target_type: schema.entity_type.clone(),
                target_id: Some(target_id),
                action: ApprovalAction::Update,
                snapshot: Some(snapshot),
                diff: describe_changes(&current, &fields),
                comment,
                requested_by: ctx.user_id,
            };
            return self.persist_pending(tx, data).await;
        }

        tx.update_entity(schema, target_id, &fields).await?;
        tx.commit().await?;

        info!(
            entity_type = %schema.entity_type,
            target_id = %target_id,
            "Update applied without review"
        );

        Ok(SubmissionOutcome::Applied {
            entity_type: schema.entity_type.clone(),
            action: ApprovalAction::Update,
            target_id,
            fields: merged,
        })
    }

    async fn persist_pending(
        &self,
        mut tx: Box<dyn ApprovalTransaction>,
        data: NewApproval,
    ) -> AppResult<SubmissionOutcome> {
        data.validate(self.max_comment_length)?;
        let record = tx.insert_approval(data).await?;
        tx.commit().await?;

        info!(
            approval_id = %record.id,
            target_type = %record.target_type,
            action = %record.action,
            target_id = ?record.target_id,
            requested_by = ?record.requested_by,
            "Change submitted for review"
        );

        Ok(SubmissionOutcome::Pending(record))
    }

    fn check_comment(&self, comment: Option<&str>) -> AppResult<()> {
        match comment {
            Some(c) if c.chars().count() > self.max_comment_length => Err(AppError::validation(
                format!("Comment exceeds {} characters", self.max_comment_length),
            )),
            _ => Ok(()),
        }
    }
}

async fn load_target(
    tx: &mut dyn ApprovalTransaction,
    schema: &EntitySchema,
    target_id: TargetId,
) -> AppResult<FieldMap> {
    tx.fetch_entity(schema, target_id).await?.ok_or_else(|| {
        AppError::not_found(format!("{} {target_id} not found", schema.entity_type))
    })
}
