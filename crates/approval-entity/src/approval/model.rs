//! Approval record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, TargetId, UserId};

use super::action::ApprovalAction;
use super::status::ApprovalStatus;

/// A proposed change to one application entity, awaiting or past review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApprovalRecord {
    /// Unique approval identifier.
    pub id: ApprovalId,
    /// Type tag of the entity under review (e.g. `"widget"`).
    pub target_type: String,
    /// Target entity, absent for creations until they are approved.
    pub target_id: Option<TargetId>,
    /// Requested change kind.
    pub action: ApprovalAction,
    /// Decision status.
    pub status: ApprovalStatus,
    /// Encoded proposed entity state; absent for deletions.
    pub snapshot: Option<serde_json::Value>,
    /// Human-readable description of the changed fields.
    pub diff: Option<String>,
    /// Reason for the change, plus any reviewer remarks.
    pub comment: Option<String>,
    /// Who submitted the change.
    pub requested_by: Option<UserId>,
    /// Who approved or rejected it.
    pub decided_by: Option<UserId>,
    /// When the decision was made.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// Whether the record still awaits a decision.
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    /// Fail with `InvalidTransition` unless the record is pending.
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(AppError::invalid_transition(format!(
                "Approval {} is already {}",
                self.id, self.status
            )))
        }
    }

    /// Move a pending record to `Approved`.
    ///
    /// `target_id` is the identifier the materialized entity ended up with;
    /// deletions pass `None`.
    pub fn mark_approved(
        &mut self,
        actor: UserId,
        target_id: Option<TargetId>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_pending()?;
        self.target_id = target_id;
        self.decide(ApprovalStatus::Approved, actor, now);
        Ok(())
    }

    /// Move a pending record to `Rejected`.
    pub fn mark_rejected(&mut self, actor: UserId, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_pending()?;
        self.decide(ApprovalStatus::Rejected, actor, now);
        Ok(())
    }

    /// Append a reviewer remark to the comment.
    pub fn append_comment(&mut self, remark: &str) {
        let remark = remark.trim();
        if remark.is_empty() {
            return;
        }
        self.comment = Some(match self.comment.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{remark}"),
            _ => remark.to_string(),
        });
    }

    fn decide(&mut self, status: ApprovalStatus, actor: UserId, now: DateTime<Utc>) {
        self.status = status;
        self.decided_by = Some(actor);
        self.decided_at = Some(now);
        self.updated_at = now;
    }
}

/// Data required to create a new approval record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApproval {
    /// Type tag of the entity under review.
    pub target_type: String,
    /// Existing target entity (updates and deletions).
    pub target_id: Option<TargetId>,
    /// Requested change kind.
    pub action: ApprovalAction,
    /// Encoded proposed state.
    pub snapshot: Option<serde_json::Value>,
    /// Change description.
    pub diff: Option<String>,
    /// Reason for the change.
    pub comment: Option<String>,
    /// Who submitted the change.
    pub requested_by: Option<UserId>,
}

impl NewApproval {
    /// Check the action/target/snapshot combination and the comment length.
    pub fn validate(&self, max_comment_length: usize) -> AppResult<()> {
        if self.target_type.trim().is_empty() {
            return Err(AppError::validation("target_type must not be empty"));
        }
        if self.action.requires_snapshot() && self.snapshot.is_none() {
            return Err(AppError::validation(format!(
                "A snapshot is required for {} approvals",
                self.action
            )));
        }
        if !self.action.requires_snapshot() && self.snapshot.is_some() {
            return Err(AppError::validation("Delete approvals carry no snapshot"));
        }
        match (self.action.requires_target(), self.target_id.is_some()) {
            (true, false) => {
                return Err(AppError::validation(format!(
                    "A target id is required for {} approvals",
                    self.action
                )));
            }
            (false, true) => {
                return Err(AppError::validation(
                    "Create approvals must not reference an existing target",
                ));
            }
            _ => {}
        }
        if let Some(ref comment) = self.comment {
            if comment.chars().count() > max_comment_length {
                return Err(AppError::validation(format!(
                    "Comment exceeds {max_comment_length} characters"
                )));
            }
        }
        Ok(())
    }

    /// Build the pending record this submission becomes once stored.
    pub fn into_record(self, now: DateTime<Utc>) -> ApprovalRecord {
        ApprovalRecord {
            id: ApprovalId::new(),
            target_type: self.target_type,
            target_id: self.target_id,
            action: self.action,
            status: ApprovalStatus::Pending,
            snapshot: self.snapshot,
            diff: self.diff,
            comment: self.comment.filter(|c| !c.trim().is_empty()),
            requested_by: self.requested_by,
            decided_by: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
