//! Submission inputs and outcomes.

use approval_core::types::TargetId;
use approval_entity::approval::{ApprovalAction, ApprovalRecord};
use approval_entity::schema::FieldMap;

/// A write attempt against a registered entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    /// Type tag of the entity being written.
    pub entity_type: String,
    /// Requested change kind.
    pub action: ApprovalAction,
    /// Existing entity, required for updates and deletions.
    pub target_id: Option<TargetId>,
    /// Proposed field values. Updates may carry a subset.
    pub fields: FieldMap,
    /// Reason for the change.
    pub comment: Option<String>,
}

impl ChangeRequest {
    /// Propose a new entity.
    pub fn create(entity_type: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            entity_type: entity_type.into(),
            action: ApprovalAction::Create,
            target_id: None,
            fields,
            comment: None,
        }
    }

    /// Propose new values for an existing entity.
    pub fn update(entity_type: impl Into<String>, target_id: TargetId, fields: FieldMap) -> Self {
        Self {
            entity_type: entity_type.into(),
            action: ApprovalAction::Update,
            target_id: Some(target_id),
            fields,
            comment: None,
        }
    }

    /// Propose removing an existing entity.
    pub fn delete(entity_type: impl Into<String>, target_id: TargetId) -> Self {
        Self {
            entity_type: entity_type.into(),
            action: ApprovalAction::Delete,
            target_id: Some(target_id),
            fields: FieldMap::new(),
            comment: None,
        }
    }

    /// Attach a justification.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// What a submission produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The write was diverted into a pending approval record.
    Pending(ApprovalRecord),
    /// The write was applied directly.
    Applied {
        /// Type tag of the written entity.
        entity_type: String,
        /// Change that was applied.
        action: ApprovalAction,
        /// Identifier of the written entity.
        target_id: TargetId,
        /// Full field values after the write; for deletions, before it.
        fields: FieldMap,
    },
}

impl SubmissionOutcome {
    /// The pending record, if the write was diverted.
    pub fn pending(&self) -> Option<&ApprovalRecord> {
        match self {
            Self::Pending(record) => Some(record),
            Self::Applied { .. } => None,
        }
    }

    /// Consume the outcome, returning the pending record if any.
    pub fn into_pending(self) -> Option<ApprovalRecord> {
        match self {
            Self::Pending(record) => Some(record),
            Self::Applied { .. } => None,
        }
    }

    /// Whether the write took effect immediately.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
