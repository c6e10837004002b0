//! Review-queue filter criteria.

use serde::{Deserialize, Serialize};

use approval_core::types::TargetId;

use super::action::ApprovalAction;
use super::model::ApprovalRecord;
use super::status::ApprovalStatus;

/// Optional criteria for listing approval records. Unset fields match all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFilter {
    /// Restrict to one entity type.
    pub target_type: Option<String>,
    /// Restrict to one target entity.
    pub target_id: Option<TargetId>,
    /// Restrict to one decision status.
    pub status: Option<ApprovalStatus>,
    /// Restrict to one change kind.
    pub action: Option<ApprovalAction>,
}

impl ApprovalFilter {
    /// Filter matching every pending record.
    pub fn pending() -> Self {
        Self {
            status: Some(ApprovalStatus::Pending),
            ..Self::default()
        }
    }

    /// Restrict to an entity type.
    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    /// Restrict to a target entity.
    pub fn with_target_id(mut self, target_id: TargetId) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Restrict to a status.
    pub fn with_status(mut self, status: ApprovalStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to an action.
    pub fn with_action(mut self, action: ApprovalAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Whether `record` satisfies every set criterion.
    pub fn matches(&self, record: &ApprovalRecord) -> bool {
        self.target_type
            .as_ref()
            .is_none_or(|t| *t == record.target_type)
            && self.target_id.is_none_or(|id| record.target_id == Some(id))
            && self.status.is_none_or(|s| s == record.status)
            && self.action.is_none_or(|a| a == record.action)
    }
}
