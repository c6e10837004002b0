//! Approval decision status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Decision status of an approval record.
///
/// `Pending` is the only non-terminal state; a record moves to
/// `Approved` or `Rejected` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a reviewer decision.
    Pending,
    /// Approved; the change has been materialized.
    Approved,
    /// Rejected; the change was discarded.
    Rejected,
}

impl ApprovalStatus {
    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
