//! Requested change kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of change an approval record asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    /// Create a new entity from the snapshot.
    Create,
    /// Overwrite an existing entity with the snapshot.
    Update,
    /// Delete an existing entity.
    Delete,
}

impl ApprovalAction {
    /// Whether a record with this action carries a snapshot.
    pub fn requires_snapshot(&self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Whether a record with this action must reference an existing target.
    pub fn requires_target(&self) -> bool {
        !matches!(self, Self::Create)
    }

    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("Unknown approval action: {other}")),
        }
    }
}
