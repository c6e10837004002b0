//! Caller context carrying the identity behind a submission or decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use approval_core::error::AppError;
use approval_core::result::AppResult;
use approval_core::types::UserId;

/// Who is acting in the current call.
///
/// Authentication happens outside this crate; the caller supplies an
/// already-trusted identity, or none for anonymous submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    /// The acting user, if known.
    pub user_id: Option<UserId>,
    /// Display name for logs.
    pub username: Option<String>,
    /// When the call was received.
    pub request_time: DateTime<Utc>,
}

impl ActorContext {
    /// Context for an identified user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            username: None,
            request_time: Utc::now(),
        }
    }

    /// Context without an identity.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            username: None,
            request_time: Utc::now(),
        }
    }

    /// Attach a display name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// The identity handed to approval policies.
    pub fn identity(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// The acting user, required for review decisions.
    pub fn require_user(&self) -> AppResult<UserId> {
        self.user_id
            .ok_or_else(|| AppError::validation("A reviewer identity is required"))
    }
}
