//! Approval policy hook consulted before an entity write is applied.

use crate::types::UserId;

/// Decides whether a write to an entity type must go through review.
///
/// Implementations are registered per entity type by the service layer.
/// Types without a registered policy fall back to the configured default.
pub trait ApprovalPolicy: Send + Sync + 'static {
    /// Whether a write to `entity_type` by `identity` requires approval.
    fn needs_approval(&self, entity_type: &str, identity: Option<&UserId>) -> bool;
}

/// Policy that diverts every write into an approval record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRequireApproval;

impl ApprovalPolicy for AlwaysRequireApproval {
    fn needs_approval(&self, _entity_type: &str, _identity: Option<&UserId>) -> bool {
        true
    }
}

/// Policy that applies every write directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRequireApproval;

impl ApprovalPolicy for NeverRequireApproval {
    fn needs_approval(&self, _entity_type: &str, _identity: Option<&UserId>) -> bool {
        false
    }
}

impl<F> ApprovalPolicy for F
where
    F: Fn(&str, Option<&UserId>) -> bool + Send + Sync + 'static,
{
    fn needs_approval(&self, entity_type: &str, identity: Option<&UserId>) -> bool {
        self(entity_type, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_policy() {
        let trusted = UserId::new();
        let policy = move |_: &str, who: Option<&UserId>| who != Some(&trusted);
        assert!(!policy.needs_approval("widget", Some(&trusted)));
        assert!(policy.needs_approval("widget", Some(&UserId::new())));
        assert!(policy.needs_approval("widget", None));
    }
}
