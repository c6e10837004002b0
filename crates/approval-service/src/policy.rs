//! Per-entity-type approval policies.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use approval_core::config::ApprovalConfig;
use approval_core::traits::policy::ApprovalPolicy;
use approval_core::types::UserId;
use approval_entity::Approvable;

/// Resolves whether a write to an entity type must be reviewed.
///
/// Lookup order: configured exemptions, then the policy registered for the
/// type, then the configured default.
#[derive(Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<dyn ApprovalPolicy>>,
    exempt: HashSet<String>,
    require_by_default: bool,
}

impl PolicyRegistry {
    /// Create a registry with the defaults from configuration.
    pub fn new(config: &ApprovalConfig) -> Self {
        Self {
            policies: HashMap::new(),
            exempt: config.exempt_entity_types.iter().cloned().collect(),
            require_by_default: config.require_approval_by_default,
        }
    }

    /// Register a policy for one entity type, replacing any previous one.
    pub fn register(&mut self, entity_type: impl Into<String>, policy: impl ApprovalPolicy) {
        self.policies.insert(entity_type.into(), Arc::new(policy));
    }

    /// Register the `needs_approval` hook of a typed entity.
    pub fn register_type<T: Approvable>(&mut self) {
        self.register(T::ENTITY_TYPE, |_: &str, identity: Option<&UserId>| {
            T::needs_approval(identity)
        });
    }

    /// Whether a write to `entity_type` by `identity` must be reviewed.
    pub fn needs_approval(&self, entity_type: &str, identity: Option<&UserId>) -> bool {
        if self.exempt.contains(entity_type) {
            return false;
        }
        match self.policies.get(entity_type) {
            Some(policy) => policy.needs_approval(entity_type, identity),
            None => self.require_by_default,
        }
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new(&ApprovalConfig::default())
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        registered.sort_unstable();
        f.debug_struct("PolicyRegistry")
            .field("registered", &registered)
            .field("exempt", &self.exempt)
            .field("require_by_default", &self.require_by_default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use approval_core::traits::policy::NeverRequireApproval;
    use approval_entity::schema::{EntitySchema, FieldDef};

    #[derive(Serialize, Deserialize)]
    struct Note {
        body: String,
    }

    impl Approvable for Note {
        const ENTITY_TYPE: &'static str = "note";

        fn schema() -> EntitySchema {
            EntitySchema::new("note", "notes").field(FieldDef::text("body"))
        }

        fn needs_approval(identity: Option<&UserId>) -> bool {
            identity.is_none()
        }
    }

    #[test]
    fn test_default_requires_approval() {
        let policies = PolicyRegistry::default();
        assert!(policies.needs_approval("widget", None));
    }

    #[test]
    fn test_config_default_and_exemptions() {
        let config = ApprovalConfig {
            require_approval_by_default: false,
            exempt_entity_types: vec!["tag".to_string()],
            ..ApprovalConfig::default()
        };
        let mut policies = PolicyRegistry::new(&config);
        assert!(!policies.needs_approval("widget", None));

        policies.register("tag", |_: &str, _: Option<&UserId>| true);
        assert!(!policies.needs_approval("tag", None));
    }

    #[test]
    fn test_registered_policies() {
        let mut policies = PolicyRegistry::default();
        policies.register("widget", NeverRequireApproval);
        policies.register_type::<Note>();

        assert!(!policies.needs_approval("widget", None));
        assert!(policies.needs_approval("note", None));
        assert!(!policies.needs_approval("note", Some(&UserId::new())));
    }
}
