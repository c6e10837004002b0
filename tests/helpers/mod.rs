//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use approval_core::config::ApprovalConfig;
use approval_core::types::{TargetId, UserId};
use approval_database::MemoryApprovalStore;
use approval_entity::{Approvable, EntitySchema, FieldDef, FieldMap, FieldValue, SchemaRegistry};
use approval_workflow::{ActorContext, ApprovalEngine, PolicyRegistry};

/// Entity under review in most tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub field1: String,
    pub size: Option<i64>,
}

impl Widget {
    pub fn new(field1: &str) -> Self {
        Self {
            field1: field1.to_string(),
            size: None,
        }
    }
}

impl Approvable for Widget {
    const ENTITY_TYPE: &'static str = "widget";

    fn schema() -> EntitySchema {
        EntitySchema::new("widget", "widgets")
            .field(FieldDef::text("field1").max_length(64))
            .field(FieldDef::integer("size").nullable())
    }
}

pub fn gadget_schema() -> EntitySchema {
    EntitySchema::new("gadget", "gadgets").field(FieldDef::text("name"))
}

/// Build a field map from name/value pairs.
pub fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Test application context
pub struct TestApp {
    /// Engine under test
    pub engine: ApprovalEngine,
    /// Direct handle on the backing store
    pub store: MemoryApprovalStore,
    /// Identity submitting changes
    pub requester: ActorContext,
    /// Identity deciding on them
    pub reviewer: ActorContext,
}

impl TestApp {
    /// Create an app where every write needs review.
    pub fn new() -> Self {
        Self::with_policies(ApprovalConfig::default(), |_| {})
    }

    /// Create an app with custom configuration and policies.
    pub fn with_policies(
        config: ApprovalConfig,
        configure: impl FnOnce(&mut PolicyRegistry),
    ) -> Self {
        let mut registry = SchemaRegistry::new();
        registry
            .register_type::<Widget>()
            .expect("Failed to register widget");
        registry
            .register(gadget_schema())
            .expect("Failed to register gadget");

        let mut policies = PolicyRegistry::new(&config);
        configure(&mut policies);

        let store = MemoryApprovalStore::new();
        let engine =
            ApprovalEngine::with_store(Arc::new(store.clone()), &config, registry, policies);

        Self {
            engine,
            store,
            requester: ActorContext::user(UserId::new()).with_username("requester"),
            reviewer: ActorContext::user(UserId::new()).with_username("reviewer"),
        }
    }

    /// Insert a widget directly, bypassing review.
    pub async fn seed_widget(&self, field1: &str, size: Option<i64>) -> TargetId {
        self.store
            .seed_entity(
                &Widget::schema(),
                fields(&[("field1", field1.into()), ("size", size.into())]),
            )
            .await
    }

    /// Current persisted state of a widget.
    pub async fn widget(&self, id: TargetId) -> Option<FieldMap> {
        self.store.entity(&Widget::schema(), id).await
    }

    pub async fn widget_count(&self) -> usize {
        self.store.entity_count(&Widget::schema()).await
    }

    pub fn reviewer_id(&self) -> UserId {
        self.reviewer.user_id.expect("reviewer has an identity")
    }
}
