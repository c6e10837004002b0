//! Type-tag → schema registry, populated at process start.

use std::collections::HashMap;
use std::sync::Arc;

use approval_core::error::AppError;
use approval_core::result::AppResult;

use super::entity::EntitySchema;
use crate::approvable::Approvable;

/// Registry of every entity type that participates in the workflow.
///
/// Built once during startup, then shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its type tag.
    pub fn register(&mut self, schema: EntitySchema) -> AppResult<()> {
        schema.check_definition()?;
        if self.schemas.contains_key(&schema.entity_type) {
            return Err(AppError::conflict(format!(
                "Entity type {} is already registered",
                schema.entity_type
            )));
        }
        if let Some(existing) = self.schemas.values().find(|s| s.table == schema.table) {
            return Err(AppError::conflict(format!(
                "Table {} is already used by {}",
                schema.table, existing.entity_type
            )));
        }
        self.schemas
            .insert(schema.entity_type.clone(), Arc::new(schema));
        Ok(())
    }

    /// Register the schema declared by a typed entity.
    pub fn register_type<T: Approvable>(&mut self) -> AppResult<()> {
        let schema = T::schema();
        if schema.entity_type != T::ENTITY_TYPE {
            return Err(AppError::validation(format!(
                "Schema tag {} does not match entity type {}",
                schema.entity_type,
                T::ENTITY_TYPE
            )));
        }
        self.register(schema)
    }

    /// Resolve a type tag.
    pub fn resolve(&self, entity_type: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.get(entity_type).cloned()
    }

    /// Resolve a type tag, failing with `Validation` if it is unknown.
    pub fn require(&self, entity_type: &str) -> AppResult<Arc<EntitySchema>> {
        self.resolve(entity_type).ok_or_else(|| {
            AppError::validation(format!("Entity type {entity_type} is not registered"))
        })
    }

    /// Registered type tags, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldDef;
    use approval_core::error::ErrorKind;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(EntitySchema::new("widget", "widgets").field(FieldDef::text("name")))
            .unwrap();
        assert!(registry.resolve("widget").is_some());
        assert!(registry.resolve("gadget").is_none());
        assert_eq!(
            registry.require("gadget").unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(registry.entity_types(), vec!["widget"]);
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let mut registry = SchemaRegistry::new();
        registry.register(EntitySchema::new("widget", "widgets")).unwrap();
        let err = registry
            .register(EntitySchema::new("widget", "widgets_v2"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        let err = registry
            .register(EntitySchema::new("gadget", "widgets"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
}
