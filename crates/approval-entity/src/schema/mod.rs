//! Explicitly registered schemas for the entity types under review.
//!
//! The codec and the database layer never inspect Rust types at runtime;
//! everything they know about an entity type comes from the
//! [`EntitySchema`] registered under its type tag.

pub mod entity;
pub mod field;
pub mod registry;
pub mod value;

pub use entity::{EntitySchema, canonical_fields};
pub use field::{FieldDef, FieldKind};
pub use registry::SchemaRegistry;
pub use value::{FieldMap, FieldValue};

/// Longest identifier PostgreSQL accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Whether `name` is a lowercase SQL identifier safe to splice into a query.
pub(crate) fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_identifier_rules() {
        assert!(is_sql_identifier("widgets"));
        assert!(is_sql_identifier("_audit_2"));
        assert!(!is_sql_identifier("2widgets"));
        assert!(!is_sql_identifier("Widgets"));
        assert!(!is_sql_identifier("widgets; DROP TABLE approvals"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier(&"a".repeat(64)));
    }
}
