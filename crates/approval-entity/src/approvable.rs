//! Capability implemented by Rust entity types that opt into review.

use serde::Serialize;
use serde::de::DeserializeOwned;

use approval_core::types::UserId;

use crate::schema::EntitySchema;

/// An application entity whose writes may be diverted into approval records.
///
/// The struct's serde representation must be a flat object whose keys are
/// exactly the schema's field names (the primary key is tracked separately).
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Widget { field1: String }
///
/// impl Approvable for Widget {
///     const ENTITY_TYPE: &'static str = "widget";
///     fn schema() -> EntitySchema {
///         EntitySchema::new("widget", "widgets").field(FieldDef::text("field1"))
///     }
/// }
/// ```
pub trait Approvable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type tag recorded on approval records.
    const ENTITY_TYPE: &'static str;

    /// Schema registered for this type.
    fn schema() -> EntitySchema;

    /// Whether a write by `identity` must be reviewed. Defaults to always.
    fn needs_approval(identity: Option<&UserId>) -> bool {
        let _ = identity;
        true
    }
}
