//! Entity schema: the registered shape of one application entity type.

use serde::{Deserialize, Serialize};

use approval_core::error::AppError;
use approval_core::result::AppResult;

use super::field::{FieldDef, FieldKind};
use super::is_sql_identifier;
use super::value::{FieldMap, FieldValue};

/// Name of the primary-key column every entity table carries.
pub const PRIMARY_KEY: &str = "id";

/// Shape of an application entity type that opts into review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Type tag stored on approval records (e.g. `"widget"`).
    pub entity_type: String,
    /// Backing table name.
    pub table: String,
    /// Ordered field definitions, excluding the primary key.
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Start a schema with no fields.
    pub fn new(entity_type: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field definition.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field definition by name.
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check that the schema itself is well formed.
    ///
    /// Table and column names are spliced into SQL, so they must be plain
    /// lowercase identifiers.
    pub fn check_definition(&self) -> AppResult<()> {
        let valid_tag = !self.entity_type.is_empty()
            && self
                .entity_type
                .split('.')
                .all(is_sql_identifier);
        if !valid_tag {
            return Err(AppError::validation(format!(
                "Invalid entity type tag {:?}",
                self.entity_type
            )));
        }
        if !is_sql_identifier(&self.table) {
            return Err(AppError::validation(format!(
                "Invalid table name {:?} for {}",
                self.table, self.entity_type
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if !is_sql_identifier(&field.name) || field.name == PRIMARY_KEY {
                return Err(AppError::validation(format!(
                    "Invalid field name {:?} for {}",
                    field.name, self.entity_type
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(AppError::validation(format!(
                    "Duplicate field {:?} for {}",
                    field.name, self.entity_type
                )));
            }
            if field.max_length.is_some() && field.kind != FieldKind::Text {
                return Err(AppError::validation(format!(
                    "max_length only applies to text fields ({}.{})",
                    self.entity_type, field.name
                )));
            }
        }
        Ok(())
    }

    /// Validate proposed field values.
    ///
    /// With `partial` set, absent fields are allowed (they keep their
    /// current value); otherwise every non-nullable field must be present.
    pub fn validate(&self, fields: &FieldMap, partial: bool) -> AppResult<()> {
        self.check_values(fields, partial)
            .map_err(|reason| AppError::validation(format!("{}: {reason}", self.entity_type)))
    }

    /// Fill absent nullable fields with `Null` and collapse JSON `null`
    /// documents into `Null`.
    pub fn normalize(&self, fields: FieldMap) -> FieldMap {
        let mut fields = canonical_fields(fields);
        for def in self.fields.iter().filter(|f| f.nullable) {
            fields.entry(def.name.clone()).or_insert(FieldValue::Null);
        }
        fields
    }

    /// Describe the first mismatch between `fields` and this schema.
    pub(crate) fn check_values(&self, fields: &FieldMap, partial: bool) -> Result<(), String> {
        if let Some(unknown) = fields.keys().find(|name| self.field_def(name).is_none()) {
            return Err(format!("unknown field {unknown:?}"));
        }
        for def in &self.fields {
            let Some(value) = fields.get(&def.name) else {
                if partial || def.nullable {
                    continue;
                }
                return Err(format!("missing required field {:?}", def.name));
            };
            if value.is_null() {
                if def.nullable {
                    continue;
                }
                return Err(format!("field {:?} must not be null", def.name));
            }
            if !value.fits(&def.kind) {
                return Err(format!(
                    "field {:?} expects {}, got {value}",
                    def.name,
                    def.kind.name()
                ));
            }
            if let (Some(max), FieldValue::Text(text)) = (def.max_length, value) {
                if text.chars().count() > max {
                    return Err(format!(
                        "field {:?} exceeds {max} characters",
                        def.name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Collapse JSON `null` documents into `Null` without filling absent fields.
pub fn canonical_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(name, value)| (name, value.canonical()))
        .collect()
}
