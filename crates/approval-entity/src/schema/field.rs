//! Field definitions.

use serde::{Deserialize, Serialize};

/// Value kind stored in a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean flag.
    Boolean,
    /// UTC timestamp.
    Timestamp,
    /// Identifier of another entity, resolved lazily by the caller.
    Reference {
        /// Type tag of the referenced entity.
        target: String,
    },
    /// Arbitrary JSON document.
    Json,
}

impl FieldKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Reference { .. } => "reference",
            Self::Json => "json",
        }
    }
}

/// One column of an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field and column name.
    pub name: String,
    /// Value kind.
    pub kind: FieldKind,
    /// Whether the field accepts `Null`.
    #[serde(default)]
    pub nullable: bool,
    /// Maximum length in characters, for text fields.
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl FieldDef {
    /// Create a non-nullable field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            max_length: None,
        }
    }

    /// Text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Timestamp field.
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    /// Reference to another entity type.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                target: target.into(),
            },
        )
    }

    /// JSON document field.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Allow `Null` values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Limit the length of a text field.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}
