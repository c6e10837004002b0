//! Snapshot encoding and decoding against the schema registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use approval_core::error::{AppError, ErrorKind};
use approval_core::result::AppResult;
use approval_core::types::TargetId;

use crate::approvable::Approvable;
use crate::schema::{EntitySchema, FieldMap, FieldValue, SchemaRegistry};

/// Portable layout of an encoded snapshot.
///
/// ```json
/// {"type": "widget", "pk": null, "fields": {"field1": "x"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Entity type tag.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Persisted identity at encode time, if any.
    pub pk: Option<TargetId>,
    /// Field values in portable JSON form.
    pub fields: Map<String, Value>,
}

/// Result of decoding a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnapshot {
    /// Entity type tag.
    pub entity_type: String,
    /// Persisted identity at encode time, if any.
    pub pk: Option<TargetId>,
    /// Typed field values, one per schema field.
    pub fields: FieldMap,
}

/// Encodes proposed entity state into snapshots and decodes it back.
#[derive(Debug, Clone)]
pub struct SnapshotCodec {
    registry: Arc<SchemaRegistry>,
}

impl SnapshotCodec {
    /// Create a codec resolving types through `registry`.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// The registry used for type resolution.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Encode a full set of field values for `entity_type`.
    ///
    /// Absent nullable fields are stored as `null` so the snapshot always
    /// carries every schema field. Invalid values fail with `Validation`.
    pub fn encode(
        &self,
        entity_type: &str,
        pk: Option<TargetId>,
        fields: &FieldMap,
    ) -> AppResult<Value> {
        let schema = self.registry.require(entity_type)?;
        let fields = schema.normalize(fields.clone());
        schema.validate(&fields, false)?;

        let snapshot = Snapshot {
            entity_type: schema.entity_type.clone(),
            pk,
            fields: fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        };
        Ok(serde_json::to_value(snapshot)?)
    }

    /// Decode a snapshot, checking it against the current schema.
    ///
    /// Any shape problem (unknown type, unknown or missing field, value of
    /// the wrong kind) fails with `MalformedSnapshot`.
    pub fn decode(&self, raw: &Value) -> AppResult<DecodedSnapshot> {
        let snapshot: Snapshot = serde_json::from_value(raw.clone()).map_err(|e| {
            AppError::with_source(
                ErrorKind::MalformedSnapshot,
                format!("Snapshot has an invalid layout: {e}"),
                e,
            )
        })?;

        let schema = self.registry.resolve(&snapshot.entity_type).ok_or_else(|| {
            AppError::malformed_snapshot(format!(
                "Snapshot type {} is not registered",
                snapshot.entity_type
            ))
        })?;

        let fields = decode_fields(&schema, &snapshot.fields).map_err(|reason| {
            AppError::malformed_snapshot(format!(
                "Snapshot does not match the {} schema: {reason}",
                schema.entity_type
            ))
        })?;

        Ok(DecodedSnapshot {
            entity_type: snapshot.entity_type,
            pk: snapshot.pk,
            fields,
        })
    }

    /// Extract the field values of a typed entity.
    pub fn fields_of<T: Approvable>(&self, entity: &T) -> AppResult<FieldMap> {
        let schema = self.registry.require(T::ENTITY_TYPE)?;
        let Value::Object(object) = serde_json::to_value(entity)? else {
            return Err(AppError::validation(format!(
                "{} does not serialize to an object",
                T::ENTITY_TYPE
            )));
        };

        object
            .iter()
            .map(|(name, value)| {
                let def = schema.field_def(name).ok_or_else(|| {
                    AppError::validation(format!("{}: unknown field {name:?}", T::ENTITY_TYPE))
                })?;
                FieldValue::from_json(&def.kind, value)
                    .map(|v| (name.clone(), v))
                    .map_err(|reason| {
                        AppError::validation(format!("{}.{name}: {reason}", T::ENTITY_TYPE))
                    })
            })
            .collect()
    }

    /// Build a typed entity from field values.
    pub fn entity_from_fields<T: Approvable>(&self, fields: &FieldMap) -> AppResult<T> {
        let object: Map<String, Value> = fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::from_value(Value::Object(object)).map_err(|e| {
            AppError::with_source(
                ErrorKind::MalformedSnapshot,
                format!("Cannot rebuild {}: {e}", T::ENTITY_TYPE),
                e,
            )
        })
    }

    /// Encode a typed entity.
    pub fn encode_entity<T: Approvable>(&self, entity: &T, pk: Option<TargetId>) -> AppResult<Value> {
        let fields = self.fields_of(entity)?;
        self.encode(T::ENTITY_TYPE, pk, &fields)
    }

    /// Decode a snapshot into a typed entity.
    pub fn decode_entity<T: Approvable>(&self, raw: &Value) -> AppResult<(Option<TargetId>, T)> {
        let decoded = self.decode(raw)?;
        if decoded.entity_type != T::ENTITY_TYPE {
            return Err(AppError::malformed_snapshot(format!(
                "Snapshot holds a {}, expected {}",
                decoded.entity_type,
                T::ENTITY_TYPE
            )));
        }
        let entity = self.entity_from_fields(&decoded.fields)?;
        Ok((decoded.pk, entity))
    }
}

fn decode_fields(schema: &EntitySchema, raw: &Map<String, Value>) -> Result<FieldMap, String> {
    if let Some(unknown) = raw.keys().find(|name| schema.field_def(name).is_none()) {
        return Err(format!("unknown field {unknown:?}"));
    }

    let mut fields = FieldMap::new();
    for def in &schema.fields {
        let value = raw
            .get(&def.name)
            .ok_or_else(|| format!("missing field {:?}", def.name))?;
        let value = FieldValue::from_json(&def.kind, value)
            .map_err(|reason| format!("field {:?}: {reason}", def.name))?;
        fields.insert(def.name.clone(), value);
    }

    schema.check_values(&fields, false)?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::schema::FieldDef;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Child {
        field1: String,
        field2: String,
    }

    impl Approvable for Child {
        const ENTITY_TYPE: &'static str = "child";

        fn schema() -> EntitySchema {
            EntitySchema::new("child", "children")
                .field(FieldDef::text("field1").max_length(32))
                .field(FieldDef::text("field2").max_length(32))
        }
    }

    fn codec() -> SnapshotCodec {
        let mut registry = SchemaRegistry::new();
        registry.register_type::<Child>().unwrap();
        registry
            .register(
                EntitySchema::new("parent", "parents")
                    .field(FieldDef::reference("child", "child"))
                    .field(FieldDef::integer("size"))
                    .field(FieldDef::float("weight").nullable())
                    .field(FieldDef::boolean("active"))
                    .field(FieldDef::timestamp("born_at"))
                    .field(FieldDef::json("extra").nullable()),
            )
            .unwrap();
        registry
            .register(EntitySchema::new("doc", "docs").field(FieldDef::json("body")))
            .unwrap();
        SnapshotCodec::new(Arc::new(registry))
    }

    fn parent_fields() -> FieldMap {
        let born = Utc.with_ymd_and_hms(2019, 11, 12, 8, 48, 0).unwrap();
        FieldMap::from([
            ("child".to_string(), FieldValue::Reference(TargetId::new())),
            ("size".to_string(), FieldValue::Integer(-4)),
            ("weight".to_string(), FieldValue::Float(2.5)),
            ("active".to_string(), FieldValue::Boolean(true)),
            ("born_at".to_string(), FieldValue::Timestamp(born)),
            ("extra".to_string(), FieldValue::Json(json!({"tags": ["a", "b"]}))),
        ])
    }

    #[test]
    fn test_round_trip_every_kind() {
        let codec = codec();
        let fields = parent_fields();
        let pk = Some(TargetId::new());
        let encoded = codec.encode("parent", pk, &fields).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.entity_type, "parent");
        assert_eq!(decoded.pk, pk);
        assert_eq!(decoded.fields, fields);
    }

    #[test]
    fn test_encode_layout() {
        let codec = codec();
        let child = Child {
            field1: "hello".to_string(),
            field2: "world".to_string(),
        };
        let encoded = codec.encode_entity(&child, None).unwrap();
        assert_eq!(
            encoded,
            json!({"type": "child", "pk": null, "fields": {"field1": "hello", "field2": "world"}})
        );
        let (pk, back): (_, Child) = codec.decode_entity(&encoded).unwrap();
        assert_eq!(pk, None);
        assert_eq!(back, child);
    }

    #[test]
    fn test_encode_fills_nullable_fields() {
        let codec = codec();
        let mut fields = parent_fields();
        fields.remove("extra");
        let encoded = codec.encode("parent", None, &fields).unwrap();
        assert_eq!(encoded["fields"]["extra"], Value::Null);
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.fields.get("extra"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_encode_rejects_invalid_values() {
        let codec = codec();
        let mut fields = parent_fields();
        fields.insert("size".to_string(), FieldValue::Text("big".to_string()));
        let err = codec.encode("parent", None, &fields).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = codec.encode("gadget", None, &FieldMap::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_json_null_document_is_a_null_value() {
        let codec = codec();
        let body = FieldMap::from([("body".to_string(), FieldValue::Json(Value::Null))]);
        let err = codec.encode("doc", None, &body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut fields = parent_fields();
        fields.insert("extra".to_string(), FieldValue::Json(Value::Null));
        let encoded = codec.encode("parent", None, &fields).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.fields.get("extra"), Some(&FieldValue::Null));
        assert_eq!(
            codec.encode("parent", None, &decoded.fields).unwrap(),
            encoded
        );
    }

    #[test]
    fn test_decode_unknown_type_is_malformed() {
        let err = codec()
            .decode(&json!({"type": "gadget", "pk": null, "fields": {}}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSnapshot);
    }

    #[test]
    fn test_decode_detects_schema_drift() {
        let codec = codec();
        // Field added to the schema after the snapshot was taken.
        let missing = json!({"type": "child", "pk": null, "fields": {"field1": "a"}});
        assert_eq!(
            codec.decode(&missing).unwrap_err().kind,
            ErrorKind::MalformedSnapshot
        );

        // Field removed from the schema.
        let extra = json!({"type": "child", "pk": null,
            "fields": {"field1": "a", "field2": "b", "field3": "c"}});
        assert_eq!(
            codec.decode(&extra).unwrap_err().kind,
            ErrorKind::MalformedSnapshot
        );

        // Field changed kind.
        let retyped = json!({"type": "child", "pk": null, "fields": {"field1": 1, "field2": "b"}});
        assert_eq!(
            codec.decode(&retyped).unwrap_err().kind,
            ErrorKind::MalformedSnapshot
        );
    }

    #[test]
    fn test_decode_rejects_bad_layout() {
        let codec = codec();
        for raw in [
            json!("not an object"),
            json!({"type": "child", "fields": {}, "pk": null, "extra": 1}),
            json!({"type": "child", "pk": "not-a-uuid", "fields": {}}),
        ] {
            assert_eq!(
                codec.decode(&raw).unwrap_err().kind,
                ErrorKind::MalformedSnapshot
            );
        }
    }

    #[test]
    fn test_decode_entity_checks_type() {
        let codec = codec();
        let encoded = codec.encode("parent", None, &parent_fields()).unwrap();
        let err = codec.decode_entity::<Child>(&encoded).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSnapshot);
    }
}
