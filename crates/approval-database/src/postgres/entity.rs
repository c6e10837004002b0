//! SQL generation and value binding for registered entity tables.
//!
//! Entity tables are owned by the application. Each must have a `UUID`
//! primary key named `id` plus one column per schema field:
//!
//! | kind        | column type                 |
//! |-------------|-----------------------------|
//! | `text`      | `TEXT` / `VARCHAR`          |
//! | `integer`   | `BIGINT`                    |
//! | `float`     | `DOUBLE PRECISION`          |
//! | `boolean`   | `BOOLEAN`                   |
//! | `timestamp` | `TIMESTAMPTZ`               |
//! | `reference` | `UUID`                      |
//! | `json`      | `JSONB`                     |

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use uuid::Uuid;

use approval_core::types::TargetId;
use approval_entity::schema::entity::PRIMARY_KEY;
use approval_entity::schema::{EntitySchema, FieldDef, FieldKind, FieldMap, FieldValue};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

/// `SELECT <fields> FROM <table> WHERE id = $1 FOR UPDATE`
pub(crate) fn select_sql(schema: &EntitySchema) -> String {
    let columns = if schema.fields.is_empty() {
        quote(PRIMARY_KEY)
    } else {
        schema
            .column_names()
            .map(quote)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "SELECT {columns} FROM {} WHERE {} = $1 FOR UPDATE",
        quote(&schema.table),
        quote(PRIMARY_KEY)
    )
}

/// `INSERT INTO <table> (id, <fields>) VALUES ($1, ...)`
pub(crate) fn insert_sql(schema: &EntitySchema) -> String {
    let columns: Vec<String> = std::iter::once(PRIMARY_KEY)
        .chain(schema.column_names())
        .map(quote)
        .collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(&schema.table),
        columns.join(", "),
        params.join(", ")
    )
}

/// `UPDATE <table> SET <col> = $2, ... WHERE id = $1`
///
/// Returns `None` when there is nothing to set.
pub(crate) fn update_sql(schema: &EntitySchema, columns: &[&FieldDef]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, def)| format!("{} = ${}", quote(&def.name), i + 2))
        .collect();
    Some(format!(
        "UPDATE {} SET {} WHERE {} = $1",
        quote(&schema.table),
        assignments.join(", "),
        quote(PRIMARY_KEY)
    ))
}

/// `SELECT 1 FROM <table> WHERE id = $1 FOR UPDATE`
pub(crate) fn exists_sql(schema: &EntitySchema) -> String {
    format!(
        "SELECT 1 FROM {} WHERE {} = $1 FOR UPDATE",
        quote(&schema.table),
        quote(PRIMARY_KEY)
    )
}

/// `DELETE FROM <table> WHERE id = $1`
pub(crate) fn delete_sql(schema: &EntitySchema) -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1",
        quote(&schema.table),
        quote(PRIMARY_KEY)
    )
}

/// Bind one field value. `Null` is bound with the column's SQL type.
pub(crate) fn bind_value<'q>(query: PgQuery<'q>, kind: &FieldKind, value: &FieldValue) -> PgQuery<'q> {
    match value {
        FieldValue::Null => bind_null(query, kind),
        FieldValue::Boolean(v) => query.bind(*v),
        FieldValue::Integer(v) => query.bind(*v),
        FieldValue::Float(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Timestamp(v) => query.bind(*v),
        FieldValue::Reference(v) => query.bind(v.into_uuid()),
        FieldValue::Json(v) => query.bind(v.clone()),
    }
}

fn bind_null<'q>(query: PgQuery<'q>, kind: &FieldKind) -> PgQuery<'q> {
    match kind {
        FieldKind::Text => query.bind(None::<String>),
        FieldKind::Integer => query.bind(None::<i64>),
        FieldKind::Float => query.bind(None::<f64>),
        FieldKind::Boolean => query.bind(None::<bool>),
        FieldKind::Timestamp => query.bind(None::<DateTime<Utc>>),
        FieldKind::Reference { .. } => query.bind(None::<Uuid>),
        FieldKind::Json => query.bind(None::<serde_json::Value>),
    }
}

/// Read every schema field out of a selected row.
pub(crate) fn read_fields(schema: &EntitySchema, row: &PgRow) -> Result<FieldMap, sqlx::Error> {
    schema
        .fields
        .iter()
        .map(|def| read_value(row, def).map(|value| (def.name.clone(), value)))
        .collect()
}

fn read_value(row: &PgRow, def: &FieldDef) -> Result<FieldValue, sqlx::Error> {
    let name = def.name.as_str();
    let value = match def.kind {
        FieldKind::Text => row.try_get::<Option<String>, _>(name)?.into(),
        FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.into(),
        FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.into(),
        FieldKind::Boolean => row.try_get::<Option<bool>, _>(name)?.into(),
        FieldKind::Timestamp => row.try_get::<Option<DateTime<Utc>>, _>(name)?.into(),
        FieldKind::Reference { .. } => row
            .try_get::<Option<Uuid>, _>(name)?
            .map(TargetId::from_uuid)
            .into(),
        FieldKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(name)?
            .map_or(FieldValue::Null, FieldValue::Json),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> EntitySchema {
        EntitySchema::new("widget", "widgets")
            .field(FieldDef::text("field1"))
            .field(FieldDef::integer("size").nullable())
    }

    #[test]
    fn test_select_sql() {
        assert_eq!(
            select_sql(&widget()),
            r#"SELECT "field1", "size" FROM "widgets" WHERE "id" = $1 FOR UPDATE"#
        );
        assert_eq!(
            select_sql(&EntitySchema::new("marker", "markers")),
            r#"SELECT "id" FROM "markers" WHERE "id" = $1 FOR UPDATE"#
        );
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql(&widget()),
            r#"INSERT INTO "widgets" ("id", "field1", "size") VALUES ($1, $2, $3)"#
        );
    }

    #[test]
    fn test_update_sql_only_sets_given_columns() {
        let schema = widget();
        let size = schema.field_def("size").unwrap();
        assert_eq!(
            update_sql(&schema, &[size]).as_deref(),
            Some(r#"UPDATE "widgets" SET "size" = $2 WHERE "id" = $1"#)
        );
        assert_eq!(update_sql(&schema, &[]), None);
    }

    #[test]
    fn test_delete_sql() {
        assert_eq!(
            delete_sql(&widget()),
            r#"DELETE FROM "widgets" WHERE "id" = $1"#
        );
    }
}
