//! PostgreSQL transaction with row-level locks.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use approval_core::error::{AppError, ErrorKind};
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, TargetId};
use approval_entity::approval::{ApprovalRecord, NewApproval};
use approval_entity::schema::{EntitySchema, FieldMap, FieldValue};

use super::entity;
use crate::store::ApprovalTransaction;

/// Open database transaction. Dropping it rolls back.
pub struct PgApprovalTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgApprovalTransaction {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ApprovalTransaction for PgApprovalTransaction {
    async fn lock_approval(&mut self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>("SELECT * FROM approvals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock approval", e))
    }

    async fn lock_pending_for_target(
        &mut self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approvals \
             WHERE target_type = $1 AND target_id = $2 AND status = 'pending' \
             ORDER BY created_at ASC, id ASC FOR UPDATE",
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to lock pending approvals", e)
        })
    }

    async fn insert_approval(&mut self, data: NewApproval) -> AppResult<ApprovalRecord> {
        let record = data.into_record(Utc::now());
        sqlx::query_as::<_, ApprovalRecord>(
            "INSERT INTO approvals \
             (id, target_type, target_id, action, status, snapshot, diff, comment, \
              requested_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(record.id)
        .bind(&record.target_type)
        .bind(record.target_id)
        .bind(record.action)
        .bind(record.status)
        .bind(&record.snapshot)
        .bind(&record.diff)
        .bind(&record.comment)
        .bind(record.requested_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create approval", e))
    }

    async fn save_approval(&mut self, record: &ApprovalRecord) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE approvals SET target_id = $2, status = $3, comment = $4, \
             decided_by = $5, decided_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.target_id)
        .bind(record.status)
        .bind(&record.comment)
        .bind(record.decided_by)
        .bind(record.decided_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update approval", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Approval {} not found",
                record.id
            )));
        }
        Ok(())
    }

    async fn fetch_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
    ) -> AppResult<Option<FieldMap>> {
        let row = sqlx::query(&entity::select_sql(schema))
            .bind(id.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to load {} {id}", schema.entity_type),
                    e,
                )
            })?;

        row.map(|row| entity::read_fields(schema, &row))
            .transpose()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to read {} {id}", schema.entity_type),
                    e,
                )
            })
    }

    async fn create_entity(
        &mut self,
        schema: &EntitySchema,
        fields: &FieldMap,
    ) -> AppResult<TargetId> {
        let id = TargetId::new();
        let sql = entity::insert_sql(schema);
        let mut query = sqlx::query(&sql).bind(id.into_uuid());
        for def in &schema.fields {
            let value = fields.get(&def.name).unwrap_or(&FieldValue::Null);
            query = entity::bind_value(query, &def.kind, value);
        }

        query.execute(&mut *self.tx).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to create {}", schema.entity_type),
                e,
            )
        })?;

        debug!(entity_type = %schema.entity_type, target_id = %id, "Entity created");
        Ok(id)
    }

    async fn update_entity(
        &mut self,
        schema: &EntitySchema,
        id: TargetId,
        fields: &FieldMap,
    ) -> AppResult<bool> {
        let columns: Vec<_> = schema
            .fields
            .iter()
            .filter(|def| fields.contains_key(&def.name))
            .collect();

        let Some(sql) = entity::update_sql(schema, &columns) else {
            let exists = sqlx::query(&entity::exists_sql(schema))
                .bind(id.into_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        format!("Failed to load {} {id}", schema.entity_type),
                        e,
                    )
                })?;
            return Ok(exists.is_some());
        };

        let mut query = sqlx::query(&sql).bind(id.into_uuid());
        for def in &columns {
            let value = fields.get(&def.name).unwrap_or(&FieldValue::Null);
            query = entity::bind_value(query, &def.kind, value);
        }

        let result = query.execute(&mut *self.tx).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to update {} {id}", schema.entity_type),
                e,
            )
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_entity(&mut self, schema: &EntitySchema, id: TargetId) -> AppResult<bool> {
        let result = sqlx::query(&entity::delete_sql(schema))
            .bind(id.into_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to delete {} {id}", schema.entity_type),
                    e,
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }
}
