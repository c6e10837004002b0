//! PostgreSQL approval store.

use async_trait::async_trait;
use sqlx::PgPool;

use approval_core::error::{AppError, ErrorKind};
use approval_core::result::AppResult;
use approval_core::types::{ApprovalId, PageRequest, PageResponse, TargetId};
use approval_entity::approval::{ApprovalFilter, ApprovalRecord, ApprovalStatus};

use super::transaction::PgApprovalTransaction;
use crate::connection::DatabasePool;
use crate::store::{ApprovalStore, ApprovalTransaction, StatusCounts};

/// Store backed by the `approvals` table and the registered entity tables.
#[derive(Debug, Clone)]
pub struct PgApprovalStore {
    pool: PgPool,
}

impl PgApprovalStore {
    /// Create a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a store sharing a connected pool.
    pub fn from_database(db: &DatabasePool) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl ApprovalStore for PgApprovalStore {
    async fn begin(&self) -> AppResult<Box<dyn ApprovalTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgApprovalTransaction::new(tx)))
    }

    async fn find_by_id(&self, id: ApprovalId) -> AppResult<Option<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>("SELECT * FROM approvals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find approval", e))
    }

    async fn find_pending_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approvals \
             WHERE target_type = $1 AND target_id = $2 AND status = 'pending' \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find pending approvals", e)
        })
    }

    async fn find_for_target(
        &self,
        target_type: &str,
        target_id: TargetId,
    ) -> AppResult<Vec<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approvals WHERE target_type = $1 AND target_id = $2 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find target approvals", e)
        })
    }

    async fn find_by_filter(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ApprovalRecord>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if filter.target_type.is_some() {
            conditions.push(format!("target_type = ${param_idx}"));
            param_idx += 1;
        }
        if filter.target_id.is_some() {
            conditions.push(format!("target_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if filter.action.is_some() {
            conditions.push(format!("action = ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM approvals {where_clause}");
        let select_sql = format!(
            "SELECT * FROM approvals {where_clause} \
             ORDER BY target_type ASC, target_id ASC NULLS FIRST, created_at ASC, id ASC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query_as::<_, ApprovalRecord>(&select_sql);

        if let Some(tt) = &filter.target_type {
            count_query = count_query.bind(tt.clone());
            select_query = select_query.bind(tt.clone());
        }
        if let Some(tid) = filter.target_id {
            count_query = count_query.bind(tid);
            select_query = select_query.bind(tid);
        }
        if let Some(status) = filter.status {
            count_query = count_query.bind(status);
            select_query = select_query.bind(status);
        }
        if let Some(action) = filter.action {
            count_query = count_query.bind(action);
            select_query = select_query.bind(action);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count approvals", e)
        })?;

        let limit = sql_bound(page.limit(), "page size")?;
        let offset = sql_bound(page.offset(), "page offset")?;

        let records = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list approvals", e)
            })?;

        Ok(PageResponse::new(records, page, total as u64))
    }

    async fn count_by_status(&self, target_type: Option<&str>) -> AppResult<StatusCounts> {
        let rows = match target_type {
            Some(tt) => {
                sqlx::query_as::<_, (ApprovalStatus, i64)>(
                    "SELECT status, COUNT(*) FROM approvals WHERE target_type = $1 GROUP BY status",
                )
                .bind(tt)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, (ApprovalStatus, i64)>(
                    "SELECT status, COUNT(*) FROM approvals GROUP BY status",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count approvals", e))?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            counts.add(status, count as u64);
        }
        Ok(counts)
    }
}

/// Convert a paging bound to the `BIGINT` PostgreSQL expects.
fn sql_bound(value: u64, what: &str) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|_| AppError::validation(format!("{what} {value} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_bound_rejects_values_past_bigint() {
        assert_eq!(sql_bound(40, "page offset").unwrap(), 40);
        let err = sql_bound(u64::MAX, "page offset").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
