use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use rowguard_application::ScopedRecordRepository;
use rowguard_core::{AppError, AppResult};
use rowguard_domain::{RecordId, RecordType, RowFilter, ScopedRecord, UserId};

/// PostgreSQL-backed repository for scoped business records.
#[derive(Clone)]
pub struct PostgresScopedRecordRepository {
    pool: PgPool,
}

impl PostgresScopedRecordRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ScopedRecordRow {
    id: i64,
    record_type: String,
    created_by: Option<i64>,
    data: Value,
}

impl ScopedRecordRow {
    fn into_domain(self) -> AppResult<ScopedRecord> {
        let id = self.id;
        RecordType::new(self.record_type)
            .and_then(|record_type| {
                ScopedRecord::new(
                    RecordId::new(self.id),
                    record_type,
                    self.created_by.map(UserId::new),
                    self.data,
                )
            })
            .map_err(|error| {
                AppError::Internal(format!("failed to decode scoped record '{id}': {error}"))
            })
    }
}

/// Appends the row filter as a predicate on `created_by`.
fn push_row_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RowFilter) {
    match filter {
        RowFilter::Unrestricted => {}
        RowFilter::CreatedByIn(creators) => {
            let creators: Vec<i64> = creators.iter().map(UserId::as_i64).collect();
            builder.push(" AND created_by = ANY(");
            builder.push_bind(creators);
            builder.push(")");
        }
        RowFilter::DenyAll => {
            builder.push(" AND FALSE");
        }
    }
}

#[async_trait]
impl ScopedRecordRepository for PostgresScopedRecordRepository {
    async fn list_records(
        &self,
        record_type: &RecordType,
        filter: &RowFilter,
    ) -> AppResult<Vec<ScopedRecord>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, record_type, created_by, data FROM scoped_records WHERE record_type = ",
        );
        builder.push_bind(record_type.as_str());
        push_row_filter(&mut builder, filter);
        builder.push(" ORDER BY id");

        builder
            .build_query_as::<ScopedRecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to list '{record_type}' records: {error}"
                ))
            })?
            .into_iter()
            .map(ScopedRecordRow::into_domain)
            .collect()
    }

    async fn find_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<Option<ScopedRecord>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, record_type, created_by, data FROM scoped_records WHERE record_type = ",
        );
        builder.push_bind(record_type.as_str());
        builder.push(" AND id = ");
        builder.push_bind(record_id.as_i64());
        push_row_filter(&mut builder, filter);

        builder
            .build_query_as::<ScopedRecordRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find '{record_type}' record '{record_id}': {error}"
                ))
            })?
            .map(ScopedRecordRow::into_domain)
            .transpose()
    }

    async fn create_record(
        &self,
        record_type: &RecordType,
        created_by: UserId,
        data: Value,
    ) -> AppResult<ScopedRecord> {
        sqlx::query_as::<_, ScopedRecordRow>(
            r#"
            INSERT INTO scoped_records (record_type, created_by, data)
            VALUES ($1, $2, $3)
            RETURNING id, record_type, created_by, data
            "#,
        )
        .bind(record_type.as_str())
        .bind(created_by.as_i64())
        .bind(data)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to create '{record_type}' record: {error}"))
        })?
        .into_domain()
    }

    async fn delete_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("DELETE FROM scoped_records WHERE record_type = ");
        builder.push_bind(record_type.as_str());
        builder.push(" AND id = ");
        builder.push_bind(record_id.as_i64());
        push_row_filter(&mut builder, filter);

        let rows_affected = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to delete '{record_type}' record '{record_id}': {error}"
                ))
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
