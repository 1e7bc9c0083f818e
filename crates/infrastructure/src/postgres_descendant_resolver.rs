use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use rowguard_application::DescendantResolver;
use rowguard_core::{AppError, AppResult};
use rowguard_domain::UserId;

/// Resolves descendants through the `users.created_by` hierarchy.
#[derive(Clone)]
pub struct PostgresDescendantResolver {
    pool: PgPool,
}

impl PostgresDescendantResolver {
    /// Creates a resolver with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DescendantResolver for PostgresDescendantResolver {
    async fn descendant_ids(&self, user_id: UserId) -> AppResult<Option<BTreeSet<UserId>>> {
        // UNION drops revisited rows, so a cyclic created_by chain terminates.
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            WITH RECURSIVE descendants (id) AS (
                SELECT users.id
                FROM users
                WHERE users.created_by = $1
                UNION
                SELECT users.id
                FROM users
                INNER JOIN descendants
                    ON users.created_by = descendants.id
            )
            SELECT id FROM descendants WHERE id <> $1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to resolve descendants of user '{user_id}': {error}"
            ))
        })?;

        Ok(Some(ids.into_iter().map(UserId::new).collect()))
    }
}
