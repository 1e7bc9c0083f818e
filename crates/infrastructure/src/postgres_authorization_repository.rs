use async_trait::async_trait;
use sqlx::PgPool;

use rowguard_application::{AuthorizationRepository, PrincipalGrants};
use rowguard_core::{AppError, AppResult, GuardName};
use rowguard_domain::{Permission, Principal, RoleName};

use crate::postgres_rows::PermissionRow;

/// PostgreSQL-backed repository for principal permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_role_names(&self, principal: &Principal) -> AppResult<Vec<RoleName>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT roles.name
            FROM model_has_roles
            INNER JOIN roles
                ON roles.id = model_has_roles.role_id
            WHERE model_has_roles.model_id = $1
                AND roles.guard_name = $2
                AND (roles.team_id IS NULL OR roles.team_id = $3)
            ORDER BY roles.name
            "#,
        )
        .bind(principal.id().as_i64())
        .bind(principal.guard().as_str())
        .bind(principal.team_id().map(|team_id| team_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load roles for user '{}': {error}",
                principal.id()
            ))
        })?;

        names
            .into_iter()
            .map(|name| {
                RoleName::parse(name.as_str()).map_err(|error| {
                    AppError::Internal(format!("failed to decode role '{name}': {error}"))
                })
            })
            .collect()
    }

    async fn list_role_permissions(&self, principal: &Principal) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT
                permissions.id,
                permissions.permissiongroup_id,
                permissions.name,
                permissions.guard_name,
                permissions.methods
            FROM model_has_roles
            INNER JOIN roles
                ON roles.id = model_has_roles.role_id
            INNER JOIN role_has_permissions
                ON role_has_permissions.role_id = roles.id
            INNER JOIN permissions
                ON permissions.id = role_has_permissions.permission_id
            WHERE model_has_roles.model_id = $1
                AND roles.guard_name = $2
                AND (roles.team_id IS NULL OR roles.team_id = $3)
                AND permissions.guard_name = $2
            "#,
        )
        .bind(principal.id().as_i64())
        .bind(principal.guard().as_str())
        .bind(principal.team_id().map(|team_id| team_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load role permissions for user '{}': {error}",
                principal.id()
            ))
        })?;

        rows.into_iter().map(PermissionRow::into_domain).collect()
    }

    async fn list_direct_permissions(&self, principal: &Principal) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permissions.id,
                permissions.permissiongroup_id,
                permissions.name,
                permissions.guard_name,
                permissions.methods
            FROM model_has_permissions
            INNER JOIN permissions
                ON permissions.id = model_has_permissions.permission_id
            WHERE model_has_permissions.model_id = $1
                AND permissions.guard_name = $2
            "#,
        )
        .bind(principal.id().as_i64())
        .bind(principal.guard().as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load direct permissions for user '{}': {error}",
                principal.id()
            ))
        })?;

        rows.into_iter().map(PermissionRow::into_domain).collect()
    }
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn load_principal_grants(&self, principal: &Principal) -> AppResult<PrincipalGrants> {
        Ok(PrincipalGrants {
            roles: self.list_role_names(principal).await?,
            role_permissions: self.list_role_permissions(principal).await?,
            direct_permissions: self.list_direct_permissions(principal).await?,
        })
    }

    async fn list_guard_permissions(&self, guard: &GuardName) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, permissiongroup_id, name, guard_name, methods
            FROM permissions
            WHERE guard_name = $1
            ORDER BY name
            "#,
        )
        .bind(guard.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list permissions for guard '{guard}': {error}"
            ))
        })?;

        rows.into_iter().map(PermissionRow::into_domain).collect()
    }
}
