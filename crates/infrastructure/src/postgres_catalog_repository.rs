use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use rowguard_application::{CatalogRepository, CatalogSnapshot, ReconciliationPlan};
use rowguard_core::{AppError, AppResult, GuardName};

use crate::postgres_rows::{PermissionGroupRow, PermissionRow, RolePermissionRow, aggregate_roles};

/// PostgreSQL-backed repository applying catalog reconciliation plans.
#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn load_snapshot(&self, guard: &GuardName) -> AppResult<CatalogSnapshot> {
        let groups = sqlx::query_as::<_, PermissionGroupRow>(
            "SELECT id, name, controller FROM permission_groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission groups: {error}")))?
        .into_iter()
        .map(PermissionGroupRow::into_domain)
        .collect::<AppResult<Vec<_>>>()?;

        let permissions = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, permissiongroup_id, name, guard_name, methods
            FROM permissions
            ORDER BY guard_name, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permissions: {error}")))?
        .into_iter()
        .map(PermissionRow::into_domain)
        .collect::<AppResult<Vec<_>>>()?;

        let role_rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.guard_name,
                roles.team_id,
                roles.created_by,
                roles.updated_by,
                permissions.name AS permission
            FROM roles
            LEFT JOIN role_has_permissions
                ON role_has_permissions.role_id = roles.id
            LEFT JOIN permissions
                ON permissions.id = role_has_permissions.permission_id
            WHERE roles.guard_name = $1
                AND roles.team_id IS NULL
            ORDER BY roles.name, roles.id, permissions.name
            "#,
        )
        .bind(guard.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

        Ok(CatalogSnapshot {
            groups,
            permissions,
            roles: aggregate_roles(role_rows)?,
        })
    }

    async fn apply_plan(&self, plan: &ReconciliationPlan) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        prune(&mut transaction, plan).await?;
        upsert_groups(&mut transaction, plan).await?;
        upsert_permissions(&mut transaction, plan).await?;
        sync_roles(&mut transaction, plan).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit reconciliation: {error}"))
        })
    }
}

async fn prune(
    transaction: &mut Transaction<'_, Postgres>,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    let permission_ids: Vec<i64> = plan
        .delete_permissions
        .iter()
        .map(|permission| permission.id.as_i64())
        .collect();
    if !permission_ids.is_empty() {
        sqlx::query("DELETE FROM permissions WHERE id = ANY($1)")
            .bind(permission_ids)
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete stale permissions: {error}"))
            })?;
    }

    let group_ids: Vec<i64> = plan
        .delete_groups
        .iter()
        .map(|group| group.id.as_i64())
        .collect();
    if !group_ids.is_empty() {
        sqlx::query("DELETE FROM permission_groups WHERE id = ANY($1)")
            .bind(group_ids)
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete stale permission groups: {error}"))
            })?;
    }

    Ok(())
}

async fn upsert_groups(
    transaction: &mut Transaction<'_, Postgres>,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    for group in plan.create_groups.iter().chain(&plan.relabel_groups) {
        sqlx::query(
            r#"
            INSERT INTO permission_groups (name, controller)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE
            SET controller = EXCLUDED.controller, updated_at = now()
            "#,
        )
        .bind(group.name.as_str())
        .bind(group.controller.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert permission group '{}': {error}",
                group.name
            ))
        })?;
    }

    Ok(())
}

async fn upsert_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    for permission in plan
        .create_permissions
        .iter()
        .chain(&plan.update_permissions)
    {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO permissions (permissiongroup_id, name, guard_name, methods)
            SELECT permission_groups.id, $2, $3, $4
            FROM permission_groups
            WHERE permission_groups.name = $1
            ON CONFLICT (name, guard_name) DO UPDATE
            SET permissiongroup_id = EXCLUDED.permissiongroup_id,
                methods = EXCLUDED.methods,
                updated_at = now()
            "#,
        )
        .bind(permission.group.as_str())
        .bind(permission.name.as_str())
        .bind(plan.guard.as_str())
        .bind(permission.methods.as_slice())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert permission '{}': {error}",
                permission.name
            ))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Internal(format!(
                "permission group '{}' vanished while reconciling '{}'",
                permission.group, permission.name
            )));
        }
    }

    Ok(())
}

async fn sync_roles(
    transaction: &mut Transaction<'_, Postgres>,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    for role in &plan.create_roles {
        sqlx::query(
            r#"
            INSERT INTO roles (team_id, name, guard_name)
            VALUES (NULL, $1, $2)
            ON CONFLICT ON CONSTRAINT roles_team_id_name_guard_name_unique DO NOTHING
            "#,
        )
        .bind(role.as_str())
        .bind(plan.guard.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to create role '{role}': {error}"))
        })?;
    }

    for change in &plan.sync_roles {
        let role_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM roles
            WHERE name = $1 AND guard_name = $2 AND team_id IS NULL
            "#,
        )
        .bind(change.role.as_str())
        .bind(plan.guard.as_str())
        .fetch_one(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve role '{}': {error}", change.role))
        })?;

        sqlx::query("DELETE FROM role_has_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to clear permissions of role '{}': {error}",
                    change.role
                ))
            })?;

        let names: Vec<String> = change.permissions.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO role_has_permissions (permission_id, role_id)
            SELECT permissions.id, $1
            FROM permissions
            WHERE permissions.guard_name = $2 AND permissions.name = ANY($3)
            "#,
        )
        .bind(role_id)
        .bind(plan.guard.as_str())
        .bind(names)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to sync permissions of role '{}': {error}",
                change.role
            ))
        })?;
    }

    Ok(())
}
