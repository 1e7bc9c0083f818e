use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use rowguard_application::{
    AssignmentRepository, CreateRoleInput, PermissionGroupDefinition, PrincipalAssignments,
    RoleDefinition, RoleRepository,
};
use rowguard_core::{AppError, AppResult, GuardName, TeamId};
use rowguard_domain::{
    Permission, PermissionGroup, PermissionId, Role, RoleId, RoleName, UserId,
};

use crate::postgres_rows::{
    PermissionGroupRow, PermissionRow, RolePermissionRow, RoleRow, aggregate_roles,
};

mod assignments;
mod roles;

/// PostgreSQL-backed repository for role administration and assignments.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresSecurityAdminRepository {
    async fn list_roles(&self, guard: &GuardName) -> AppResult<Vec<RoleDefinition>> {
        self.list_roles_impl(guard).await
    }

    async fn find_role(
        &self,
        guard: &GuardName,
        team_id: Option<TeamId>,
        name: &RoleName,
    ) -> AppResult<Option<Role>> {
        self.find_role_impl(guard, team_id, name).await
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition> {
        self.create_role_impl(input).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &BTreeSet<String>,
        updated_by: Option<UserId>,
    ) -> AppResult<()> {
        self.replace_role_permissions_impl(role_id, permissions, updated_by)
            .await
    }

    async fn find_permission(
        &self,
        guard: &GuardName,
        name: &str,
    ) -> AppResult<Option<Permission>> {
        self.find_permission_impl(guard, name).await
    }

    async fn list_permission_groups(
        &self,
        guard: &GuardName,
    ) -> AppResult<Vec<PermissionGroupDefinition>> {
        self.list_permission_groups_impl(guard).await
    }

    async fn relabel_group(
        &self,
        group_name: &str,
        controller: &str,
    ) -> AppResult<PermissionGroup> {
        self.relabel_group_impl(group_name, controller).await
    }
}

#[async_trait]
impl AssignmentRepository for PostgresSecurityAdminRepository {
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        self.assign_role_impl(user_id, role_id).await
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        self.remove_role_impl(user_id, role_id).await
    }

    async fn grant_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        self.grant_permission_impl(user_id, permission_id).await
    }

    async fn revoke_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        self.revoke_permission_impl(user_id, permission_id).await
    }

    async fn list_assignments(
        &self,
        user_id: UserId,
        guard: &GuardName,
    ) -> AppResult<PrincipalAssignments> {
        self.list_assignments_impl(user_id, guard).await
    }
}

/// Resolves permission names of a guard to ids, failing on the first unknown name.
pub(crate) async fn resolve_permission_ids(
    transaction: &mut Transaction<'_, Postgres>,
    guard: &GuardName,
    names: &[String],
) -> AppResult<Vec<i64>> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        r#"
        SELECT id, name
        FROM permissions
        WHERE guard_name = $1 AND name = ANY($2)
        "#,
    )
    .bind(guard.as_str())
    .bind(names)
    .fetch_all(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to resolve permissions: {error}")))?;

    if let Some(missing) = names
        .iter()
        .find(|name| !rows.iter().any(|(_, found)| found == *name))
    {
        return Err(AppError::NotFound(format!(
            "permission '{missing}' was not found in guard '{guard}'"
        )));
    }

    Ok(rows.into_iter().map(|(id, _)| id).collect())
}

fn map_role_conflict(error: sqlx::Error, role_name: &RoleName) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to create role: {error}"))
}

#[cfg(test)]
mod tests;
