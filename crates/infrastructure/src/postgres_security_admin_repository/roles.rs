use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_roles_impl(&self, guard: &GuardName) -> AppResult<Vec<RoleDefinition>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
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
            ORDER BY roles.name, roles.id, permissions.name
            "#,
        )
        .bind(guard.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    pub(super) async fn find_role_impl(
        &self,
        guard: &GuardName,
        team_id: Option<TeamId>,
        name: &RoleName,
    ) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, guard_name, team_id, created_by, updated_by
            FROM roles
            WHERE guard_name = $1
                AND name = $2
                AND (team_id = $3 OR team_id IS NULL)
            ORDER BY team_id NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(guard.as_str())
        .bind(name.as_str())
        .bind(team_id.map(|team_id| team_id.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role '{name}': {error}")))?
        .map(RoleRow::into_domain)
        .transpose()
    }

    pub(super) async fn create_role_impl(
        &self,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (team_id, name, guard_name, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, guard_name, team_id, created_by, updated_by
            "#,
        )
        .bind(input.team_id.map(|team_id| team_id.as_uuid()))
        .bind(input.name.as_str())
        .bind(input.guard_name.as_str())
        .bind(input.created_by.map(|user_id| user_id.as_i64()))
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, &input.name))?;

        let permissions: Vec<String> = input
            .permissions
            .iter()
            .map(|name| name.trim().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let permission_ids =
            resolve_permission_ids(&mut transaction, &input.guard_name, &permissions).await?;

        sqlx::query(
            r#"
            INSERT INTO role_has_permissions (permission_id, role_id)
            SELECT permission_id, $2
            FROM UNNEST($1::BIGINT[]) AS permission_id
            "#,
        )
        .bind(permission_ids)
        .bind(row.id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grants: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(RoleDefinition {
            role: row.into_domain()?,
            permissions,
        })
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn replace_role_permissions_impl(
        &self,
        role_id: RoleId,
        permissions: &BTreeSet<String>,
        updated_by: Option<UserId>,
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let guard_name = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE roles
            SET updated_by = $2, updated_at = now()
            WHERE id = $1
            RETURNING guard_name
            "#,
        )
        .bind(role_id.as_i64())
        .bind(updated_by.map(|user_id| user_id.as_i64()))
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        let guard = GuardName::new(guard_name)?;

        let names: Vec<String> = permissions.iter().cloned().collect();
        let permission_ids = resolve_permission_ids(&mut transaction, &guard, &names).await?;

        sqlx::query("DELETE FROM role_has_permissions WHERE role_id = $1")
            .bind(role_id.as_i64())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role grants: {error}"))
            })?;

        sqlx::query(
            r#"
            INSERT INTO role_has_permissions (permission_id, role_id)
            SELECT permission_id, $2
            FROM UNNEST($1::BIGINT[]) AS permission_id
            "#,
        )
        .bind(permission_ids)
        .bind(role_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grants: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn find_permission_impl(
        &self,
        guard: &GuardName,
        name: &str,
    ) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, permissiongroup_id, name, guard_name, methods
            FROM permissions
            WHERE guard_name = $1 AND name = $2
            "#,
        )
        .bind(guard.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find permission '{name}': {error}"))
        })?
        .map(PermissionRow::into_domain)
        .transpose()
    }

    pub(super) async fn list_permission_groups_impl(
        &self,
        guard: &GuardName,
    ) -> AppResult<Vec<PermissionGroupDefinition>> {
        let groups = sqlx::query_as::<_, PermissionGroupRow>(
            "SELECT id, name, controller FROM permission_groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list permission groups: {error}"))
        })?;

        let permissions = sqlx::query_as::<_, PermissionRow>(
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
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?
        .into_iter()
        .map(PermissionRow::into_domain)
        .collect::<AppResult<Vec<_>>>()?;

        groups
            .into_iter()
            .map(|row| {
                let group = row.into_domain()?;
                let permissions = permissions
                    .iter()
                    .filter(|permission| permission.group_id() == group.id())
                    .cloned()
                    .collect();
                Ok(PermissionGroupDefinition { group, permissions })
            })
            .collect()
    }

    pub(super) async fn relabel_group_impl(
        &self,
        group_name: &str,
        controller: &str,
    ) -> AppResult<PermissionGroup> {
        sqlx::query_as::<_, PermissionGroupRow>(
            r#"
            UPDATE permission_groups
            SET controller = $2, updated_at = now()
            WHERE name = $1
            RETURNING id, name, controller
            "#,
        )
        .bind(group_name)
        .bind(controller.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to relabel group '{group_name}': {error}"))
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!("permission group '{group_name}' was not found"))
        })?
        .into_domain()
    }
}
