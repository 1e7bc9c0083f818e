use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn assign_role_impl(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO model_has_roles (role_id, model_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_i64())
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn remove_role_impl(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM model_has_roles
            WHERE role_id = $1 AND model_id = $2
            "#,
        )
        .bind(role_id.as_i64())
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role assignment: {error}"))
        })?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn grant_permission_impl(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO model_has_permissions (permission_id, model_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(permission_id.as_i64())
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to grant permission: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn revoke_permission_impl(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM model_has_permissions
            WHERE permission_id = $1 AND model_id = $2
            "#,
        )
        .bind(permission_id.as_i64())
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke permission: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn list_assignments_impl(
        &self,
        user_id: UserId,
        guard: &GuardName,
    ) -> AppResult<PrincipalAssignments> {
        let roles = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.guard_name,
                roles.team_id,
                roles.created_by,
                roles.updated_by
            FROM model_has_roles
            INNER JOIN roles
                ON roles.id = model_has_roles.role_id
            WHERE model_has_roles.model_id = $1
                AND roles.guard_name = $2
            ORDER BY roles.name
            "#,
        )
        .bind(user_id.as_i64())
        .bind(guard.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list roles of user '{user_id}': {error}"))
        })?
        .into_iter()
        .map(RoleRow::into_domain)
        .collect::<AppResult<Vec<_>>>()?;

        let direct_permissions = sqlx::query_as::<_, PermissionRow>(
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
            ORDER BY permissions.name
            "#,
        )
        .bind(user_id.as_i64())
        .bind(guard.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list direct permissions of user '{user_id}': {error}"
            ))
        })?
        .into_iter()
        .map(PermissionRow::into_domain)
        .collect::<AppResult<Vec<_>>>()?;

        Ok(PrincipalAssignments {
            user_id,
            roles,
            direct_permissions,
        })
    }
}
