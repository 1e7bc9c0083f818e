use rowguard_domain::{AuditAction, UserId};

use super::*;

use crate::PrincipalAssignments;

impl SecurityAdminService {
    /// Returns the roles and direct permissions of a user in the actor's guard.
    pub async fn list_assignments(
        &self,
        actor: &Principal,
        user_id: UserId,
    ) -> AppResult<PrincipalAssignments> {
        self.require(actor, required_permissions::USER_EDIT).await?;
        self.assignment_repository
            .list_assignments(user_id, actor.guard())
            .await
    }

    /// Assigns a role to a user. Assigning a held role is a no-op.
    pub async fn assign_role(
        &self,
        actor: &Principal,
        user_id: UserId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        self.require(actor, required_permissions::USER_EDIT).await?;

        let role = self.resolve_role(actor, role_name).await?;
        if !self
            .assignment_repository
            .assign_role(user_id, role.id())
            .await?
        {
            return Ok(());
        }
        self.invalidate_principal(user_id).await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityRoleAssigned,
                resource_type: "model_has_roles".to_owned(),
                resource_id: format!("{user_id}:{}", role.id()),
                detail: Some(format!("assigned role '{role_name}' to user '{user_id}'")),
            },
        )
        .await
    }

    /// Removes a role from a user.
    pub async fn unassign_role(
        &self,
        actor: &Principal,
        user_id: UserId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        self.require(actor, required_permissions::USER_EDIT).await?;

        let role = self.resolve_role(actor, role_name).await?;
        if !self
            .assignment_repository
            .remove_role(user_id, role.id())
            .await?
        {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' does not hold role '{role_name}'"
            )));
        }
        self.invalidate_principal(user_id).await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityRoleUnassigned,
                resource_type: "model_has_roles".to_owned(),
                resource_id: format!("{user_id}:{}", role.id()),
                detail: Some(format!("removed role '{role_name}' from user '{user_id}'")),
            },
        )
        .await
    }

    /// Grants a permission directly to a user, on top of role grants.
    pub async fn grant_permission(
        &self,
        actor: &Principal,
        user_id: UserId,
        permission_name: &str,
    ) -> AppResult<()> {
        self.require(actor, required_permissions::USER_EDIT).await?;

        let permission = self
            .resolve_permission(actor.guard(), permission_name)
            .await?;
        if !self
            .assignment_repository
            .grant_permission(user_id, permission.id())
            .await?
        {
            return Ok(());
        }
        self.invalidate_principal(user_id).await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityPermissionGranted,
                resource_type: "model_has_permissions".to_owned(),
                resource_id: format!("{user_id}:{}", permission.id()),
                detail: Some(format!(
                    "granted permission '{permission_name}' to user '{user_id}'"
                )),
            },
        )
        .await
    }

    /// Revokes a directly granted permission. Role grants are untouched.
    pub async fn revoke_permission(
        &self,
        actor: &Principal,
        user_id: UserId,
        permission_name: &str,
    ) -> AppResult<()> {
        self.require(actor, required_permissions::USER_EDIT).await?;

        let permission = self
            .resolve_permission(actor.guard(), permission_name)
            .await?;
        if !self
            .assignment_repository
            .revoke_permission(user_id, permission.id())
            .await?
        {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' has no direct grant of '{permission_name}'"
            )));
        }
        self.invalidate_principal(user_id).await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityPermissionRevoked,
                resource_type: "model_has_permissions".to_owned(),
                resource_id: format!("{user_id}:{}", permission.id()),
                detail: Some(format!(
                    "revoked permission '{permission_name}' from user '{user_id}'"
                )),
            },
        )
        .await
    }
}
