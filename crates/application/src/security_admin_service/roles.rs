use std::collections::BTreeSet;

use rowguard_domain::AuditAction;

use super::*;

use crate::{CreateRoleInput, PermissionGroupDefinition, RoleDefinition};

impl SecurityAdminService {
    /// Returns the roles of the actor's guard.
    pub async fn list_roles(&self, actor: &Principal) -> AppResult<Vec<RoleDefinition>> {
        self.require(actor, required_permissions::ROLE_LIST).await?;
        self.role_repository.list_roles(actor.guard()).await
    }

    /// Returns permission groups with the permissions of the actor's guard.
    pub async fn list_permission_groups(
        &self,
        actor: &Principal,
    ) -> AppResult<Vec<PermissionGroupDefinition>> {
        self.require(actor, required_permissions::ROLE_LIST).await?;
        self.role_repository
            .list_permission_groups(actor.guard())
            .await
    }

    /// Creates a role in the actor's guard and team.
    pub async fn create_role(
        &self,
        actor: &Principal,
        name: RoleName,
        permissions: Vec<String>,
    ) -> AppResult<RoleDefinition> {
        self.require(actor, required_permissions::ROLE_CREATE)
            .await?;

        let role = self
            .role_repository
            .create_role(CreateRoleInput {
                name,
                guard_name: actor.guard().clone(),
                team_id: actor.team_id(),
                permissions,
                created_by: Some(actor.id()),
            })
            .await?;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityRoleCreated,
                resource_type: "role".to_owned(),
                resource_id: role.role.id().to_string(),
                detail: Some(format!(
                    "created role '{}' with {} permissions",
                    role.role.name(),
                    role.permissions.len()
                )),
            },
        )
        .await?;

        Ok(role)
    }

    /// Deletes a role. The root role cannot be deleted.
    pub async fn delete_role(&self, actor: &Principal, name: &RoleName) -> AppResult<()> {
        self.require(actor, required_permissions::ROLE_DELETE)
            .await?;

        if name.is_root() {
            return Err(AppError::Conflict(format!(
                "role '{name}' is required and cannot be deleted"
            )));
        }

        let role = self.resolve_role(actor, name).await?;
        self.role_repository.delete_role(role.id()).await?;
        self.invalidate_catalog().await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityRoleDeleted,
                resource_type: "role".to_owned(),
                resource_id: role.id().to_string(),
                detail: Some(format!("deleted role '{name}'")),
            },
        )
        .await
    }

    /// Replaces a role's permission set with exactly the named permissions.
    pub async fn sync_role_permissions(
        &self,
        actor: &Principal,
        name: &RoleName,
        permissions: BTreeSet<String>,
    ) -> AppResult<()> {
        self.require(actor, required_permissions::ROLE_EDIT).await?;

        let role = self.resolve_role(actor, name).await?;
        self.role_repository
            .replace_role_permissions(role.id(), &permissions, Some(actor.id()))
            .await?;
        self.invalidate_catalog().await;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityRolePermissionsSynced,
                resource_type: "role".to_owned(),
                resource_id: role.id().to_string(),
                detail: Some(format!(
                    "role '{name}' now owns [{}]",
                    permissions.iter().cloned().collect::<Vec<_>>().join(", ")
                )),
            },
        )
        .await
    }

    /// Changes the controller label of a permission group.
    pub async fn relabel_permission_group(
        &self,
        actor: &Principal,
        group_name: &str,
        controller: &str,
    ) -> AppResult<rowguard_domain::PermissionGroup> {
        self.require(actor, required_permissions::PERMISSION_EDIT)
            .await?;

        let group = self
            .role_repository
            .relabel_group(group_name, controller.trim())
            .await?;

        self.audit(
            actor,
            AuditEvent {
                actor: None,
                action: AuditAction::SecurityGroupRelabeled,
                resource_type: "permission_group".to_owned(),
                resource_id: group.id().to_string(),
                detail: Some(format!(
                    "group '{}' now belongs to '{}'",
                    group.name(),
                    group.controller()
                )),
            },
        )
        .await?;

        Ok(group)
    }
}
