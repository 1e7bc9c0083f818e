use std::collections::BTreeSet;

use async_trait::async_trait;

use rowguard_core::{AppResult, GuardName, TeamId};
use rowguard_domain::{Permission, PermissionGroup, PermissionId, Role, RoleId, RoleName, UserId};

use super::assignments::PrincipalAssignments;
use super::roles::{CreateRoleInput, PermissionGroupDefinition, RoleDefinition};

/// Repository port for the role and permission stores.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists every role of a guard with its permission names.
    async fn list_roles(&self, guard: &GuardName) -> AppResult<Vec<RoleDefinition>>;

    /// Finds a role by name inside a guard.
    ///
    /// With a team, a role of that team wins over a global role of the same
    /// name. Without a team only global roles match.
    async fn find_role(
        &self,
        guard: &GuardName,
        team_id: Option<TeamId>,
        name: &RoleName,
    ) -> AppResult<Option<Role>>;

    /// Creates a role and attaches the named permissions of its guard.
    ///
    /// Fails with `Conflict` when the name is taken and `NotFound` when a
    /// permission name does not exist in the guard.
    async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition>;

    /// Deletes a role and its assignments.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Replaces the role's permission set with exactly the named permissions.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &BTreeSet<String>,
        updated_by: Option<UserId>,
    ) -> AppResult<()>;

    /// Finds a permission by name inside a guard.
    async fn find_permission(
        &self,
        guard: &GuardName,
        name: &str,
    ) -> AppResult<Option<Permission>>;

    /// Lists permission groups with the guard's permissions.
    async fn list_permission_groups(
        &self,
        guard: &GuardName,
    ) -> AppResult<Vec<PermissionGroupDefinition>>;

    /// Changes the controller label of a group.
    async fn relabel_group(
        &self,
        group_name: &str,
        controller: &str,
    ) -> AppResult<PermissionGroup>;
}

/// Repository port for principal-to-role and principal-to-permission links.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Links a role to a principal. Returns `false` when already linked.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool>;

    /// Unlinks a role from a principal. Returns `false` when no link existed.
    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool>;

    /// Links a direct permission to a principal. Returns `false` when already linked.
    async fn grant_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool>;

    /// Unlinks a direct permission. Returns `false` when no link existed.
    async fn revoke_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool>;

    /// Lists the roles and direct permissions of a principal in a guard.
    async fn list_assignments(
        &self,
        user_id: UserId,
        guard: &GuardName,
    ) -> AppResult<PrincipalAssignments>;
}
