use rowguard_core::{GuardName, TeamId};
use rowguard_domain::{Permission, PermissionGroup, Role, RoleName, UserId};

/// Role definition returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Stored role.
    pub role: Role,
    /// Names of the permissions the role owns, sorted.
    pub permissions: Vec<String>,
}

/// Permission group with the permissions it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGroupDefinition {
    /// Stored group.
    pub group: PermissionGroup,
    /// Permissions owned by the group, sorted by name.
    pub permissions: Vec<Permission>,
}

/// Input payload for creating roles outside reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Role name, unique per guard and team.
    pub name: RoleName,
    /// Guard the role belongs to.
    pub guard_name: GuardName,
    /// Owning team, `None` for a global role.
    pub team_id: Option<TeamId>,
    /// Names of the permissions to attach.
    pub permissions: Vec<String>,
    /// Principal creating the role.
    pub created_by: Option<UserId>,
}
