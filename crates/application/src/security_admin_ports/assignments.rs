use rowguard_domain::{Permission, Role, UserId};

/// Roles and direct permissions currently linked to one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalAssignments {
    /// Principal identifier.
    pub user_id: UserId,
    /// Assigned roles.
    pub roles: Vec<Role>,
    /// Directly granted permissions.
    pub direct_permissions: Vec<Permission>,
}
