use async_trait::async_trait;
use rowguard_core::{AppResult, GuardName};
use rowguard_domain::{Permission, Principal, RoleName};

/// Raw grants of one principal, restricted to its guard and team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalGrants {
    /// Names of the roles assigned to the principal.
    pub roles: Vec<RoleName>,
    /// Permissions owned by the assigned roles.
    pub role_permissions: Vec<Permission>,
    /// Permissions granted directly to the principal.
    pub direct_permissions: Vec<Permission>,
}

/// Repository port for permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Loads the roles and grants that apply to a principal.
    ///
    /// Only roles and permissions of the principal's guard count, and team
    /// roles only count inside the principal's active team.
    async fn load_principal_grants(&self, principal: &Principal) -> AppResult<PrincipalGrants>;

    /// Lists every permission stored for a guard.
    async fn list_guard_permissions(&self, guard: &GuardName) -> AppResult<Vec<Permission>>;
}
