use std::sync::Arc;

use rowguard_core::{AppError, AppResult, GuardName};
use rowguard_domain::{Permission, Principal, Role, RoleName};

use crate::query_cache_service::{AUTHORIZATION_CATALOG_TAG, principal_tag};
use crate::{
    AssignmentRepository, AuditEvent, AuditRepository, AuthorizationService, QueryCacheService,
    RoleRepository,
};

mod assignments;
mod roles;

/// Permission names an actor must hold to administer roles and grants.
pub mod required_permissions {
    /// Listing roles and permission groups.
    pub const ROLE_LIST: &str = "role-list";
    /// Creating roles.
    pub const ROLE_CREATE: &str = "role-create";
    /// Changing a role's permission set.
    pub const ROLE_EDIT: &str = "role-edit";
    /// Deleting roles.
    pub const ROLE_DELETE: &str = "role-delete";
    /// Relabeling permission groups.
    pub const PERMISSION_EDIT: &str = "permission-edit";
    /// Changing a user's roles and direct permissions.
    pub const USER_EDIT: &str = "user-edit";
}

/// Application service for role and assignment administration.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    cache: QueryCacheService,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        cache: QueryCacheService,
    ) -> Self {
        Self {
            authorization_service,
            role_repository,
            assignment_repository,
            audit_repository,
            cache,
        }
    }

    async fn require(&self, actor: &Principal, permission_name: &str) -> AppResult<()> {
        self.authorization_service
            .require_permission(Some(actor), permission_name)
            .await
    }

    async fn resolve_role(&self, actor: &Principal, role_name: &RoleName) -> AppResult<Role> {
        self.role_repository
            .find_role(actor.guard(), actor.team_id(), role_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "role '{role_name}' was not found in guard '{}'",
                    actor.guard()
                ))
            })
    }

    async fn resolve_permission(
        &self,
        guard: &GuardName,
        permission_name: &str,
    ) -> AppResult<Permission> {
        self.role_repository
            .find_permission(guard, permission_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission '{permission_name}' was not found in guard '{guard}'"
                ))
            })
    }

    async fn audit(&self, actor: &Principal, event: AuditEvent) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                actor: Some(actor.id()),
                ..event
            })
            .await
    }

    async fn invalidate_catalog(&self) {
        self.cache
            .invalidate(&[AUTHORIZATION_CATALOG_TAG.to_owned()])
            .await;
    }

    async fn invalidate_principal(&self, user_id: rowguard_domain::UserId) {
        self.cache.invalidate(&[principal_tag(user_id)]).await;
    }
}

#[cfg(test)]
mod tests;
