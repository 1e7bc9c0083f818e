use std::sync::Arc;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{AccessDecision, EffectivePermissions, Principal};
use tracing::debug;

use crate::query_cache_service::{AUTHORIZATION_CATALOG_TAG, principal_tag};
use crate::{AuthorizationRepository, QueryCacheService};

mod permissions;

/// Application service deciding whether principals hold permissions.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
    cache: QueryCacheService,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>, cache: QueryCacheService) -> Self {
        Self { repository, cache }
    }

    /// Resolves the effective permission set of a principal.
    ///
    /// Results are memoized under the principal's tag and the catalog tag.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> AppResult<EffectivePermissions> {
        let key = format!("authz:effective:{}", principal.cache_key());
        let tags = [
            AUTHORIZATION_CATALOG_TAG.to_owned(),
            principal_tag(principal.id()),
        ];

        self.cache
            .cached(
                key.as_str(),
                self.cache.default_ttl_seconds(),
                &tags,
                || self.load_effective_permissions(principal),
            )
            .await
    }

    async fn load_effective_permissions(
        &self,
        principal: &Principal,
    ) -> AppResult<EffectivePermissions> {
        let grants = self.repository.load_principal_grants(principal).await?;

        if grants.roles.iter().any(|role| role.is_root()) {
            let all_permissions = self
                .repository
                .list_guard_permissions(principal.guard())
                .await?;
            return Ok(EffectivePermissions::root(all_permissions.iter()));
        }

        Ok(EffectivePermissions::from_grants(
            grants.role_permissions.iter(),
            grants.direct_permissions.iter(),
        ))
    }

    fn log_decision(principal: &Principal, checked: &str, decision: AccessDecision) {
        debug!(
            user_id = %principal.id(),
            guard = %principal.guard(),
            checked,
            decision = decision.as_str(),
            "authorization decision"
        );
    }

    fn anonymous_error(target: &str) -> AppError {
        AppError::Unauthorized(format!(
            "authentication is required to access '{target}'"
        ))
    }
}
