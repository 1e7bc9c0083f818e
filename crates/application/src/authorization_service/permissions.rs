use super::*;

impl AuthorizationService {
    /// Decides whether the principal holds the named permission.
    ///
    /// Anonymous callers are always denied. Holders of the root role are
    /// granted every name, including names no permission row carries.
    pub async fn decide(
        &self,
        principal: Option<&Principal>,
        permission_name: &str,
    ) -> AppResult<AccessDecision> {
        let Some(principal) = principal else {
            return Ok(AccessDecision::Denied);
        };

        let decision = self
            .effective_permissions(principal)
            .await?
            .decide(permission_name);
        Self::log_decision(principal, permission_name, decision);

        Ok(decision)
    }

    /// Returns whether the principal holds the named permission.
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        permission_name: &str,
    ) -> AppResult<bool> {
        Ok(self
            .decide(principal, permission_name)
            .await?
            .is_granted())
    }

    /// Returns whether any held permission lists the action identifier.
    pub async fn authorize_method(
        &self,
        principal: Option<&Principal>,
        method: &str,
    ) -> AppResult<bool> {
        let Some(principal) = principal else {
            return Ok(false);
        };

        let decision = self
            .effective_permissions(principal)
            .await?
            .decide_method(method);
        Self::log_decision(principal, method, decision);

        Ok(decision.is_granted())
    }

    /// Ensures the principal holds the named permission.
    pub async fn require_permission(
        &self,
        principal: Option<&Principal>,
        permission_name: &str,
    ) -> AppResult<()> {
        let Some(principal) = principal else {
            return Err(Self::anonymous_error(permission_name));
        };

        if self
            .decide(Some(principal), permission_name)
            .await?
            .is_granted()
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{permission_name}' in guard '{}'",
            principal.id(),
            principal.guard()
        )))
    }
}
