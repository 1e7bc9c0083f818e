use std::sync::Arc;

use rowguard_core::AppResult;
use rowguard_domain::{
    HierarchyScopePolicy, Principal, RecordType, RowFilter, ScopeResolution, ScopeSubject,
    hierarchy_filter,
};
use tracing::{debug, warn};

use crate::DescendantResolver;

/// Application service building the row filter for scoped reads.
#[derive(Clone)]
pub struct HierarchyScopeService {
    policy: HierarchyScopePolicy,
    resolver: Option<Arc<dyn DescendantResolver>>,
}

impl HierarchyScopeService {
    /// Creates a scope that resolves descendants through `resolver`.
    #[must_use]
    pub fn new(policy: HierarchyScopePolicy, resolver: Arc<dyn DescendantResolver>) -> Self {
        Self {
            policy,
            resolver: Some(resolver),
        }
    }

    /// Creates a scope with no hierarchy source. Every non-excluded read
    /// takes the policy fallback.
    #[must_use]
    pub fn without_resolver(policy: HierarchyScopePolicy) -> Self {
        Self {
            policy,
            resolver: None,
        }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &HierarchyScopePolicy {
        &self.policy
    }

    /// Resolves the filter for one read together with the branch taken.
    ///
    /// Resolver failures propagate. A missing hierarchy is not an error.
    pub async fn resolve(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
    ) -> AppResult<ScopeResolution> {
        let subject = match principal {
            Some(principal) if !self.policy.is_excluded(record_type) => {
                Some(self.subject(principal).await?)
            }
            Some(principal) => Some(ScopeSubject::without_hierarchy(principal.id())),
            None => None,
        };

        let resolution = hierarchy_filter(&self.policy, subject.as_ref(), record_type);

        if resolution.failed_open() {
            warn!(
                record_type = %record_type,
                user_id = ?principal.map(Principal::id),
                reason = resolution.reason.as_str(),
                "hierarchy scope left query unrestricted"
            );
        } else {
            debug!(
                record_type = %record_type,
                reason = resolution.reason.as_str(),
                filter = %resolution.filter.cache_fragment(),
                "hierarchy scope resolved"
            );
        }

        Ok(resolution)
    }

    /// Returns only the row filter for one read.
    pub async fn filter_for(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
    ) -> AppResult<RowFilter> {
        Ok(self.resolve(principal, record_type).await?.filter)
    }

    async fn subject(&self, principal: &Principal) -> AppResult<ScopeSubject> {
        let Some(resolver) = &self.resolver else {
            return Ok(ScopeSubject::without_hierarchy(principal.id()));
        };

        Ok(match resolver.descendant_ids(principal.id()).await? {
            Some(descendants) => ScopeSubject::with_descendants(principal.id(), descendants),
            None => ScopeSubject::without_hierarchy(principal.id()),
        })
    }
}
