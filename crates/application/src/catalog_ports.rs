use async_trait::async_trait;
use rowguard_core::{AppResult, GuardName};
use rowguard_domain::{Permission, PermissionGroup};

use crate::{ReconciliationPlan, RoleDefinition};

/// Stored authorization data a reconciliation run compares against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    /// Every stored permission group.
    pub groups: Vec<PermissionGroup>,
    /// Every stored permission across all guards.
    pub permissions: Vec<Permission>,
    /// Global roles of the reconciled guard with their permission names.
    pub roles: Vec<RoleDefinition>,
}

/// Repository port used by reconciliation.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Loads the stored catalog for the reconciled guard.
    async fn load_snapshot(&self, guard: &GuardName) -> AppResult<CatalogSnapshot>;

    /// Applies every step of a plan atomically.
    async fn apply_plan(&self, plan: &ReconciliationPlan) -> AppResult<()>;
}
