use std::sync::Arc;

use rowguard_core::{AppResult, GuardName};
use rowguard_domain::{AuditAction, PermissionCatalog};
use tracing::info;

use crate::query_cache_service::AUTHORIZATION_CATALOG_TAG;
use crate::{AuditEvent, AuditRepository, CatalogRepository, QueryCacheService};

mod plan;

pub use plan::{
    GroupChange, PermissionChange, ReconciliationPlan, ReconciliationReport,
    RolePermissionChange, StaleGroup, StalePermission, plan_reconciliation,
};

/// Application service that brings stored permissions, groups and roles in
/// line with a declared catalog.
#[derive(Clone)]
pub struct ReconciliationService {
    repository: Arc<dyn CatalogRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    cache: QueryCacheService,
    guard: GuardName,
}

impl ReconciliationService {
    /// Creates a service reconciling into `guard`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        cache: QueryCacheService,
        guard: GuardName,
    ) -> Self {
        Self {
            repository,
            audit_repository,
            cache,
            guard,
        }
    }

    /// Computes the plan for `catalog` without writing anything.
    pub async fn plan(&self, catalog: &PermissionCatalog) -> AppResult<ReconciliationPlan> {
        catalog.validate()?;
        let snapshot = self.repository.load_snapshot(&self.guard).await?;
        plan_reconciliation(catalog, &snapshot, &self.guard)
    }

    /// Applies `catalog` and returns the per-step counts.
    ///
    /// An invalid catalog aborts before any write. The plan is applied in one
    /// storage transaction.
    pub async fn reconcile(&self, catalog: &PermissionCatalog) -> AppResult<ReconciliationReport> {
        let plan = self.plan(catalog).await?;
        let report = plan.report();

        if plan.is_empty() {
            info!(guard = %self.guard, "permission catalog already reconciled");
            return Ok(report);
        }

        self.repository.apply_plan(&plan).await?;
        self.cache
            .invalidate(&[AUTHORIZATION_CATALOG_TAG.to_owned()])
            .await;

        self.audit_repository
            .append_event(AuditEvent {
                actor: None,
                action: AuditAction::SecurityCatalogReconciled,
                resource_type: "permission_catalog".to_owned(),
                resource_id: self.guard.to_string(),
                detail: Some(format!(
                    "deleted {} permissions and {} groups, created {} groups and {} permissions, \
                     updated {} permissions, created {} roles, synced {} roles",
                    report.permissions_deleted,
                    report.groups_deleted,
                    report.groups_created,
                    report.permissions_created,
                    report.permissions_updated,
                    report.roles_created,
                    report.roles_synced,
                )),
            })
            .await?;

        info!(
            guard = %self.guard,
            permissions_deleted = report.permissions_deleted,
            groups_deleted = report.groups_deleted,
            groups_created = report.groups_created,
            groups_relabeled = report.groups_relabeled,
            permissions_created = report.permissions_created,
            permissions_updated = report.permissions_updated,
            roles_created = report.roles_created,
            roles_synced = report.roles_synced,
            "permission catalog reconciled"
        );

        Ok(report)
    }
}
