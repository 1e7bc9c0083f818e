//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod authorization_ports;
mod authorization_service;
mod cache_ports;
mod catalog_ports;
mod hierarchy_scope_service;
mod query_cache_service;
mod reconciliation_service;
mod scope_ports;
mod scoped_record_service;
mod security_admin_ports;
mod security_admin_service;

pub use audit_ports::{AuditEvent, AuditRepository};
pub use authorization_ports::{AuthorizationRepository, PrincipalGrants};
pub use authorization_service::AuthorizationService;
pub use cache_ports::QueryCache;
pub use catalog_ports::{CatalogRepository, CatalogSnapshot};
pub use hierarchy_scope_service::HierarchyScopeService;
pub use query_cache_service::{
    AUTHORIZATION_CATALOG_TAG, QueryCacheService, principal_tag, record_type_tag,
};
pub use reconciliation_service::{
    GroupChange, PermissionChange, ReconciliationPlan, ReconciliationReport,
    ReconciliationService, RolePermissionChange, StaleGroup, StalePermission, plan_reconciliation,
};
pub use scope_ports::{DescendantResolver, ScopedRecordRepository};
pub use scoped_record_service::ScopedRecordService;
pub use security_admin_ports::{
    AssignmentRepository, CreateRoleInput, PermissionGroupDefinition, PrincipalAssignments,
    RoleDefinition, RoleRepository,
};
pub use security_admin_service::{SecurityAdminService, required_permissions};
