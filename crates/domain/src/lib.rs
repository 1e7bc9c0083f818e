//! Domain entities and invariants for role-based access control and
//! row-level hierarchy scoping.

#![forbid(unsafe_code)]

mod catalog;
mod effective;
mod ids;
mod permission;
mod principal;
mod record;
mod role;
mod scope;
mod security;

pub use catalog::{DeclaredGroup, DeclaredPermission, PermissionCatalog};
pub use effective::{AccessDecision, EffectivePermissions};
pub use ids::{PermissionGroupId, PermissionId, RecordId, RoleId, UserId};
pub use permission::{Permission, PermissionGroup, normalize_methods};
pub use principal::Principal;
pub use record::ScopedRecord;
pub use role::{ROOT_ROLE_NAME, Role, RoleName};
pub use scope::{
    DEFAULT_EXCLUDED_RECORD_TYPES, HierarchyScopePolicy, RecordType, RowFilter, ScopeFallback,
    ScopeReason, ScopeResolution, ScopeSubject, hierarchy_filter,
};
pub use security::AuditAction;
