use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by authorization administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created outside reconciliation.
    SecurityRoleCreated,
    /// Emitted when a role is deleted.
    SecurityRoleDeleted,
    /// Emitted when a role's permission set is replaced.
    SecurityRolePermissionsSynced,
    /// Emitted when a role is assigned to a principal.
    SecurityRoleAssigned,
    /// Emitted when a role is removed from a principal.
    SecurityRoleUnassigned,
    /// Emitted when a permission is granted directly to a principal.
    SecurityPermissionGranted,
    /// Emitted when a direct permission is revoked from a principal.
    SecurityPermissionRevoked,
    /// Emitted when a permission group's controller label changes.
    SecurityGroupRelabeled,
    /// Emitted when the declared catalog is applied.
    SecurityCatalogReconciled,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityRolePermissionsSynced => "security.role.permissions_synced",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleUnassigned => "security.role.unassigned",
            Self::SecurityPermissionGranted => "security.permission.granted",
            Self::SecurityPermissionRevoked => "security.permission.revoked",
            Self::SecurityGroupRelabeled => "security.group.relabeled",
            Self::SecurityCatalogReconciled => "security.catalog.reconciled",
        }
    }
}
