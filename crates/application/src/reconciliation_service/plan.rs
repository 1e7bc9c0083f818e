use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rowguard_core::{AppResult, GuardName};
use rowguard_domain::{PermissionCatalog, PermissionGroupId, PermissionId, RoleName, normalize_methods};
use serde::Serialize;

use crate::CatalogSnapshot;

/// Stored permission that is no longer declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalePermission {
    /// Storage identifier.
    pub id: PermissionId,
    /// Permission name.
    pub name: String,
    /// Guard the permission belongs to.
    pub guard_name: GuardName,
}

/// Stored group that is no longer declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleGroup {
    /// Storage identifier.
    pub id: PermissionGroupId,
    /// Group name.
    pub name: String,
}

/// Group to create or relabel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChange {
    /// Group name.
    pub name: String,
    /// Declared controller label.
    pub controller: String,
}

/// Permission to create or update in the reconciled guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionChange {
    /// Name of the owning group.
    pub group: String,
    /// Permission name.
    pub name: String,
    /// Normalized allowed methods.
    pub methods: Vec<String>,
}

/// Full replacement of one role's permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePermissionChange {
    /// Role name.
    pub role: RoleName,
    /// Exact permission set after the change.
    pub permissions: BTreeSet<String>,
    /// Names gained by the change.
    pub added: BTreeSet<String>,
    /// Names lost by the change.
    pub removed: BTreeSet<String>,
}

/// Ordered set of storage changes that brings the store in line with a catalog.
///
/// Steps apply in field order: prune, upsert groups, upsert permissions,
/// create roles, sync role permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Guard new permissions and roles are created in.
    pub guard: GuardName,
    /// Undeclared permissions across every guard.
    pub delete_permissions: Vec<StalePermission>,
    /// Undeclared groups. Their permissions go with them.
    pub delete_groups: Vec<StaleGroup>,
    /// Declared groups missing from storage.
    pub create_groups: Vec<GroupChange>,
    /// Stored groups whose controller label changed.
    pub relabel_groups: Vec<GroupChange>,
    /// Declared permissions missing from the guard.
    pub create_permissions: Vec<PermissionChange>,
    /// Stored permissions whose methods or group changed.
    pub update_permissions: Vec<PermissionChange>,
    /// Declared roles missing from the guard.
    pub create_roles: Vec<RoleName>,
    /// Declared roles whose permission set differs.
    pub sync_roles: Vec<RolePermissionChange>,
}

/// Per-step counts of an applied or planned reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Deleted permissions.
    pub permissions_deleted: usize,
    /// Deleted groups.
    pub groups_deleted: usize,
    /// Created groups.
    pub groups_created: usize,
    /// Relabeled groups.
    pub groups_relabeled: usize,
    /// Created permissions.
    pub permissions_created: usize,
    /// Updated permissions.
    pub permissions_updated: usize,
    /// Created roles.
    pub roles_created: usize,
    /// Roles whose permission set was replaced.
    pub roles_synced: usize,
}

impl ReconciliationPlan {
    fn empty(guard: GuardName) -> Self {
        Self {
            guard,
            delete_permissions: Vec::new(),
            delete_groups: Vec::new(),
            create_groups: Vec::new(),
            relabel_groups: Vec::new(),
            create_permissions: Vec::new(),
            update_permissions: Vec::new(),
            create_roles: Vec::new(),
            sync_roles: Vec::new(),
        }
    }

    /// Returns whether applying the plan would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.report() == ReconciliationReport::default()
    }

    /// Returns the per-step counts of this plan.
    #[must_use]
    pub fn report(&self) -> ReconciliationReport {
        ReconciliationReport {
            permissions_deleted: self.delete_permissions.len(),
            groups_deleted: self.delete_groups.len(),
            groups_created: self.create_groups.len(),
            groups_relabeled: self.relabel_groups.len(),
            permissions_created: self.create_permissions.len(),
            permissions_updated: self.update_permissions.len(),
            roles_created: self.create_roles.len(),
            roles_synced: self.sync_roles.len(),
        }
    }
}

/// Computes the changes that bring `snapshot` in line with `catalog`.
///
/// The catalog must already be validated. Only real differences are planned,
/// so planning against the result of applying a plan yields an empty plan.
pub fn plan_reconciliation(
    catalog: &PermissionCatalog,
    snapshot: &CatalogSnapshot,
    guard: &GuardName,
) -> AppResult<ReconciliationPlan> {
    let mut plan = ReconciliationPlan::empty(guard.clone());
    let declared_names = catalog.permission_names();

    plan.delete_permissions = snapshot
        .permissions
        .iter()
        .filter(|permission| !declared_names.contains(permission.name()))
        .map(|permission| StalePermission {
            id: permission.id(),
            name: permission.name().to_owned(),
            guard_name: permission.guard_name().clone(),
        })
        .collect();

    plan.delete_groups = snapshot
        .groups
        .iter()
        .filter(|group| !catalog.groups.contains_key(group.name()))
        .map(|group| StaleGroup {
            id: group.id(),
            name: group.name().to_owned(),
        })
        .collect();
    let deleted_group_ids: HashSet<PermissionGroupId> =
        plan.delete_groups.iter().map(|group| group.id).collect();

    let stored_groups: HashMap<&str, &str> = snapshot
        .groups
        .iter()
        .map(|group| (group.name(), group.controller()))
        .collect();
    for (name, declared) in &catalog.groups {
        let controller = declared.controller.trim();
        match stored_groups.get(name.as_str()) {
            None => plan.create_groups.push(GroupChange {
                name: name.clone(),
                controller: controller.to_owned(),
            }),
            Some(stored) if *stored != controller => plan.relabel_groups.push(GroupChange {
                name: name.clone(),
                controller: controller.to_owned(),
            }),
            Some(_) => {}
        }
    }

    let group_names: HashMap<PermissionGroupId, &str> = snapshot
        .groups
        .iter()
        .map(|group| (group.id(), group.name()))
        .collect();
    // Permissions of a deleted group vanish with it and are recreated.
    let surviving: HashMap<&str, _> = snapshot
        .permissions
        .iter()
        .filter(|permission| {
            permission.guard_name() == guard && !deleted_group_ids.contains(&permission.group_id())
        })
        .map(|permission| (permission.name(), permission))
        .collect();

    let mut recreated: HashSet<&str> = HashSet::new();
    for declared in catalog.permissions() {
        let change = PermissionChange {
            group: declared.group.to_owned(),
            name: declared.name.to_owned(),
            methods: normalize_methods(declared.methods.to_vec()),
        };

        match surviving.get(declared.name) {
            None => {
                recreated.insert(declared.name);
                plan.create_permissions.push(change);
            }
            Some(stored) => {
                let stored_group = group_names.get(&stored.group_id()).copied();
                if stored.methods() != change.methods.as_slice()
                    || stored_group != Some(declared.group)
                {
                    plan.update_permissions.push(change);
                }
            }
        }
    }

    let stored_roles: BTreeMap<&RoleName, &Vec<String>> = snapshot
        .roles
        .iter()
        .filter(|definition| definition.role.team_id().is_none())
        .map(|definition| (definition.role.name(), &definition.permissions))
        .collect();

    for (role, declared) in catalog.role_permissions()? {
        let current: BTreeSet<String> = match stored_roles.get(&role) {
            Some(stored) => stored
                .iter()
                .filter(|name| {
                    declared_names.contains(name.as_str()) && !recreated.contains(name.as_str())
                })
                .cloned()
                .collect(),
            None => {
                plan.create_roles.push(role.clone());
                BTreeSet::new()
            }
        };

        let added: BTreeSet<String> = declared.difference(&current).cloned().collect();
        let removed: BTreeSet<String> = current.difference(&declared).cloned().collect();
        if added.is_empty() && removed.is_empty() {
            continue;
        }

        plan.sync_roles.push(RolePermissionChange {
            role,
            permissions: declared,
            added,
            removed,
        });
    }

    Ok(plan)
}
