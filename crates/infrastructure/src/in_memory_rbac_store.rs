use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use rowguard_application::{
    AssignmentRepository, AuthorizationRepository, CatalogRepository, CatalogSnapshot,
    CreateRoleInput, DescendantResolver, PermissionGroupDefinition, PrincipalAssignments,
    PrincipalGrants, ReconciliationPlan, RoleDefinition, RoleRepository, ScopedRecordRepository,
};
use rowguard_core::{AppError, AppResult, GuardName, TeamId};
use rowguard_domain::{
    Permission, PermissionGroup, PermissionId, Principal, RecordId, RecordType,
    Role, RoleId, RoleName, RowFilter, ScopedRecord, UserId,
};
use serde_json::Value;
use tokio::sync::RwLock;

mod catalog;
mod records;

#[derive(Debug, Clone, Default)]
struct RbacState {
    groups: Vec<PermissionGroup>,
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    role_permissions: HashSet<(RoleId, PermissionId)>,
    user_roles: HashSet<(UserId, RoleId)>,
    user_permissions: HashSet<(UserId, PermissionId)>,
    users: HashMap<UserId, Option<UserId>>,
    records: Vec<ScopedRecord>,
    last_id: i64,
}

impl RbacState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn permission_by_name(&self, guard: &GuardName, name: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|permission| permission.guard_name() == guard && permission.name() == name)
    }

    fn role_permission_names(&self, role_id: RoleId) -> Vec<String> {
        let mut names: Vec<String> = self
            .permissions
            .iter()
            .filter(|permission| self.role_permissions.contains(&(role_id, permission.id())))
            .map(|permission| permission.name().to_owned())
            .collect();
        names.sort();
        names
    }

    fn role_definition(&self, role: &Role) -> RoleDefinition {
        RoleDefinition {
            role: role.clone(),
            permissions: self.role_permission_names(role.id()),
        }
    }

    fn resolve_permission_ids(
        &self,
        guard: &GuardName,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> AppResult<Vec<PermissionId>> {
        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().trim();
                self.permission_by_name(guard, name)
                    .map(Permission::id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "permission '{name}' was not found in guard '{guard}'"
                        ))
                    })
            })
            .collect()
    }

    fn drop_dangling_links(&mut self) {
        let permission_ids: HashSet<PermissionId> =
            self.permissions.iter().map(Permission::id).collect();
        let role_ids: HashSet<RoleId> = self.roles.iter().map(Role::id).collect();

        self.role_permissions.retain(|(role_id, permission_id)| {
            role_ids.contains(role_id) && permission_ids.contains(permission_id)
        });
        self.user_roles
            .retain(|(_, role_id)| role_ids.contains(role_id));
        self.user_permissions
            .retain(|(_, permission_id)| permission_ids.contains(permission_id));
    }
}

/// In-memory implementation of every storage port, for tests and demos.
///
/// Writes that span several rows take one write lock, so each call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    state: RwLock<RbacState>,
}

impl InMemoryRbacStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and the user that created it.
    pub async fn insert_user(&self, user_id: UserId, created_by: Option<UserId>) {
        self.state.write().await.users.insert(user_id, created_by);
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryRbacStore {
    async fn load_principal_grants(&self, principal: &Principal) -> AppResult<PrincipalGrants> {
        let state = self.state.read().await;
        let mut grants = PrincipalGrants::default();
        let mut seen: HashSet<PermissionId> = HashSet::new();

        for role in state.roles.iter().filter(|role| {
            role.guard_name() == principal.guard()
                && role.applies_to_team(principal.team_id())
                && state.user_roles.contains(&(principal.id(), role.id()))
        }) {
            grants.roles.push(role.name().clone());
            for permission in state.permissions.iter().filter(|permission| {
                permission.guard_name() == principal.guard()
                    && state.role_permissions.contains(&(role.id(), permission.id()))
            }) {
                if seen.insert(permission.id()) {
                    grants.role_permissions.push(permission.clone());
                }
            }
        }

        grants.direct_permissions = state
            .permissions
            .iter()
            .filter(|permission| {
                permission.guard_name() == principal.guard()
                    && state
                        .user_permissions
                        .contains(&(principal.id(), permission.id()))
            })
            .cloned()
            .collect();

        Ok(grants)
    }

    async fn list_guard_permissions(&self, guard: &GuardName) -> AppResult<Vec<Permission>> {
        Ok(self
            .state
            .read()
            .await
            .permissions
            .iter()
            .filter(|permission| permission.guard_name() == guard)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacStore {
    async fn list_roles(&self, guard: &GuardName) -> AppResult<Vec<RoleDefinition>> {
        let state = self.state.read().await;
        let mut roles: Vec<RoleDefinition> = state
            .roles
            .iter()
            .filter(|role| role.guard_name() == guard)
            .map(|role| state.role_definition(role))
            .collect();
        roles.sort_by(|left, right| left.role.name().cmp(right.role.name()));

        Ok(roles)
    }

    async fn find_role(
        &self,
        guard: &GuardName,
        team_id: Option<TeamId>,
        name: &RoleName,
    ) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        let candidates = || {
            state
                .roles
                .iter()
                .filter(move |role| role.guard_name() == guard && role.name() == name)
        };

        // A team role shadows the global role of the same name.
        Ok(candidates()
            .find(|role| team_id.is_some() && role.team_id() == team_id)
            .or_else(|| candidates().find(|role| role.team_id().is_none()))
            .cloned())
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition> {
        let mut state = self.state.write().await;

        if state.roles.iter().any(|role| {
            role.guard_name() == &input.guard_name
                && role.team_id() == input.team_id
                && role.name() == &input.name
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                input.name
            )));
        }

        let permission_ids = state.resolve_permission_ids(&input.guard_name, &input.permissions)?;
        let role = Role::new(
            RoleId::new(state.next_id()),
            input.name,
            input.guard_name,
            input.team_id,
        )
        .with_authors(input.created_by, input.created_by);

        for permission_id in permission_ids {
            state.role_permissions.insert((role.id(), permission_id));
        }
        state.roles.push(role.clone());

        Ok(state.role_definition(&role))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let before = state.roles.len();
        state.roles.retain(|role| role.id() != role_id);
        if state.roles.len() == before {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        state.drop_dangling_links();
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &BTreeSet<String>,
        updated_by: Option<UserId>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(index) = state.roles.iter().position(|role| role.id() == role_id) else {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        };

        let guard = state.roles[index].guard_name().clone();
        let permission_ids = state.resolve_permission_ids(&guard, permissions)?;

        state
            .role_permissions
            .retain(|(linked_role, _)| *linked_role != role_id);
        for permission_id in permission_ids {
            state.role_permissions.insert((role_id, permission_id));
        }

        let role = state.roles[index].clone();
        state.roles[index] = role.clone().with_authors(role.created_by(), updated_by);

        Ok(())
    }

    async fn find_permission(
        &self,
        guard: &GuardName,
        name: &str,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .read()
            .await
            .permission_by_name(guard, name)
            .cloned())
    }

    async fn list_permission_groups(
        &self,
        guard: &GuardName,
    ) -> AppResult<Vec<PermissionGroupDefinition>> {
        let state = self.state.read().await;
        let mut groups: Vec<PermissionGroupDefinition> = state
            .groups
            .iter()
            .map(|group| {
                let mut permissions: Vec<Permission> = state
                    .permissions
                    .iter()
                    .filter(|permission| {
                        permission.group_id() == group.id() && permission.guard_name() == guard
                    })
                    .cloned()
                    .collect();
                permissions.sort_by(|left, right| left.name().cmp(right.name()));

                PermissionGroupDefinition {
                    group: group.clone(),
                    permissions,
                }
            })
            .collect();
        groups.sort_by(|left, right| left.group.name().cmp(right.group.name()));

        Ok(groups)
    }

    async fn relabel_group(
        &self,
        group_name: &str,
        controller: &str,
    ) -> AppResult<PermissionGroup> {
        let mut state = self.state.write().await;
        let Some(group) = state
            .groups
            .iter_mut()
            .find(|group| group.name() == group_name)
        else {
            return Err(AppError::NotFound(format!(
                "permission group '{group_name}' was not found"
            )));
        };

        *group = PermissionGroup::new(group.id(), group_name, controller)?;
        Ok(group.clone())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRbacStore {
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if !state.roles.iter().any(|role| role.id() == role_id) {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        Ok(state.user_roles.insert((user_id, role_id)))
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .user_roles
            .remove(&(user_id, role_id)))
    }

    async fn grant_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if !state
            .permissions
            .iter()
            .any(|permission| permission.id() == permission_id)
        {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        Ok(state.user_permissions.insert((user_id, permission_id)))
    }

    async fn revoke_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .user_permissions
            .remove(&(user_id, permission_id)))
    }

    async fn list_assignments(
        &self,
        user_id: UserId,
        guard: &GuardName,
    ) -> AppResult<PrincipalAssignments> {
        let state = self.state.read().await;

        Ok(PrincipalAssignments {
            user_id,
            roles: state
                .roles
                .iter()
                .filter(|role| {
                    role.guard_name() == guard && state.user_roles.contains(&(user_id, role.id()))
                })
                .cloned()
                .collect(),
            direct_permissions: state
                .permissions
                .iter()
                .filter(|permission| {
                    permission.guard_name() == guard
                        && state
                            .user_permissions
                            .contains(&(user_id, permission.id()))
                })
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRbacStore {
    async fn load_snapshot(&self, guard: &GuardName) -> AppResult<CatalogSnapshot> {
        let state = self.state.read().await;

        Ok(CatalogSnapshot {
            groups: state.groups.clone(),
            permissions: state.permissions.clone(),
            roles: state
                .roles
                .iter()
                .filter(|role| role.guard_name() == guard && role.team_id().is_none())
                .map(|role| state.role_definition(role))
                .collect(),
        })
    }

    async fn apply_plan(&self, plan: &ReconciliationPlan) -> AppResult<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        catalog::apply(&mut next, plan)?;
        *state = next;

        Ok(())
    }
}

#[async_trait]
impl DescendantResolver for InMemoryRbacStore {
    async fn descendant_ids(&self, user_id: UserId) -> AppResult<Option<BTreeSet<UserId>>> {
        let state = self.state.read().await;
        let mut descendants = BTreeSet::new();
        let mut frontier = vec![user_id];
        while let Some(parent) = frontier.pop() {
            for (child, created_by) in &state.users {
                if *created_by == Some(parent) && *child != user_id && descendants.insert(*child)
                {
                    frontier.push(*child);
                }
            }
        }

        Ok(Some(descendants))
    }
}

#[async_trait]
impl ScopedRecordRepository for InMemoryRbacStore {
    async fn list_records(
        &self,
        record_type: &RecordType,
        filter: &RowFilter,
    ) -> AppResult<Vec<ScopedRecord>> {
        let state = self.state.read().await;
        Ok(records::visible(&state, record_type, filter)
            .cloned()
            .collect())
    }

    async fn find_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<Option<ScopedRecord>> {
        let state = self.state.read().await;
        Ok(records::visible(&state, record_type, filter)
            .find(|record| record.record_id() == record_id)
            .cloned())
    }

    async fn create_record(
        &self,
        record_type: &RecordType,
        created_by: UserId,
        data: Value,
    ) -> AppResult<ScopedRecord> {
        let mut state = self.state.write().await;
        let record = ScopedRecord::new(
            RecordId::new(state.next_id()),
            record_type.clone(),
            Some(created_by),
            data,
        )?;
        state.records.push(record.clone());

        Ok(record)
    }

    async fn delete_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.records.len();
        state.records.retain(|record| {
            !(record.record_id() == record_id && records::matches(record, record_type, filter))
        });

        Ok(state.records.len() != before)
    }
}

#[cfg(test)]
mod tests;
