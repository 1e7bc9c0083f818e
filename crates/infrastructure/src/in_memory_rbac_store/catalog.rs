use super::*;

use rowguard_domain::PermissionGroupId;

/// Applies a reconciliation plan in the same step order as the SQL adapter.
pub(super) fn apply(state: &mut RbacState, plan: &ReconciliationPlan) -> AppResult<()> {
    prune(state, plan);
    upsert_groups(state, plan)?;
    upsert_permissions(state, plan)?;
    sync_roles(state, plan)
}

fn prune(state: &mut RbacState, plan: &ReconciliationPlan) {
    let stale_permissions: HashSet<PermissionId> = plan
        .delete_permissions
        .iter()
        .map(|permission| permission.id)
        .collect();
    let stale_groups: HashSet<PermissionGroupId> =
        plan.delete_groups.iter().map(|group| group.id).collect();

    state
        .groups
        .retain(|group| !stale_groups.contains(&group.id()));
    state.permissions.retain(|permission| {
        !stale_permissions.contains(&permission.id())
            && !stale_groups.contains(&permission.group_id())
    });
    state.drop_dangling_links();
}

fn upsert_groups(state: &mut RbacState, plan: &ReconciliationPlan) -> AppResult<()> {
    for change in plan.create_groups.iter().chain(&plan.relabel_groups) {
        match state
            .groups
            .iter()
            .position(|group| group.name() == change.name)
        {
            Some(index) => {
                let id = state.groups[index].id();
                state.groups[index] =
                    PermissionGroup::new(id, change.name.as_str(), change.controller.as_str())?;
            }
            None => {
                let id = PermissionGroupId::new(state.next_id());
                state.groups.push(PermissionGroup::new(
                    id,
                    change.name.as_str(),
                    change.controller.as_str(),
                )?);
            }
        }
    }

    Ok(())
}

fn upsert_permissions(state: &mut RbacState, plan: &ReconciliationPlan) -> AppResult<()> {
    for change in plan
        .create_permissions
        .iter()
        .chain(&plan.update_permissions)
    {
        let Some(group_id) = state
            .groups
            .iter()
            .find(|group| group.name() == change.group)
            .map(PermissionGroup::id)
        else {
            return Err(AppError::Internal(format!(
                "permission group '{}' vanished while reconciling '{}'",
                change.group, change.name
            )));
        };

        let existing = state.permissions.iter().position(|permission| {
            permission.name() == change.name && permission.guard_name() == &plan.guard
        });
        let id = match existing {
            Some(index) => state.permissions[index].id(),
            None => PermissionId::new(state.next_id()),
        };
        let permission = Permission::new(
            id,
            group_id,
            change.name.as_str(),
            plan.guard.clone(),
            change.methods.clone(),
        )?;

        match existing {
            Some(index) => state.permissions[index] = permission,
            None => state.permissions.push(permission),
        }
    }

    Ok(())
}

fn sync_roles(state: &mut RbacState, plan: &ReconciliationPlan) -> AppResult<()> {
    for name in &plan.create_roles {
        let exists = state.roles.iter().any(|role| {
            role.name() == name && role.guard_name() == &plan.guard && role.team_id().is_none()
        });
        if !exists {
            let id = RoleId::new(state.next_id());
            state
                .roles
                .push(Role::new(id, name.clone(), plan.guard.clone(), None));
        }
    }

    for change in &plan.sync_roles {
        let Some(role_id) = state
            .roles
            .iter()
            .find(|role| {
                role.name() == &change.role
                    && role.guard_name() == &plan.guard
                    && role.team_id().is_none()
            })
            .map(Role::id)
        else {
            return Err(AppError::Internal(format!(
                "failed to resolve role '{}'",
                change.role
            )));
        };

        let permission_ids: Vec<PermissionId> = state
            .permissions
            .iter()
            .filter(|permission| {
                permission.guard_name() == &plan.guard
                    && change.permissions.contains(permission.name())
            })
            .map(Permission::id)
            .collect();

        state
            .role_permissions
            .retain(|(linked_role, _)| *linked_role != role_id);
        state
            .role_permissions
            .extend(permission_ids.into_iter().map(|id| (role_id, id)));
    }

    Ok(())
}
