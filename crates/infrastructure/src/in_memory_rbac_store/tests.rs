use std::collections::BTreeSet;
use std::sync::Arc;

use rowguard_application::{
    AssignmentRepository, AuthorizationRepository, CatalogRepository, CreateRoleInput,
    DescendantResolver, HierarchyScopeService, RoleRepository, ScopedRecordRepository,
    plan_reconciliation,
};
use rowguard_core::{AppError, GuardName, TeamId};
use rowguard_domain::{
    HierarchyScopePolicy, PermissionCatalog, Principal, RecordType, RoleName, RowFilter, UserId,
};
use serde_json::json;

use super::InMemoryRbacStore;

fn catalog() -> PermissionCatalog {
    PermissionCatalog::new()
        .with_group(
            "Employee",
            "EmployeeController",
            [
                ("employee-list", &["index", "show"][..]),
                ("employee-edit", &["edit", "update"][..]),
            ],
        )
        .with_group("Role", "RoleController", [("role-list", &["index"][..])])
        .with_role("Admin", ["employee-list", "employee-edit", "role-list"])
        .with_role("Clerk", ["employee-list"])
}

async fn reconciled(catalog: &PermissionCatalog) -> InMemoryRbacStore {
    let store = InMemoryRbacStore::new();
    reconcile(&store, catalog).await;
    store
}

async fn reconcile(store: &InMemoryRbacStore, catalog: &PermissionCatalog) {
    let guard = GuardName::default();
    let snapshot = store
        .load_snapshot(&guard)
        .await
        .unwrap_or_else(|error| panic!("snapshot failed: {error}"));
    let plan = plan_reconciliation(catalog, &snapshot, &guard)
        .unwrap_or_else(|error| panic!("plan failed: {error}"));
    store
        .apply_plan(&plan)
        .await
        .unwrap_or_else(|error| panic!("apply failed: {error}"));
}

fn role_name(value: &str) -> RoleName {
    RoleName::parse(value).unwrap_or_else(|error| panic!("invalid role name: {error}"))
}

fn record_type(value: &str) -> RecordType {
    RecordType::new(value).unwrap_or_else(|error| panic!("invalid record type: {error}"))
}

#[tokio::test]
async fn applied_plan_leaves_nothing_to_reconcile() {
    let store = reconciled(&catalog()).await;
    let guard = GuardName::default();

    let snapshot = store.load_snapshot(&guard).await.unwrap_or_default();
    assert_eq!(snapshot.groups.len(), 2);
    assert_eq!(snapshot.permissions.len(), 3);
    assert_eq!(snapshot.roles.len(), 2);

    let plan = plan_reconciliation(&catalog(), &snapshot, &guard);
    assert!(plan.is_ok_and(|plan| plan.is_empty()));
}

#[tokio::test]
async fn grants_follow_role_assignments_and_direct_permissions() {
    let store = reconciled(&catalog()).await;
    let guard = GuardName::default();
    let user = UserId::new(900);
    let Ok(Some(clerk)) = store.find_role(&guard, None, &role_name("Clerk")).await else {
        panic!("clerk role should exist");
    };
    let Ok(Some(role_list)) = store.find_permission(&guard, "role-list").await else {
        panic!("role-list should exist");
    };

    assert!(store.assign_role(user, clerk.id()).await.is_ok_and(|linked| linked));
    assert!(store.assign_role(user, clerk.id()).await.is_ok_and(|linked| !linked));
    assert!(
        store
            .grant_permission(user, role_list.id())
            .await
            .is_ok_and(|linked| linked)
    );

    let grants = store
        .load_principal_grants(&Principal::new(user, guard.clone()))
        .await
        .unwrap_or_default();
    assert_eq!(grants.roles, vec![role_name("Clerk")]);
    assert_eq!(grants.role_permissions.len(), 1);
    assert_eq!(grants.direct_permissions.len(), 1);

    assert!(store.revoke_permission(user, role_list.id()).await.is_ok_and(|removed| removed));
    assert!(store.revoke_permission(user, role_list.id()).await.is_ok_and(|removed| !removed));
}

#[tokio::test]
async fn team_roles_only_apply_inside_their_team() {
    let store = reconciled(&catalog()).await;
    let guard = GuardName::default();
    let team = TeamId::new();
    let user = UserId::new(901);

    let created = store
        .create_role(CreateRoleInput {
            name: role_name("Auditor"),
            guard_name: guard.clone(),
            team_id: Some(team),
            permissions: vec!["employee-list".to_owned()],
            created_by: None,
        })
        .await;
    let Ok(auditor) = created else {
        panic!("create should succeed: {created:?}");
    };
    assert!(store.assign_role(user, auditor.role.id()).await.is_ok());

    let outside = store
        .load_principal_grants(&Principal::new(user, guard.clone()))
        .await
        .unwrap_or_default();
    assert!(outside.roles.is_empty());

    let inside = store
        .load_principal_grants(&Principal::new(user, guard).with_team(team))
        .await
        .unwrap_or_default();
    assert_eq!(inside.roles, vec![role_name("Auditor")]);
}

#[tokio::test]
async fn team_lookups_prefer_the_team_role_and_fall_back_to_global() {
    let store = reconciled(&catalog()).await;
    let guard = GuardName::default();
    let team = TeamId::new();
    let Ok(Some(global_clerk)) = store.find_role(&guard, None, &role_name("Clerk")).await else {
        panic!("clerk role should exist");
    };

    let fallback = store.find_role(&guard, Some(team), &role_name("Clerk")).await;
    assert_eq!(fallback.ok().flatten().map(|role| role.id()), Some(global_clerk.id()));

    let created = store
        .create_role(CreateRoleInput {
            name: role_name("Clerk"),
            guard_name: guard.clone(),
            team_id: Some(team),
            permissions: Vec::new(),
            created_by: None,
        })
        .await;
    let Ok(team_clerk) = created else {
        panic!("team role should be created: {created:?}");
    };

    let shadowed = store.find_role(&guard, Some(team), &role_name("Clerk")).await;
    assert_eq!(shadowed.ok().flatten().map(|role| role.id()), Some(team_clerk.role.id()));

    let global = store.find_role(&guard, None, &role_name("Clerk")).await;
    assert_eq!(global.ok().flatten().map(|role| role.id()), Some(global_clerk.id()));
}

#[tokio::test]
async fn duplicate_and_unknown_role_inputs_are_rejected() {
    let store = reconciled(&catalog()).await;
    let input = |name: &str, permissions: &[&str]| CreateRoleInput {
        name: role_name(name),
        guard_name: GuardName::default(),
        team_id: None,
        permissions: permissions.iter().map(|name| (*name).to_owned()).collect(),
        created_by: Some(UserId::new(1)),
    };

    let duplicate = store.create_role(input("Clerk", &[])).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let unknown = store.create_role(input("Auditor", &["never-declared"])).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
    assert!(
        store
            .find_role(&GuardName::default(), None, &role_name("Auditor"))
            .await
            .is_ok_and(|role| role.is_none())
    );
}

#[tokio::test]
async fn replacing_role_permissions_is_exact() {
    let store = reconciled(&catalog()).await;
    let guard = GuardName::default();
    let Ok(Some(admin)) = store.find_role(&guard, None, &role_name("Admin")).await else {
        panic!("admin role should exist");
    };

    let replaced = store
        .replace_role_permissions(
            admin.id(),
            &BTreeSet::from(["role-list".to_owned()]),
            Some(UserId::new(1)),
        )
        .await;
    assert!(replaced.is_ok());

    let roles = store.list_roles(&guard).await.unwrap_or_default();
    let admin = roles
        .iter()
        .find(|definition| definition.role.name() == &role_name("Admin"));
    assert_eq!(
        admin.map(|definition| definition.permissions.clone()),
        Some(vec!["role-list".to_owned()])
    );
    assert_eq!(
        admin.and_then(|definition| definition.role.updated_by()),
        Some(UserId::new(1))
    );
}

#[tokio::test]
async fn pruned_permissions_disappear_from_roles_and_principals() {
    let extended = catalog().with_group(
        "Legacy",
        "LegacyController",
        [("legacy-export", &["export"][..])],
    );
    let store = reconciled(&extended).await;
    let guard = GuardName::default();
    let user = UserId::new(902);
    let Ok(Some(legacy)) = store.find_permission(&guard, "legacy-export").await else {
        panic!("legacy-export should exist");
    };
    assert!(store.grant_permission(user, legacy.id()).await.is_ok());

    reconcile(&store, &catalog()).await;

    let assignments = store.list_assignments(user, &guard).await;
    assert!(assignments.is_ok_and(|assignments| assignments.direct_permissions.is_empty()));
    let groups = store.list_permission_groups(&guard).await.unwrap_or_default();
    assert!(groups.iter().all(|group| group.group.name() != "Legacy"));
}

#[tokio::test]
async fn descendants_are_transitive_and_exclude_the_principal() {
    let store = InMemoryRbacStore::new();
    store.insert_user(UserId::new(1), None).await;
    store.insert_user(UserId::new(2), Some(UserId::new(1))).await;
    store.insert_user(UserId::new(3), Some(UserId::new(2))).await;
    store.insert_user(UserId::new(4), None).await;

    assert_eq!(
        store.descendant_ids(UserId::new(1)).await.ok().flatten(),
        Some(BTreeSet::from([UserId::new(2), UserId::new(3)]))
    );
    assert_eq!(
        store.descendant_ids(UserId::new(4)).await.ok().flatten(),
        Some(BTreeSet::new())
    );
    assert_eq!(
        store.descendant_ids(UserId::new(99)).await.ok().flatten(),
        Some(BTreeSet::new())
    );
}

#[tokio::test]
async fn unregistered_principals_only_see_their_own_rows() {
    let store = Arc::new(InMemoryRbacStore::new());
    store.insert_user(UserId::new(1), None).await;
    let scope = HierarchyScopeService::new(HierarchyScopePolicy::default(), store);

    let filter = scope
        .filter_for(
            Some(&Principal::new(UserId::new(999), GuardName::default())),
            &record_type("Employee"),
        )
        .await;

    assert_eq!(
        filter.ok(),
        Some(RowFilter::CreatedByIn(BTreeSet::from([UserId::new(999)])))
    );
}

#[tokio::test]
async fn record_reads_and_deletes_respect_the_row_filter() {
    let store = InMemoryRbacStore::new();
    let employees = record_type("Employee");
    let own = store
        .create_record(&employees, UserId::new(1), json!({"name": "Ada"}))
        .await;
    let Ok(own) = own else {
        panic!("create should succeed: {own:?}");
    };
    assert!(
        store
            .create_record(&employees, UserId::new(4), json!({"name": "Grace"}))
            .await
            .is_ok()
    );

    let scoped = RowFilter::CreatedByIn(BTreeSet::from([UserId::new(4)]));
    assert_eq!(
        store
            .list_records(&employees, &scoped)
            .await
            .map(|records| records.len())
            .ok(),
        Some(1)
    );
    assert!(
        store
            .find_record(&employees, own.record_id(), &scoped)
            .await
            .is_ok_and(|record| record.is_none())
    );
    assert!(
        store
            .delete_record(&employees, own.record_id(), &scoped)
            .await
            .is_ok_and(|deleted| !deleted)
    );
    assert!(
        store
            .list_records(&employees, &RowFilter::DenyAll)
            .await
            .is_ok_and(|records| records.is_empty())
    );
    assert!(
        store
            .delete_record(&employees, own.record_id(), &RowFilter::Unrestricted)
            .await
            .is_ok_and(|deleted| deleted)
    );
}
