use std::collections::BTreeSet;

use rowguard_application::{
    AssignmentRepository, AuthorizationRepository, CreateRoleInput, RoleRepository,
};
use rowguard_core::{AppError, GuardName, TeamId};
use rowguard_domain::{Principal, RoleName, UserId};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresSecurityAdminRepository;
use crate::PostgresAuthorizationRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres security admin tests: {error}");
    }

    Some(pool)
}

fn unique_guard() -> GuardName {
    GuardName::new(format!("guard-{}", Uuid::new_v4()))
        .unwrap_or_else(|error| panic!("invalid guard: {error}"))
}

fn role_name(value: &str) -> RoleName {
    RoleName::parse(value).unwrap_or_else(|error| panic!("invalid role name: {error}"))
}

async fn insert_user(pool: &PgPool, name: &str) -> UserId {
    let inserted = sqlx::query_scalar::<_, i64>("INSERT INTO users (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await;

    UserId::new(inserted.unwrap_or_else(|error| panic!("failed to insert user: {error}")))
}

async fn seed_permissions(pool: &PgPool, guard: &GuardName, names: &[&str]) {
    let group = format!("Group {}", Uuid::new_v4());
    let group_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO permission_groups (name, controller) VALUES ($1, 'TestController') RETURNING id",
    )
    .bind(group.as_str())
    .fetch_one(pool)
    .await
    .unwrap_or_else(|error| panic!("failed to insert group: {error}"));

    for name in names {
        let insert = sqlx::query(
            r#"
            INSERT INTO permissions (permissiongroup_id, name, guard_name, methods)
            VALUES ($1, $2, $3, ARRAY['index'])
            "#,
        )
        .bind(group_id)
        .bind(*name)
        .bind(guard.as_str())
        .execute(pool)
        .await;

        assert!(insert.is_ok());
    }
}

fn input(guard: &GuardName, name: &str, permissions: &[&str]) -> CreateRoleInput {
    CreateRoleInput {
        name: role_name(name),
        guard_name: guard.clone(),
        team_id: None,
        permissions: permissions.iter().map(|name| (*name).to_owned()).collect(),
        created_by: None,
    }
}

#[tokio::test]
async fn create_role_attaches_permissions_and_rejects_duplicates() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let guard = unique_guard();
    seed_permissions(&pool, &guard, &["employee-list", "employee-edit"]).await;

    let created = repository
        .create_role(input(&guard, "Clerk", &["employee-list", "employee-edit"]))
        .await;
    let Ok(created) = created else {
        panic!("create should succeed: {created:?}");
    };
    assert_eq!(
        created.permissions,
        vec!["employee-edit".to_owned(), "employee-list".to_owned()]
    );

    let duplicate = repository.create_role(input(&guard, "Clerk", &[])).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let team_scoped = repository
        .create_role(CreateRoleInput {
            team_id: Some(TeamId::new()),
            ..input(&guard, "Clerk", &[])
        })
        .await;
    assert!(team_scoped.is_ok());

    let unknown = repository
        .create_role(input(&guard, "Auditor", &["never-declared"]))
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
    assert!(
        repository
            .find_role(&guard, None, &role_name("Auditor"))
            .await
            .is_ok_and(|role| role.is_none())
    );
}

#[tokio::test]
async fn team_lookup_prefers_team_role_over_global_role() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let guard = unique_guard();
    let team = TeamId::new();
    let created = repository.create_role(input(&guard, "Clerk", &[])).await;
    let Ok(global) = created else {
        panic!("create should succeed: {created:?}");
    };

    let fallback = repository
        .find_role(&guard, Some(team), &role_name("Clerk"))
        .await;
    assert_eq!(
        fallback.ok().flatten().map(|role| role.id()),
        Some(global.role.id())
    );

    let created = repository
        .create_role(CreateRoleInput {
            team_id: Some(team),
            ..input(&guard, "Clerk", &[])
        })
        .await;
    let Ok(team_role) = created else {
        panic!("team role should be created: {created:?}");
    };

    let shadowed = repository
        .find_role(&guard, Some(team), &role_name("Clerk"))
        .await;
    assert_eq!(
        shadowed.ok().flatten().map(|role| role.id()),
        Some(team_role.role.id())
    );

    let unscoped = repository.find_role(&guard, None, &role_name("Clerk")).await;
    assert_eq!(
        unscoped.ok().flatten().map(|role| role.id()),
        Some(global.role.id())
    );
}

#[tokio::test]
async fn replace_role_permissions_is_a_full_replacement() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let guard = unique_guard();
    seed_permissions(&pool, &guard, &["role-list", "role-edit", "role-delete"]).await;
    let editor = insert_user(&pool, "editor").await;

    let created = repository
        .create_role(input(&guard, "Admin", &["role-list", "role-edit"]))
        .await;
    let Ok(created) = created else {
        panic!("create should succeed: {created:?}");
    };

    let replaced = repository
        .replace_role_permissions(
            created.role.id(),
            &BTreeSet::from(["role-delete".to_owned()]),
            Some(editor),
        )
        .await;
    assert!(replaced.is_ok());

    let roles = repository.list_roles(&guard).await.unwrap_or_default();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].permissions, vec!["role-delete".to_owned()]);
    assert_eq!(roles[0].role.updated_by(), Some(editor));

    let deleted = repository.delete_role(created.role.id()).await;
    assert!(deleted.is_ok());
    let missing = repository.delete_role(created.role.id()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn assignments_are_idempotent_and_feed_principal_grants() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let authorization = PostgresAuthorizationRepository::new(pool.clone());
    let guard = unique_guard();
    seed_permissions(&pool, &guard, &["enquiry-list", "enquiry-edit"]).await;
    let user = insert_user(&pool, "clerk").await;

    let created = repository
        .create_role(input(&guard, "Clerk", &["enquiry-list"]))
        .await;
    let Ok(created) = created else {
        panic!("create should succeed: {created:?}");
    };
    let Ok(Some(edit)) = repository.find_permission(&guard, "enquiry-edit").await else {
        panic!("enquiry-edit should exist");
    };

    assert!(
        repository
            .assign_role(user, created.role.id())
            .await
            .is_ok_and(|linked| linked)
    );
    assert!(
        repository
            .assign_role(user, created.role.id())
            .await
            .is_ok_and(|linked| !linked)
    );
    assert!(
        repository
            .grant_permission(user, edit.id())
            .await
            .is_ok_and(|linked| linked)
    );

    let grants = authorization
        .load_principal_grants(&Principal::new(user, guard.clone()))
        .await
        .unwrap_or_default();
    assert_eq!(grants.roles, vec![role_name("Clerk")]);
    assert_eq!(grants.role_permissions.len(), 1);
    assert_eq!(grants.direct_permissions.len(), 1);

    let assignments = repository.list_assignments(user, &guard).await;
    assert!(assignments.is_ok_and(|assignments| {
        assignments.roles.len() == 1 && assignments.direct_permissions.len() == 1
    }));

    assert!(
        repository
            .remove_role(user, created.role.id())
            .await
            .is_ok_and(|removed| removed)
    );
    assert!(
        repository
            .revoke_permission(user, edit.id())
            .await
            .is_ok_and(|removed| removed)
    );
    assert!(
        repository
            .revoke_permission(user, edit.id())
            .await
            .is_ok_and(|removed| !removed)
    );
}

#[tokio::test]
async fn relabel_group_changes_only_the_controller() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSecurityAdminRepository::new(pool.clone());
    let guard = unique_guard();
    seed_permissions(&pool, &guard, &["report-view"]).await;

    let groups = repository
        .list_permission_groups(&guard)
        .await
        .unwrap_or_default();
    let Some(seeded) = groups
        .iter()
        .find(|group| group.permissions.iter().any(|p| p.guard_name() == &guard))
    else {
        panic!("seeded group should be listed");
    };

    let relabeled = repository
        .relabel_group(seeded.group.name(), "  ReportController ")
        .await;
    assert!(relabeled.is_ok_and(|group| {
        group.id() == seeded.group.id() && group.controller() == "ReportController"
    }));

    let missing = repository
        .relabel_group(&format!("missing-{}", Uuid::new_v4()), "X")
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
