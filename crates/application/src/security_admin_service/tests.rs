use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rowguard_core::{AppError, AppResult, GuardName, TeamId};
use rowguard_domain::{
    AuditAction, Permission, PermissionGroup, PermissionGroupId, PermissionId, Principal, Role,
    RoleId, RoleName, UserId,
};
use tokio::sync::Mutex;

use crate::{
    AssignmentRepository, AuditEvent, AuditRepository, AuthorizationRepository,
    AuthorizationService, CreateRoleInput, PermissionGroupDefinition, PrincipalAssignments,
    PrincipalGrants, QueryCache, QueryCacheService, RoleDefinition, RoleRepository,
};

use super::SecurityAdminService;

const ROOT_USER: i64 = 1;
const CLERK_USER: i64 = 2;
const TARGET_USER: i64 = 3;

#[derive(Default)]
struct StoreState {
    roles: Vec<Role>,
    role_permissions: HashMap<RoleId, BTreeSet<String>>,
    user_roles: HashSet<(UserId, RoleId)>,
    user_permissions: HashSet<(UserId, PermissionId)>,
    groups: Vec<PermissionGroup>,
    next_role_id: i64,
}

struct FakeStore {
    permissions: Vec<Permission>,
    state: Mutex<StoreState>,
}

impl FakeStore {
    fn new() -> Self {
        let permissions = vec![
            permission(1, "employee-list"),
            permission(2, "employee-edit"),
            permission(3, "role-create"),
        ];
        let root = Role::new(
            RoleId::new(1),
            RoleName::Root,
            GuardName::default(),
            None,
        );
        let clerk = Role::new(
            RoleId::new(2),
            RoleName::Named("Clerk".to_owned()),
            GuardName::default(),
            None,
        );
        let groups = vec![
            PermissionGroup::new(PermissionGroupId::new(1), "Employee", "EmployeeController")
                .unwrap_or_else(|error| panic!("invalid test group: {error}")),
        ];

        Self {
            permissions,
            state: Mutex::new(StoreState {
                roles: vec![root, clerk],
                role_permissions: HashMap::from([(
                    RoleId::new(2),
                    BTreeSet::from(["employee-list".to_owned()]),
                )]),
                user_roles: HashSet::from([
                    (UserId::new(ROOT_USER), RoleId::new(1)),
                    (UserId::new(CLERK_USER), RoleId::new(2)),
                ]),
                user_permissions: HashSet::new(),
                groups,
                next_role_id: 3,
            }),
        }
    }

    fn permission_named(&self, name: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|permission| permission.name() == name)
    }
}

#[async_trait]
impl AuthorizationRepository for FakeStore {
    async fn load_principal_grants(&self, principal: &Principal) -> AppResult<PrincipalGrants> {
        let state = self.state.lock().await;
        let mut grants = PrincipalGrants::default();

        for role in &state.roles {
            if !state.user_roles.contains(&(principal.id(), role.id())) {
                continue;
            }
            grants.roles.push(role.name().clone());
            for name in state.role_permissions.get(&role.id()).into_iter().flatten() {
                if let Some(permission) = self.permission_named(name) {
                    grants.role_permissions.push(permission.clone());
                }
            }
        }

        grants.direct_permissions = self
            .permissions
            .iter()
            .filter(|permission| {
                state
                    .user_permissions
                    .contains(&(principal.id(), permission.id()))
            })
            .cloned()
            .collect();

        Ok(grants)
    }

    async fn list_guard_permissions(&self, _guard: &GuardName) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.clone())
    }
}

#[async_trait]
impl RoleRepository for FakeStore {
    async fn list_roles(&self, _guard: &GuardName) -> AppResult<Vec<RoleDefinition>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .iter()
            .map(|role| RoleDefinition {
                role: role.clone(),
                permissions: state
                    .role_permissions
                    .get(&role.id())
                    .map(|names| names.iter().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn find_role(
        &self,
        _guard: &GuardName,
        team_id: Option<TeamId>,
        name: &RoleName,
    ) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        let named = || state.roles.iter().filter(move |role| role.name() == name);

        Ok(named()
            .find(|role| team_id.is_some() && role.team_id() == team_id)
            .or_else(|| named().find(|role| role.team_id().is_none()))
            .cloned())
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition> {
        let mut state = self.state.lock().await;
        if state
            .roles
            .iter()
            .any(|role| role.name() == &input.name && role.team_id() == input.team_id)
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                input.name
            )));
        }
        if let Some(missing) = input
            .permissions
            .iter()
            .find(|name| self.permission_named(name).is_none())
        {
            return Err(AppError::NotFound(format!(
                "permission '{missing}' was not found"
            )));
        }

        let role = Role::new(
            RoleId::new(state.next_role_id),
            input.name,
            input.guard_name,
            input.team_id,
        )
        .with_authors(input.created_by, input.created_by);
        state.next_role_id += 1;
        let permissions: BTreeSet<String> = input.permissions.into_iter().collect();
        state.role_permissions.insert(role.id(), permissions.clone());
        state.roles.push(role.clone());

        Ok(RoleDefinition {
            role,
            permissions: permissions.into_iter().collect(),
        })
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.roles.retain(|role| role.id() != role_id);
        state.role_permissions.remove(&role_id);
        state.user_roles.retain(|(_, linked)| *linked != role_id);
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &BTreeSet<String>,
        _updated_by: Option<UserId>,
    ) -> AppResult<()> {
        self.state
            .lock()
            .await
            .role_permissions
            .insert(role_id, permissions.clone());
        Ok(())
    }

    async fn find_permission(
        &self,
        _guard: &GuardName,
        name: &str,
    ) -> AppResult<Option<Permission>> {
        Ok(self.permission_named(name).cloned())
    }

    async fn list_permission_groups(
        &self,
        _guard: &GuardName,
    ) -> AppResult<Vec<PermissionGroupDefinition>> {
        Ok(self
            .state
            .lock()
            .await
            .groups
            .iter()
            .map(|group| PermissionGroupDefinition {
                group: group.clone(),
                permissions: self.permissions.clone(),
            })
            .collect())
    }

    async fn relabel_group(
        &self,
        group_name: &str,
        controller: &str,
    ) -> AppResult<PermissionGroup> {
        let mut state = self.state.lock().await;
        let Some(group) = state
            .groups
            .iter_mut()
            .find(|group| group.name() == group_name)
        else {
            return Err(AppError::NotFound(format!(
                "group '{group_name}' was not found"
            )));
        };

        *group = PermissionGroup::new(group.id(), group_name, controller)?;
        Ok(group.clone())
    }
}

#[async_trait]
impl AssignmentRepository for FakeStore {
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        Ok(self.state.lock().await.user_roles.insert((user_id, role_id)))
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .user_roles
            .remove(&(user_id, role_id)))
    }

    async fn grant_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .user_permissions
            .insert((user_id, permission_id)))
    }

    async fn revoke_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .user_permissions
            .remove(&(user_id, permission_id)))
    }

    async fn list_assignments(
        &self,
        user_id: UserId,
        _guard: &GuardName,
    ) -> AppResult<PrincipalAssignments> {
        let state = self.state.lock().await;
        Ok(PrincipalAssignments {
            user_id,
            roles: state
                .roles
                .iter()
                .filter(|role| state.user_roles.contains(&(user_id, role.id())))
                .cloned()
                .collect(),
            direct_permissions: self
                .permissions
                .iter()
                .filter(|permission| state.user_permissions.contains(&(user_id, permission.id())))
                .cloned()
                .collect(),
        })
    }
}

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
struct FakeQueryCache {
    entries: Mutex<HashMap<String, (String, Vec<String>)>>,
}

#[async_trait]
impl QueryCache for FakeQueryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        _ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value, tags.to_vec()));
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (_, entry_tags)| !entry_tags.iter().any(|tag| tags.contains(tag)));
        Ok((before - entries.len()) as u64)
    }
}

struct Harness {
    service: SecurityAdminService,
    authorization: AuthorizationService,
    audit: Arc<FakeAuditRepository>,
}

fn harness() -> Harness {
    let store = Arc::new(FakeStore::new());
    let audit = Arc::new(FakeAuditRepository::default());
    let cache = QueryCacheService::new(Arc::new(FakeQueryCache::default()), 60);
    let authorization = AuthorizationService::new(store.clone(), cache.clone());

    Harness {
        service: SecurityAdminService::new(
            authorization.clone(),
            store.clone(),
            store,
            audit.clone(),
            cache,
        ),
        authorization,
        audit,
    }
}

fn permission(id: i64, name: &str) -> Permission {
    Permission::new(
        PermissionId::new(id),
        PermissionGroupId::new(1),
        name,
        GuardName::default(),
        vec!["index".to_owned()],
    )
    .unwrap_or_else(|error| panic!("invalid test permission: {error}"))
}

fn principal(id: i64) -> Principal {
    Principal::new(UserId::new(id), GuardName::default())
}

fn role_name(value: &str) -> RoleName {
    RoleName::parse(value).unwrap_or_else(|error| panic!("invalid test role: {error}"))
}

async fn audit_actions(audit: &FakeAuditRepository) -> Vec<AuditAction> {
    audit
        .events
        .lock()
        .await
        .iter()
        .map(|event| event.action)
        .collect()
}

#[tokio::test]
async fn role_administration_requires_actor_permissions() {
    let harness = harness();
    let clerk = principal(CLERK_USER);

    let created = harness
        .service
        .create_role(&clerk, role_name("Auditor"), Vec::new())
        .await;
    assert!(matches!(created, Err(AppError::Forbidden(_))));

    let listed = harness.service.list_roles(&clerk).await;
    assert!(matches!(listed, Err(AppError::Forbidden(_))));
    assert!(audit_actions(&harness.audit).await.is_empty());
}

#[tokio::test]
async fn root_creates_role_and_records_audit_event() {
    let harness = harness();
    let root = principal(ROOT_USER);

    let created = harness
        .service
        .create_role(
            &root,
            role_name("Auditor"),
            vec!["employee-list".to_owned()],
        )
        .await;
    let Ok(created) = created else {
        panic!("root should create roles: {created:?}");
    };
    assert_eq!(created.permissions, vec!["employee-list".to_owned()]);
    assert_eq!(created.role.created_by(), Some(UserId::new(ROOT_USER)));

    let duplicate = harness
        .service
        .create_role(&root, role_name("Auditor"), Vec::new())
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let events = harness.audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::SecurityRoleCreated);
    assert_eq!(events[0].actor, Some(UserId::new(ROOT_USER)));
}

#[tokio::test]
async fn root_role_cannot_be_deleted() {
    let harness = harness();
    let root = principal(ROOT_USER);

    let deleted = harness.service.delete_role(&root, &RoleName::Root).await;
    assert!(matches!(deleted, Err(AppError::Conflict(_))));

    let missing = harness
        .service
        .delete_role(&root, &role_name("Ghost"))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn role_permission_sync_replaces_set_and_refreshes_holders() {
    let harness = harness();
    let root = principal(ROOT_USER);
    let clerk = principal(CLERK_USER);

    assert_eq!(
        harness
            .authorization
            .authorize(Some(&clerk), "employee-list")
            .await
            .ok(),
        Some(true)
    );

    let synced = harness
        .service
        .sync_role_permissions(
            &root,
            &role_name("Clerk"),
            BTreeSet::from(["employee-edit".to_owned()]),
        )
        .await;
    assert!(synced.is_ok());

    assert_eq!(
        harness
            .authorization
            .authorize(Some(&clerk), "employee-list")
            .await
            .ok(),
        Some(false)
    );
    assert_eq!(
        harness
            .authorization
            .authorize(Some(&clerk), "employee-edit")
            .await
            .ok(),
        Some(true)
    );
    assert_eq!(
        audit_actions(&harness.audit).await,
        vec![AuditAction::SecurityRolePermissionsSynced]
    );
}

#[tokio::test]
async fn duplicate_assignment_is_a_no_op() {
    let harness = harness();
    let root = principal(ROOT_USER);
    let target = UserId::new(TARGET_USER);
    let clerk_role = role_name("Clerk");

    for _ in 0..2 {
        let assigned = harness
            .service
            .assign_role(&root, target, &clerk_role)
            .await;
        assert!(assigned.is_ok());
    }

    let assignments = harness.service.list_assignments(&root, target).await;
    assert_eq!(assignments.map(|value| value.roles.len()).ok(), Some(1));
    assert_eq!(
        audit_actions(&harness.audit).await,
        vec![AuditAction::SecurityRoleAssigned]
    );

    let unknown = harness
        .service
        .assign_role(&root, target, &role_name("Ghost"))
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn team_scoped_actor_manages_global_roles() {
    let harness = harness();
    let actor = principal(ROOT_USER).with_team(TeamId::new());
    let target = UserId::new(TARGET_USER);
    let clerk_role = role_name("Clerk");

    let assigned = harness
        .service
        .assign_role(&actor, target, &clerk_role)
        .await;
    assert!(assigned.is_ok(), "assign failed: {assigned:?}");

    let assignments = harness.service.list_assignments(&actor, target).await;
    let held: Option<Vec<RoleName>> = assignments
        .ok()
        .map(|value| value.roles.iter().map(|role| role.name().clone()).collect());
    assert_eq!(held, Some(vec![clerk_role.clone()]));

    let unassigned = harness
        .service
        .unassign_role(&actor, target, &clerk_role)
        .await;
    assert!(unassigned.is_ok(), "unassign failed: {unassigned:?}");
    assert_eq!(
        audit_actions(&harness.audit).await,
        vec![
            AuditAction::SecurityRoleAssigned,
            AuditAction::SecurityRoleUnassigned
        ]
    );
}

#[tokio::test]
async fn removing_missing_links_reports_not_found() {
    let harness = harness();
    let root = principal(ROOT_USER);
    let target = UserId::new(TARGET_USER);

    let unassigned = harness
        .service
        .unassign_role(&root, target, &role_name("Clerk"))
        .await;
    assert!(matches!(unassigned, Err(AppError::NotFound(_))));

    let revoked = harness
        .service
        .revoke_permission(&root, target, "employee-list")
        .await;
    assert!(matches!(revoked, Err(AppError::NotFound(_))));

    let unknown = harness
        .service
        .grant_permission(&root, target, "never-declared")
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn direct_grants_take_effect_immediately() {
    let harness = harness();
    let root = principal(ROOT_USER);
    let target_principal = principal(TARGET_USER);
    let target = UserId::new(TARGET_USER);

    assert_eq!(
        harness
            .authorization
            .authorize(Some(&target_principal), "employee-edit")
            .await
            .ok(),
        Some(false)
    );

    assert!(
        harness
            .service
            .grant_permission(&root, target, "employee-edit")
            .await
            .is_ok()
    );
    assert_eq!(
        harness
            .authorization
            .authorize(Some(&target_principal), "employee-edit")
            .await
            .ok(),
        Some(true)
    );

    assert!(
        harness
            .service
            .revoke_permission(&root, target, "employee-edit")
            .await
            .is_ok()
    );
    assert_eq!(
        harness
            .authorization
            .authorize(Some(&target_principal), "employee-edit")
            .await
            .ok(),
        Some(false)
    );
    assert_eq!(
        audit_actions(&harness.audit).await,
        vec![
            AuditAction::SecurityPermissionGranted,
            AuditAction::SecurityPermissionRevoked,
        ]
    );
}

#[tokio::test]
async fn group_relabel_keeps_group_name() {
    let harness = harness();
    let root = principal(ROOT_USER);

    let relabeled = harness
        .service
        .relabel_permission_group(&root, "Employee", "  StaffController ")
        .await;
    let Ok(group) = relabeled else {
        panic!("relabel should succeed: {relabeled:?}");
    };
    assert_eq!(group.name(), "Employee");
    assert_eq!(group.controller(), "StaffController");

    let groups = harness.service.list_permission_groups(&root).await;
    assert_eq!(
        groups
            .ok()
            .and_then(|groups| groups.first().map(|group| group.group.controller().to_owned())),
        Some("StaffController".to_owned())
    );
}
