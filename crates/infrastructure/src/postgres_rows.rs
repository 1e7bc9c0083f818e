//! Row projections shared by the PostgreSQL adapters.

use rowguard_application::RoleDefinition;
use rowguard_core::{AppError, AppResult, GuardName, TeamId};
use rowguard_domain::{
    Permission, PermissionGroup, PermissionGroupId, PermissionId, Role, RoleId, RoleName, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub(crate) struct PermissionGroupRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) controller: String,
}

impl PermissionGroupRow {
    pub(crate) fn into_domain(self) -> AppResult<PermissionGroup> {
        PermissionGroup::new(PermissionGroupId::new(self.id), self.name, self.controller)
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode permission group '{}': {error}",
                    self.id
                ))
            })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    pub(crate) id: i64,
    pub(crate) permissiongroup_id: i64,
    pub(crate) name: String,
    pub(crate) guard_name: String,
    pub(crate) methods: Vec<String>,
}

impl PermissionRow {
    pub(crate) fn into_domain(self) -> AppResult<Permission> {
        let id = self.id;
        GuardName::new(self.guard_name)
            .and_then(|guard_name| {
                Permission::new(
                    PermissionId::new(self.id),
                    PermissionGroupId::new(self.permissiongroup_id),
                    self.name,
                    guard_name,
                    self.methods,
                )
            })
            .map_err(|error| {
                AppError::Internal(format!("failed to decode permission '{id}': {error}"))
            })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RoleRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) guard_name: String,
    pub(crate) team_id: Option<Uuid>,
    pub(crate) created_by: Option<i64>,
    pub(crate) updated_by: Option<i64>,
}

impl RoleRow {
    pub(crate) fn into_domain(self) -> AppResult<Role> {
        let id = self.id;
        let name = RoleName::parse(self.name);
        let guard_name = GuardName::new(self.guard_name);

        match (name, guard_name) {
            (Ok(name), Ok(guard_name)) => Ok(Role::new(
                RoleId::new(self.id),
                name,
                guard_name,
                self.team_id.map(TeamId::from_uuid),
            )
            .with_authors(
                self.created_by.map(UserId::new),
                self.updated_by.map(UserId::new),
            )),
            (Err(error), _) | (_, Err(error)) => Err(AppError::Internal(format!(
                "failed to decode role '{id}': {error}"
            ))),
        }
    }
}

/// Role columns joined with one owned permission name.
#[derive(Debug, FromRow)]
pub(crate) struct RolePermissionRow {
    #[sqlx(flatten)]
    pub(crate) role: RoleRow,
    pub(crate) permission: Option<String>,
}

/// Folds role rows ordered by role into role definitions.
pub(crate) fn aggregate_roles(
    rows: Vec<RolePermissionRow>,
) -> AppResult<Vec<RoleDefinition>> {
    let mut definitions: Vec<RoleDefinition> = Vec::new();

    for row in rows {
        let RolePermissionRow { role, permission } = row;
        let role_id = RoleId::new(role.id);

        if definitions
            .last()
            .is_none_or(|definition| definition.role.id() != role_id)
        {
            definitions.push(RoleDefinition {
                role: role.into_domain()?,
                permissions: Vec::new(),
            });
        }
        let Some(definition) = definitions.last_mut() else {
            continue;
        };

        if let Some(permission) = permission {
            definition.permissions.push(permission);
        }
    }

    Ok(definitions)
}
