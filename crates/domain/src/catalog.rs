use std::collections::{BTreeMap, BTreeSet};

use rowguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::RoleName;

/// Declared feature group with its permissions and their allowed methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredGroup {
    /// Label of the feature controller owning the group.
    pub controller: String,
    /// Permission name to allowed action identifiers.
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<String>>,
}

/// One declared permission flattened with its group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredPermission<'a> {
    /// Owning group name.
    pub group: &'a str,
    /// Permission name.
    pub name: &'a str,
    /// Declared allowed methods.
    pub methods: &'a [String],
}

/// Source-of-truth declaration of which groups, permissions and roles exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCatalog {
    /// Group name to group declaration.
    #[serde(default)]
    pub groups: BTreeMap<String, DeclaredGroup>,
    /// Role name to the exact list of permission names it owns.
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
}

impl PermissionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from its JSON representation.
    pub fn from_json(value: &str) -> AppResult<Self> {
        serde_json::from_str(value).map_err(|error| {
            AppError::Configuration(format!("invalid permission catalog JSON: {error}"))
        })
    }

    /// Adds or replaces a group declaration.
    #[must_use]
    pub fn with_group<'a>(
        mut self,
        name: impl Into<String>,
        controller: impl Into<String>,
        permissions: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
    ) -> Self {
        let permissions = permissions
            .into_iter()
            .map(|(name, methods)| {
                (
                    name.to_owned(),
                    methods.iter().map(|method| (*method).to_owned()).collect(),
                )
            })
            .collect();

        self.groups.insert(
            name.into(),
            DeclaredGroup {
                controller: controller.into(),
                permissions,
            },
        );
        self
    }

    /// Adds or replaces a role declaration.
    #[must_use]
    pub fn with_role<'a>(
        mut self,
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.roles.insert(
            name.into(),
            permissions.into_iter().map(str::to_owned).collect(),
        );
        self
    }

    /// Iterates every declared permission in group then name order.
    pub fn permissions(&self) -> impl Iterator<Item = DeclaredPermission<'_>> {
        self.groups.iter().flat_map(|(group, declared)| {
            declared
                .permissions
                .iter()
                .map(move |(name, methods)| DeclaredPermission {
                    group: group.as_str(),
                    name: name.as_str(),
                    methods: methods.as_slice(),
                })
        })
    }

    /// Returns the set of declared permission names.
    #[must_use]
    pub fn permission_names(&self) -> BTreeSet<&str> {
        self.permissions().map(|permission| permission.name).collect()
    }

    /// Returns the declared roles with their deduplicated permission sets.
    pub fn role_permissions(&self) -> AppResult<Vec<(RoleName, BTreeSet<String>)>> {
        self.roles
            .iter()
            .map(|(name, permissions)| {
                Ok((
                    RoleName::parse(name.as_str())?,
                    permissions
                        .iter()
                        .map(|permission| permission.trim().to_owned())
                        .collect(),
                ))
            })
            .collect()
    }

    /// Checks the declaration for typos before anything is written.
    ///
    /// Fails with [`AppError::Configuration`] when a name is blank or padded
    /// with whitespace, a permission is declared in more than one group, or a
    /// role references a permission no group declares.
    pub fn validate(&self) -> AppResult<()> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();

        for (group, declared) in &self.groups {
            if group.trim().is_empty() {
                return Err(AppError::Configuration(
                    "permission group name must not be empty".to_owned(),
                ));
            }
            if group.trim() != group {
                return Err(AppError::Configuration(format!(
                    "permission group name '{group}' has surrounding whitespace"
                )));
            }

            for name in declared.permissions.keys() {
                if name.trim().is_empty() {
                    return Err(AppError::Configuration(format!(
                        "permission group '{group}' declares an empty permission name"
                    )));
                }
                if name.trim() != name {
                    return Err(AppError::Configuration(format!(
                        "permission '{name}' in group '{group}' has surrounding whitespace"
                    )));
                }

                if let Some(previous) = owners.insert(name.as_str(), group.as_str()) {
                    return Err(AppError::Configuration(format!(
                        "permission '{name}' is declared in both '{previous}' and '{group}'"
                    )));
                }
            }
        }

        for (role, permissions) in &self.roles {
            RoleName::parse(role.as_str()).map_err(|_| {
                AppError::Configuration("role name must not be empty".to_owned())
            })?;

            if let Some(unknown) = permissions
                .iter()
                .find(|permission| !owners.contains_key(permission.trim()))
            {
                return Err(AppError::Configuration(format!(
                    "role '{role}' references undeclared permission '{unknown}'"
                )));
            }
        }

        Ok(())
    }
}
