use rowguard_core::{AppResult, GuardName, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{PermissionGroupId, PermissionId};

/// Feature area owning a set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    id: PermissionGroupId,
    name: NonEmptyString,
    controller: String,
}

impl PermissionGroup {
    /// Creates a validated permission group.
    pub fn new(
        id: PermissionGroupId,
        name: impl Into<String>,
        controller: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            controller: controller.into().trim().to_owned(),
        })
    }

    /// Returns the storage identifier.
    #[must_use]
    pub fn id(&self) -> PermissionGroupId {
        self.id
    }

    /// Returns the unique group name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the label of the feature controller owning this group.
    #[must_use]
    pub fn controller(&self) -> &str {
        self.controller.as_str()
    }
}

/// Named permission tagged with a guard and its allowed action identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    group_id: PermissionGroupId,
    name: NonEmptyString,
    guard_name: GuardName,
    methods: Vec<String>,
}

impl Permission {
    /// Creates a validated permission. Methods are trimmed and deduplicated.
    pub fn new(
        id: PermissionId,
        group_id: PermissionGroupId,
        name: impl Into<String>,
        guard_name: GuardName,
        methods: Vec<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            group_id,
            name: NonEmptyString::new(name)?,
            guard_name,
            methods: normalize_methods(methods),
        })
    }

    /// Returns the storage identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the owning group identifier.
    #[must_use]
    pub fn group_id(&self) -> PermissionGroupId {
        self.group_id
    }

    /// Returns the permission name, unique within its guard.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the guard this permission belongs to.
    #[must_use]
    pub fn guard_name(&self) -> &GuardName {
        &self.guard_name
    }

    /// Returns the allowed action identifiers.
    #[must_use]
    pub fn methods(&self) -> &[String] {
        self.methods.as_slice()
    }

    /// Returns whether the action identifier is listed for this permission.
    #[must_use]
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.iter().any(|value| value == method)
    }
}

/// Trims, drops blanks and removes duplicates while keeping declaration order.
#[must_use]
pub fn normalize_methods(methods: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(methods.len());
    for method in methods {
        let method = method.trim();
        if method.is_empty() || normalized.iter().any(|value| value == method) {
            continue;
        }
        normalized.push(method.to_owned());
    }

    normalized
}
