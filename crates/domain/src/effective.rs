use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Outcome of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Granted through the super-administrator role.
    GrantedAsRoot,
    /// Granted through a role or direct permission.
    Granted,
    /// No matching grant.
    Denied,
}

impl AccessDecision {
    /// Returns whether the decision grants access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Returns a stable label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrantedAsRoot => "granted_as_root",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

/// Union of every permission a principal holds.
///
/// Maps permission names to their allowed methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    root: bool,
    permissions: BTreeMap<String, BTreeSet<String>>,
}

impl EffectivePermissions {
    /// Builds the set of a super-administrator from every permission in its guard.
    #[must_use]
    pub fn root<'a>(all_permissions: impl IntoIterator<Item = &'a Permission>) -> Self {
        let mut effective = Self::from_grants(all_permissions, std::iter::empty());
        effective.root = true;
        effective
    }

    /// Builds the union of role-derived and direct grants.
    #[must_use]
    pub fn from_grants<'a>(
        role_permissions: impl IntoIterator<Item = &'a Permission>,
        direct_permissions: impl IntoIterator<Item = &'a Permission>,
    ) -> Self {
        let mut permissions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for permission in role_permissions.into_iter().chain(direct_permissions) {
            permissions
                .entry(permission.name().to_owned())
                .or_default()
                .extend(permission.methods().iter().cloned());
        }

        Self {
            root: false,
            permissions,
        }
    }

    /// Returns whether the principal holds the super-administrator role.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Decides whether the named permission is granted.
    #[must_use]
    pub fn decide(&self, permission_name: &str) -> AccessDecision {
        if self.root {
            return AccessDecision::GrantedAsRoot;
        }

        if self.permissions.contains_key(permission_name) {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied
        }
    }

    /// Decides whether any held permission lists the action identifier.
    #[must_use]
    pub fn decide_method(&self, method: &str) -> AccessDecision {
        if self.root {
            return AccessDecision::GrantedAsRoot;
        }

        if self
            .permissions
            .values()
            .any(|methods| methods.contains(method))
        {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied
        }
    }

    /// Returns held permission names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.permissions.keys().map(String::as_str)
    }

    /// Returns the number of held permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether no permission is held and the principal is not root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.root && self.permissions.is_empty()
    }
}
