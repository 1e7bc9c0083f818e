use std::fmt::{Display, Formatter};

use rowguard_core::{AppError, AppResult, GuardName, TeamId};
use serde::{Deserialize, Serialize};

use crate::{RoleId, UserId};

/// Stored name of the super-administrator role.
pub const ROOT_ROLE_NAME: &str = "RootUser";

/// Role name with the super-administrator role as an explicit variant.
///
/// Always build values through [`RoleName::parse`], which maps the stored
/// name `RootUser` to [`RoleName::Root`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleName {
    /// Grants every permission without consulting stored grants.
    Root,
    /// Ordinary role whose grants come from `role_has_permissions`.
    Named(String),
}

impl RoleName {
    /// Parses a stored or declared role name.
    pub fn parse(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        if trimmed == ROOT_ROLE_NAME {
            return Ok(Self::Root);
        }

        Ok(Self::Named(trimmed.to_owned()))
    }

    /// Returns the storage value for this role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => ROOT_ROLE_NAME,
            Self::Named(name) => name.as_str(),
        }
    }

    /// Returns whether this is the super-administrator role.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl TryFrom<String> for RoleName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.as_str().to_owned()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Named role scoped to a guard and, when teams are enabled, to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: RoleName,
    guard_name: GuardName,
    team_id: Option<TeamId>,
    created_by: Option<UserId>,
    updated_by: Option<UserId>,
}

impl Role {
    /// Creates a role projection.
    #[must_use]
    pub fn new(id: RoleId, name: RoleName, guard_name: GuardName, team_id: Option<TeamId>) -> Self {
        Self {
            id,
            name,
            guard_name,
            team_id,
            created_by: None,
            updated_by: None,
        }
    }

    /// Attaches the audit columns recorded on the role row.
    #[must_use]
    pub fn with_authors(mut self, created_by: Option<UserId>, updated_by: Option<UserId>) -> Self {
        self.created_by = created_by;
        self.updated_by = updated_by;
        self
    }

    /// Returns the storage identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &RoleName {
        &self.name
    }

    /// Returns the guard the role belongs to.
    #[must_use]
    pub fn guard_name(&self) -> &GuardName {
        &self.guard_name
    }

    /// Returns the owning team, `None` for global roles.
    #[must_use]
    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    /// Returns the principal that created the role.
    #[must_use]
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Returns the principal that last updated the role.
    #[must_use]
    pub fn updated_by(&self) -> Option<UserId> {
        self.updated_by
    }

    /// Returns whether the role applies to a principal in the given team.
    ///
    /// Global roles apply to every team.
    #[must_use]
    pub fn applies_to_team(&self, team_id: Option<TeamId>) -> bool {
        match self.team_id {
            None => true,
            Some(role_team) => team_id == Some(role_team),
        }
    }
}
