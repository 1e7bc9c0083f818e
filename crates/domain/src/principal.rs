use rowguard_core::{GuardName, TeamId};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated actor on whose behalf checks and queries run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    id: UserId,
    guard: GuardName,
    team_id: Option<TeamId>,
}

impl Principal {
    /// Creates a principal authenticated through the given guard.
    #[must_use]
    pub fn new(id: UserId, guard: GuardName) -> Self {
        Self {
            id,
            guard,
            team_id: None,
        }
    }

    /// Sets the active team for multi-team deployments.
    #[must_use]
    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the guard the principal authenticated through.
    #[must_use]
    pub fn guard(&self) -> &GuardName {
        &self.guard
    }

    /// Returns the active team, if any.
    #[must_use]
    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    /// Returns a stable key fragment identifying this principal context.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self.team_id {
            Some(team_id) => format!("{}:{}:team={team_id}", self.guard, self.id),
            None => format!("{}:{}:team=none", self.guard, self.id),
        }
    }
}
