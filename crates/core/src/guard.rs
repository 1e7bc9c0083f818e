use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Guard used when no other authentication context is configured.
pub const DEFAULT_GUARD: &str = "web";

/// Named authentication context partition (for example `web` or `api`).
///
/// Roles and permissions are scoped per guard: a role declared under `api`
/// never grants anything to a principal authenticated through `web`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuardName(String);

impl GuardName {
    /// Creates a validated guard name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "guard name must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "guard name '{trimmed}' must not contain whitespace"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying guard name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for GuardName {
    fn default() -> Self {
        Self(DEFAULT_GUARD.to_owned())
    }
}

impl TryFrom<String> for GuardName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GuardName> for String {
    fn from(value: GuardName) -> Self {
        value.0
    }
}

impl Display for GuardName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::GuardName;

    #[test]
    fn guard_name_trims_input() {
        let guard = GuardName::new("  api ");
        assert_eq!(guard.ok().as_ref().map(GuardName::as_str), Some("api"));
    }

    #[test]
    fn guard_name_rejects_inner_whitespace() {
        assert!(GuardName::new("web api").is_err());
    }

    #[test]
    fn default_guard_is_web() {
        assert_eq!(GuardName::default().as_str(), "web");
    }
}
