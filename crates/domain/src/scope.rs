use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rowguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Record types visible to everyone regardless of hierarchy.
pub const DEFAULT_EXCLUDED_RECORD_TYPES: &[&str] = &["Role", "User", "Enquiry"];

/// Name of a business record type subject to row-level scoping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordType(String);

impl RecordType {
    /// Creates a validated record type name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "record type must not be empty".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the record type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RecordType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.0
    }
}

impl Display for RecordType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Filter applied when the scope cannot identify a hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFallback {
    /// Leave the query unrestricted.
    #[default]
    AllowAll,
    /// Return no rows.
    DenyAll,
}

impl FromStr for ScopeFallback {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" | "allow_all" | "open" => Ok(Self::AllowAll),
            "deny" | "deny_all" | "closed" => Ok(Self::DenyAll),
            other => Err(AppError::Validation(format!(
                "scope fallback must be 'allow' or 'deny', got '{other}'"
            ))),
        }
    }
}

/// Configuration of the hierarchy scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyScopePolicy {
    excluded: BTreeSet<RecordType>,
    fallback: ScopeFallback,
}

impl HierarchyScopePolicy {
    /// Creates a policy from an exclusion list and a fallback.
    #[must_use]
    pub fn new(excluded: impl IntoIterator<Item = RecordType>, fallback: ScopeFallback) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            fallback,
        }
    }

    /// Returns whether the record type bypasses the scope.
    #[must_use]
    pub fn is_excluded(&self, record_type: &RecordType) -> bool {
        self.excluded.contains(record_type)
    }

    /// Returns the excluded record types.
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<RecordType> {
        &self.excluded
    }

    /// Returns the configured fallback.
    #[must_use]
    pub fn fallback(&self) -> ScopeFallback {
        self.fallback
    }
}

impl Default for HierarchyScopePolicy {
    fn default() -> Self {
        Self {
            excluded: DEFAULT_EXCLUDED_RECORD_TYPES
                .iter()
                .map(|name| RecordType((*name).to_owned()))
                .collect(),
            fallback: ScopeFallback::AllowAll,
        }
    }
}

/// Principal as seen by the scope: its id plus its precomputed descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSubject {
    id: UserId,
    descendant_ids: Option<BTreeSet<UserId>>,
}

impl ScopeSubject {
    /// Creates a subject whose descendants were resolved.
    #[must_use]
    pub fn with_descendants(id: UserId, descendant_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            id,
            descendant_ids: Some(descendant_ids.into_iter().collect()),
        }
    }

    /// Creates a subject whose descendants cannot be resolved.
    #[must_use]
    pub fn without_hierarchy(id: UserId) -> Self {
        Self {
            id,
            descendant_ids: None,
        }
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the descendant ids, `None` when resolution was unavailable.
    #[must_use]
    pub fn descendant_ids(&self) -> Option<&BTreeSet<UserId>> {
        self.descendant_ids.as_ref()
    }
}

/// Row predicate a scoped read must apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "creators")]
pub enum RowFilter {
    /// No restriction.
    Unrestricted,
    /// Only rows whose `created_by` is in the set.
    CreatedByIn(BTreeSet<UserId>),
    /// No rows at all.
    DenyAll,
}

impl RowFilter {
    /// Evaluates the filter against a row's `created_by` value.
    #[must_use]
    pub fn allows(&self, created_by: Option<UserId>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::CreatedByIn(creators) => {
                created_by.is_some_and(|creator| creators.contains(&creator))
            }
            Self::DenyAll => false,
        }
    }

    /// Returns a deterministic fragment for cache keys.
    #[must_use]
    pub fn cache_fragment(&self) -> String {
        match self {
            Self::Unrestricted => "all".to_owned(),
            Self::DenyAll => "none".to_owned(),
            Self::CreatedByIn(creators) => {
                let ids: Vec<String> = creators.iter().map(ToString::to_string).collect();
                format!("created_by={}", ids.join(","))
            }
        }
    }
}

/// Why the scope produced its filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeReason {
    /// Record type is in the exclusion list.
    Excluded,
    /// No authenticated principal.
    Anonymous,
    /// Principal descendants could not be resolved.
    HierarchyUnavailable,
    /// Restricted to the principal and its descendants.
    Hierarchy,
}

impl ScopeReason {
    /// Returns a stable label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excluded => "excluded",
            Self::Anonymous => "anonymous",
            Self::HierarchyUnavailable => "hierarchy_unavailable",
            Self::Hierarchy => "hierarchy",
        }
    }
}

/// Filter together with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeResolution {
    /// Filter every read must apply.
    pub filter: RowFilter,
    /// Branch that produced the filter.
    pub reason: ScopeReason,
}

impl ScopeResolution {
    /// Returns whether the fallback left the query unrestricted.
    #[must_use]
    pub fn failed_open(&self) -> bool {
        matches!(
            self.reason,
            ScopeReason::Anonymous | ScopeReason::HierarchyUnavailable
        ) && self.filter == RowFilter::Unrestricted
    }
}

/// Builds the row filter for one read of `record_type` by `subject`.
#[must_use]
pub fn hierarchy_filter(
    policy: &HierarchyScopePolicy,
    subject: Option<&ScopeSubject>,
    record_type: &RecordType,
) -> ScopeResolution {
    if policy.is_excluded(record_type) {
        return ScopeResolution {
            filter: RowFilter::Unrestricted,
            reason: ScopeReason::Excluded,
        };
    }

    let fallback = match policy.fallback() {
        ScopeFallback::AllowAll => RowFilter::Unrestricted,
        ScopeFallback::DenyAll => RowFilter::DenyAll,
    };

    let Some(subject) = subject else {
        return ScopeResolution {
            filter: fallback,
            reason: ScopeReason::Anonymous,
        };
    };

    let Some(descendants) = subject.descendant_ids() else {
        return ScopeResolution {
            filter: fallback,
            reason: ScopeReason::HierarchyUnavailable,
        };
    };

    let mut creators = descendants.clone();
    creators.insert(subject.id());

    ScopeResolution {
        filter: RowFilter::CreatedByIn(creators),
        reason: ScopeReason::Hierarchy,
    }
}
