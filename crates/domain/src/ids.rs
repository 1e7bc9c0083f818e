use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rowguard_core::AppError;
use serde::{Deserialize, Serialize};

/// Defines a strongly typed wrapper around a storage-assigned `BIGSERIAL` key.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw storage key.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw storage key.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse::<i64>().map(Self).map_err(|error| {
                    AppError::Validation(format!(
                        "invalid {} '{value}': {error}",
                        $label
                    ))
                })
            }
        }
    };
}

define_id!(
    /// Principal (user) identifier.
    UserId, "user id"
);
define_id!(
    /// Role identifier.
    RoleId, "role id"
);
define_id!(
    /// Permission identifier.
    PermissionId, "permission id"
);
define_id!(
    /// Permission group identifier.
    PermissionGroupId, "permission group id"
);
define_id!(
    /// Scoped business record identifier.
    RecordId, "record id"
);
