//! Opaque reference types.

use serde::{Deserialize, Serialize};

macro_rules! reference_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

reference_id!(
    /// Identifier of a persisted identity, allocated by the store.
    IdentityId
);

reference_id!(
    /// Reference to a role owned by an external role provider.
    RoleId
);

reference_id!(
    /// Reference to an order owned by an external order provider.
    OrderId
);
