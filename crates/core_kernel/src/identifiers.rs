//! Strongly-typed identifiers
//!
//! Ledger rows and the legacy records they reference are all keyed by UUIDs.
//! Newtypes keep an account id from being passed where a batch id is expected;
//! a batch stores its source record only as a bare `Uuid` reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Ledger identifiers
define_id!(AccountId, "ACC");
define_id!(BatchId, "JVB");
define_id!(EntryId, "LE");

// Legacy book identifiers (records owned by the surrounding shop application)
define_id!(PartyId, "PTY");
define_id!(OrderId, "ORD");
define_id!(PaymentId, "PAY");
define_id!(PurchaseBillId, "PB");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_display() {
        let id = BatchId::new();
        assert!(id.to_string().starts_with("JVB-"));
    }

    #[test]
    fn test_id_parsing_accepts_prefixed_and_bare() {
        let original = AccountId::new();
        let parsed: AccountId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: AccountId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_reference_uuid_round_trip() {
        let order = OrderId::new();
        let reference: Uuid = order.into();
        assert_eq!(OrderId::from_uuid(reference), order);
    }
}
