//! Strongly-typed identifiers for catalogue and quotation entities
//!
//! Each identifier is a newtype around a UUID and displays with a short
//! prefix (`INS-...`, `PRP-...`) so log lines are unambiguous.

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

            /// Derives a stable identifier from a parent UUID and a discriminator
            ///
            /// The same inputs always yield the same identifier (UUID v5).
            pub fn derived(parent: &Uuid, discriminator: &[u8]) -> Self {
                Self(Uuid::new_v5(parent, discriminator))
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

// Catalogue identifiers
define_id!(InsurerId, "INS");
define_id!(MerchandiseTypeId, "MER");
define_id!(RuleId, "RUL");

// Quotation identifiers
define_id!(QuoteRequestId, "QRQ");
define_id!(QuoteResultId, "QRS");
define_id!(ProposalId, "PRP");

// Generic identifiers
define_id!(UserId, "USR");
define_id!(JobId, "JOB");
define_id!(AuditEventId, "AUD");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_request_id_display() {
        let id = QuoteRequestId::new();
        let display = id.to_string();
        assert!(display.starts_with("QRQ-"));
    }

    #[test]
    fn test_id_parsing() {
        let original = QuoteRequestId::new();
        let parsed: QuoteRequestId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_derived_id_is_stable() {
        let parent = Uuid::new_v4();
        let a = QuoteResultId::derived(&parent, b"insurer-a");
        let b = QuoteResultId::derived(&parent, b"insurer-a");
        let c = QuoteResultId::derived(&parent, b"insurer-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let request_id = QuoteRequestId::from(uuid);
        let back: Uuid = request_id.into();
        assert_eq!(uuid, back);
    }
}
