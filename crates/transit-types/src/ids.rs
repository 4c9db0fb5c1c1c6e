//! Opaque identifiers exchanged with the provisioning layer.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting empty or whitespace-bearing values.
            pub fn new(id: impl Into<String>) -> Result<Self, ParseError> {
                let id = id.into();
                if id.is_empty() || id.chars().any(char::is_whitespace) {
                    return Err(ParseError::InvalidIdentifier(id));
                }
                Ok($name(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

opaque_id!(
    /// Identifier of a network endpoint attached to the transit network.
    AttachmentId
);

opaque_id!(
    /// Identifier of a per-group forwarding table as reported by the provisioning layer.
    TableId
);

opaque_id!(
    /// Identifier of a cross-region peering link.
    LinkId
);

opaque_id!(
    /// Identifier of an independent routing domain (one transit network).
    DomainId
);

opaque_id!(
    /// Stable identifier returned by the provisioning layer for any created object.
    ResourceId
);

impl From<TableId> for ResourceId {
    fn from(id: TableId) -> Self {
        ResourceId(id.0)
    }
}

impl From<ResourceId> for TableId {
    fn from(id: ResourceId) -> Self {
        TableId(id.0)
    }
}
