//! Error types for routing policy and planning operations.
//!
//! Policy validation errors are deterministic and caller-fixable. They are
//! raised before any state is mutated, so a model that rejected one input
//! stays usable for unrelated inputs.

use std::io;
use std::path::Path;
use thiserror::Error;
use transit_types::ParseError;

/// Result type alias for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors that can occur while building or planning a routing domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// A policy tried to declare the reserved hub group.
    #[error("Group name '{name}' is reserved")]
    ReservedName {
        /// The rejected name.
        name: String,
    },

    /// A group was declared twice.
    #[error("Group '{name}' is already declared")]
    DuplicateGroup {
        /// The duplicate name.
        name: String,
    },

    /// A group was referenced but never declared.
    #[error("Group '{name}' is not declared")]
    UnknownGroup {
        /// The unknown name.
        name: String,
    },

    /// An allow-list names a group that is still undeclared.
    #[error("Group '{group}' allows undeclared group '{missing}'")]
    DanglingAllowList {
        /// The group whose allow-list holds the reference.
        group: String,
        /// The undeclared group.
        missing: String,
    },

    /// The attachment is already bound to a group.
    #[error("Attachment '{id}' is already attached")]
    DuplicateAttachment {
        /// The attachment identifier.
        id: String,
    },

    /// The attachment is not bound to any group.
    #[error("Attachment '{id}' is not attached")]
    UnknownAttachment {
        /// The attachment identifier.
        id: String,
    },

    /// A domain with the same identifier already exists in the arena.
    #[error("Domain '{id}' already exists")]
    DuplicateDomain {
        /// The domain identifier.
        id: String,
    },

    /// The two sides of a peering link cannot be peered.
    #[error("Invalid peering link {link}: {message}")]
    InvalidPeering {
        /// The link identifier.
        link: String,
        /// Error message.
        message: String,
    },

    /// A name, identifier or prefix failed validation.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A configuration document could not be parsed.
    #[error("Invalid configuration in {path}: {message}")]
    Config {
        /// The document path.
        path: String,
        /// Error message.
        message: String,
    },

    /// A configuration document could not be read.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// The document path.
        path: String,
        /// Error message.
        message: String,
    },
}

impl RoutingError {
    /// Creates a reserved name error.
    pub fn reserved_name(name: impl Into<String>) -> Self {
        Self::ReservedName { name: name.into() }
    }

    /// Creates a duplicate group error.
    pub fn duplicate_group(name: impl Into<String>) -> Self {
        Self::DuplicateGroup { name: name.into() }
    }

    /// Creates an unknown group error.
    pub fn unknown_group(name: impl Into<String>) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    /// Creates a dangling allow-list error.
    pub fn dangling_allow_list(group: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::DanglingAllowList {
            group: group.into(),
            missing: missing.into(),
        }
    }

    /// Creates an invalid peering error.
    pub fn invalid_peering(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPeering {
            link: link.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error for a document.
    pub fn config(path: &Path, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Creates a read error for a document.
    pub fn io(path: &Path, source: &io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: source.to_string(),
        }
    }

    /// Returns true for policy validation errors.
    ///
    /// These are caller-fixable and must never be retried automatically.
    pub fn is_policy_error(&self) -> bool {
        matches!(
            self,
            RoutingError::ReservedName { .. }
                | RoutingError::DuplicateGroup { .. }
                | RoutingError::UnknownGroup { .. }
                | RoutingError::DanglingAllowList { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoutingError::dangling_allow_list("app", "ghost");
        assert_eq!(err.to_string(), "Group 'app' allows undeclared group 'ghost'");

        let err = RoutingError::reserved_name("hub");
        assert_eq!(err.to_string(), "Group name 'hub' is reserved");
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let err: RoutingError = ParseError::InvalidGroupName("a b".into()).into();
        assert_eq!(err.to_string(), "invalid group name: \"a b\"");
    }

    #[test]
    fn test_is_policy_error() {
        assert!(RoutingError::unknown_group("ghost").is_policy_error());
        assert!(RoutingError::duplicate_group("app").is_policy_error());
        assert!(!RoutingError::config(Path::new("policy.yaml"), "bad").is_policy_error());
        assert!(!RoutingError::DuplicateAttachment { id: "vpc-1".into() }.is_policy_error());
    }
}
