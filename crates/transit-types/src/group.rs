//! Routing group names.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the reserved, universally reachable routing group.
pub const HUB_GROUP_NAME: &str = "hub";

/// A routing group name that may appear in policy.
///
/// Names are case-sensitive and non-empty, made of ASCII letters, digits and
/// `_` only. Directive ids join group names with `-`, so the separator can
/// never appear inside a name. The reserved name `hub` is rejected at
/// construction, so a `GroupName` can never refer to the hub.
///
/// # Examples
///
/// ```
/// use transit_types::GroupName;
///
/// let app = GroupName::new("app").unwrap();
/// assert_eq!(app.as_str(), "app");
///
/// assert!(GroupName::new("hub").is_err());
/// assert!(GroupName::new("").is_err());
/// assert!(GroupName::new("app-0").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

impl GroupName {
    /// Creates a validated group name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ReservedGroupName`] for `hub` and
    /// [`ParseError::InvalidGroupName`] for empty names or names containing
    /// anything but ASCII alphanumerics and `_`.
    pub fn new(name: impl Into<String>) -> Result<Self, ParseError> {
        let name = name.into();
        if name == HUB_GROUP_NAME {
            return Err(ParseError::ReservedGroupName(name));
        }
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(ParseError::InvalidGroupName(name));
        }
        Ok(GroupName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupName::new(s)
    }
}

impl TryFrom<String> for GroupName {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        GroupName::new(value)
    }
}

impl From<GroupName> for String {
    fn from(name: GroupName) -> Self {
        name.0
    }
}

/// Reference to any routing group of a domain, including the hub.
///
/// The hub sorts before every declared group, which keeps hub-first
/// ordering in every ordered collection keyed by `GroupRef`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GroupRef {
    Hub,
    Named(GroupName),
}

impl GroupRef {
    /// Parses a group reference, mapping `hub` to [`GroupRef::Hub`].
    pub fn parse(name: &str) -> Result<Self, ParseError> {
        if name == HUB_GROUP_NAME {
            Ok(GroupRef::Hub)
        } else {
            GroupName::new(name).map(GroupRef::Named)
        }
    }

    pub const fn is_hub(&self) -> bool {
        matches!(self, GroupRef::Hub)
    }

    /// Returns the declared name, or `None` for the hub.
    pub const fn as_named(&self) -> Option<&GroupName> {
        match self {
            GroupRef::Hub => None,
            GroupRef::Named(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupRef::Hub => HUB_GROUP_NAME,
            GroupRef::Named(name) => name.as_str(),
        }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupRef::parse(s)
    }
}

impl TryFrom<String> for GroupRef {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        GroupRef::parse(&value)
    }
}

impl From<GroupRef> for String {
    fn from(group: GroupRef) -> Self {
        group.as_str().to_string()
    }
}

impl From<GroupName> for GroupRef {
    fn from(name: GroupName) -> Self {
        GroupRef::Named(name)
    }
}
