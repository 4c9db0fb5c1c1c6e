//! Common types for the transit routing control plane.
//!
//! This crate provides validated representations of the primitives shared by
//! the planner, the peering synthesizer and the provisioning boundary:
//!
//! - [`GroupName`]: a declarable routing group name (never `hub`)
//! - [`GroupRef`]: either the reserved hub or a declared group
//! - [`AttachmentId`], [`TableId`], [`LinkId`], [`DomainId`], [`ResourceId`]:
//!   opaque identifiers
//! - [`IpPrefix`]: canonical CIDR prefixes

mod group;
mod ids;
mod ip;

pub use group::{GroupName, GroupRef, HUB_GROUP_NAME};
pub use ids::{AttachmentId, DomainId, LinkId, ResourceId, TableId};
pub use ip::IpPrefix;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("group name '{0}' is reserved")]
    ReservedGroupName(String),

    #[error("invalid group name: {0:?}")]
    InvalidGroupName(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("prefix {0} has host bits set")]
    NonCanonicalPrefix(String),
}
