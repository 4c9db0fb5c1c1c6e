//! Naming constants for tgwmgrd directives and documents
//!
//! Group-derived ids join group names and ordinals with `-`, which group
//! names cannot contain. Every other id is `{kind}:{key}`; `:` never appears
//! in a group-derived id, and the kind prefixes are distinct.

/// Suffix of the directive that creates a group's forwarding table
pub const TABLE_SUFFIX: &str = "table";

/// Suffix of the directive that binds an attachment to its group's table
pub const ASSOCIATION_SUFFIX: &str = "association";

/// Infix of propagation directive ids (`{group}-{n}-propagation-{table}`)
pub const PROPAGATION_INFIX: &str = "propagation";

/// Separator between the kind prefix and the key of non group-derived ids
pub const KIND_SEPARATOR: char = ':';

/// Prefix of directives that withdraw an earlier directive
pub const TOMBSTONE_PREFIX: &str = "tombstone";

/// Prefix of the directive that creates a peering link
pub const PEERING_PREFIX: &str = "peering";

/// Prefix of static route directive ids
pub const ROUTE_PREFIX: &str = "route";

/// Number of hex digits of the route hash kept in a static route id
pub const ROUTE_HASH_LEN: usize = 16;

/// Default document locations
pub mod paths {
    /// Routing policy document
    pub const DEFAULT_POLICY: &str = "/etc/transit/policy.yaml";

    /// Attachment inventory document
    pub const DEFAULT_ATTACHMENTS: &str = "/etc/transit/attachments.yaml";
}
