//! Provisioning directives and their dependency keys.
//!
//! A directive is a single idempotent call the provisioning layer must make.
//! Planning code only produces directives; nothing is mutated until a
//! directive set is handed to a [`ProvisioningClient`](crate::ProvisioningClient).

use serde::Serialize;
use std::fmt;
use transit_types::{AttachmentId, GroupRef, IpPrefix, LinkId, TableId};

/// Deterministic identifier of a directive.
///
/// Identifiers double as idempotency keys: submitting two directives with the
/// same id is the same as submitting one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DirectiveId(String);

impl DirectiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DirectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something that must exist before a directive may be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum DependencyKey {
    /// The forwarding table of a routing group has been created.
    Table(GroupRef),
    /// The attachment has been bound to its own group's table.
    Attachment(AttachmentId),
    /// The peering link has been accepted by both sides.
    PeeringAccepted(LinkId),
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKey::Table(group) => write!(f, "table:{}", group),
            DependencyKey::Attachment(id) => write!(f, "attachment:{}", id),
            DependencyKey::PeeringAccepted(link) => write!(f, "peering:{}", link),
        }
    }
}

/// The provisioning call a directive stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateTable {
        group: GroupRef,
    },
    Associate {
        attachment: AttachmentId,
        group: GroupRef,
    },
    /// Make `attachment`'s routes visible in `table`.
    Propagate {
        attachment: AttachmentId,
        source: GroupRef,
        table: GroupRef,
    },
    CreatePeering {
        link: LinkId,
        local_region: String,
        remote_region: String,
    },
    StaticRoute {
        table_id: TableId,
        group: GroupRef,
        cidr: IpPrefix,
        via: AttachmentId,
        link: LinkId,
    },
    /// Withdraw whatever the target directive created.
    Tombstone {
        target: DirectiveId,
    },
}

/// A single unit of provisioning work with explicit ordering constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub id: DirectiveId,
    #[serde(flatten)]
    pub action: Action,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependencyKey>,
}

impl Directive {
    pub fn new(id: DirectiveId, action: Action) -> Self {
        Self {
            id,
            action,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, key: DependencyKey) -> Self {
        if !self.depends_on.contains(&key) {
            self.depends_on.push(key);
        }
        self
    }

    /// Returns the dependency key this directive satisfies once applied.
    pub fn provides(&self) -> Option<DependencyKey> {
        match &self.action {
            Action::CreateTable { group } => Some(DependencyKey::Table(group.clone())),
            Action::Associate { attachment, .. } => {
                Some(DependencyKey::Attachment(attachment.clone()))
            }
            Action::CreatePeering { link, .. } => Some(DependencyKey::PeeringAccepted(link.clone())),
            Action::Propagate { .. } | Action::StaticRoute { .. } | Action::Tombstone { .. } => {
                None
            }
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.action, Action::Tombstone { .. })
    }
}
