//! Type definitions for tgwmgrd

use std::collections::BTreeSet;

use serde::Serialize;
use transit_orch_common::{Action, Directive, DirectiveId};
use transit_policy::RoutingError;
use transit_types::{AttachmentId, GroupName, GroupRef, IpPrefix};

use crate::tables::*;

/// Whether routing groups are isolated from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMode {
    /// Groups only reach themselves, the hub and allow-listed peers.
    Isolated,
    /// Every attachment shares the hub table; groups are not consulted.
    Flat,
}

impl DomainMode {
    pub fn from_isolation(isolation: bool) -> Self {
        if isolation {
            DomainMode::Isolated
        } else {
            DomainMode::Flat
        }
    }
}

/// Seed of the reserved hub group, supplied when a domain is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSeed {
    pub description: String,
}

impl HubSeed {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl Default for HubSeed {
    fn default() -> Self {
        Self::new("hub")
    }
}

/// A routing group and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingGroup {
    pub name: GroupRef,
    pub description: String,
    /// Peers named by this group's own policy (never the hub)
    pub allow_list: Vec<GroupName>,
    pub attachments: BTreeSet<AttachmentId>,
    /// Next attachment ordinal; ordinals are never reused
    #[serde(skip)]
    pub(crate) next_ordinal: u32,
}

impl RoutingGroup {
    pub fn new(name: GroupRef, description: impl Into<String>, allow_list: Vec<GroupName>) -> Self {
        Self {
            name,
            description: description.into(),
            allow_list,
            attachments: BTreeSet::new(),
            next_ordinal: 0,
        }
    }

    pub fn is_hub(&self) -> bool {
        self.name.is_hub()
    }

    pub fn allows(&self, other: &GroupName) -> bool {
        self.allow_list.contains(other)
    }
}

/// An attachment bound to a routing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    pub group: GroupRef,
    /// Position of this attachment within its group, used in directive ids
    pub ordinal: u32,
    pub owned_prefixes: Vec<IpPrefix>,
}

impl AttachmentRecord {
    /// Id of the directive that binds this attachment to its group's table.
    pub fn association_id(&self) -> DirectiveId {
        DirectiveId::new(format!(
            "{}-{}-{}",
            self.group, self.ordinal, ASSOCIATION_SUFFIX
        ))
    }

    /// Id of the directive that propagates this attachment into `table`.
    pub fn propagation_id(&self, table: &GroupRef) -> DirectiveId {
        DirectiveId::new(format!(
            "{}-{}-{}-{}",
            self.group, self.ordinal, PROPAGATION_INFIX, table
        ))
    }
}

/// A directed visibility relationship: `attachment`'s routes appear in `table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PropagationEdge {
    pub attachment: AttachmentId,
    pub table: GroupRef,
    /// Group of `attachment`
    pub source: GroupRef,
}

impl PropagationEdge {
    pub fn new(attachment: AttachmentId, source: GroupRef, table: GroupRef) -> Self {
        Self {
            attachment,
            table,
            source,
        }
    }

    /// Extracts the edge a propagation directive stands for.
    pub fn from_directive(directive: &Directive) -> Option<Self> {
        match &directive.action {
            Action::Propagate {
                attachment,
                source,
                table,
            } => Some(Self::new(attachment.clone(), source.clone(), table.clone())),
            _ => None,
        }
    }

    pub fn is_self(&self) -> bool {
        self.source == self.table
    }
}

/// Directive id of a group's table.
pub fn table_directive_id(group: &GroupRef) -> DirectiveId {
    DirectiveId::new(format!("{}-{}", group, TABLE_SUFFIX))
}

/// Directive id of the tombstone that withdraws `target`.
pub fn tombstone_id(target: &DirectiveId) -> DirectiveId {
    DirectiveId::new(format!("{}{}{}", TOMBSTONE_PREFIX, KIND_SEPARATOR, target))
}

/// Directives required for one newly attached endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentPlan {
    pub attachment: Option<AttachmentId>,
    /// Association first, then propagation edges in emission order
    pub directives: Vec<Directive>,
    /// Allow-list references that could not be resolved; only the edges
    /// depending on them are missing from `directives`
    #[serde(serialize_with = "serialize_errors")]
    pub dangling: Vec<RoutingError>,
}

fn serialize_errors<S>(errors: &[RoutingError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl AttachmentPlan {
    pub fn new(attachment: AttachmentId) -> Self {
        Self {
            attachment: Some(attachment),
            ..Default::default()
        }
    }

    /// Returns the propagation edges in emission order.
    pub fn edges(&self) -> Vec<PropagationEdge> {
        self.directives
            .iter()
            .filter_map(PropagationEdge::from_directive)
            .collect()
    }

    pub fn is_partial(&self) -> bool {
        !self.dangling.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
