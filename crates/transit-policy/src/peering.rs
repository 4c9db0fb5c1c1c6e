//! Peering link documents.
//!
//! ```yaml
//! linkId: pcx-east-west
//! direction: both
//! participatingGroups: [hub, app]
//! local:
//!   domain: east
//!   region: us-east-1
//!   peeringAttachment: tgw-attach-east
//!   tables: { hub: rtb-e-hub, app: rtb-e-app }
//!   prefixes: [10.1.0.0/16]
//! remote:
//!   domain: west
//!   region: us-west-2
//!   peeringAttachment: tgw-attach-west
//!   tables: { hub: rtb-w-hub, app: rtb-w-app }
//!   prefixes: [10.2.0.0/16]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use transit_types::{AttachmentId, DomainId, GroupRef, IpPrefix, LinkId, TableId};

use crate::error::RoutingResult;
use crate::format::load_document;

/// Which side's tables receive static routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeeringDirection {
    /// Routes in both domains.
    #[default]
    Both,
    /// Only the local domain's tables learn the remote prefixes.
    IntoLocal,
    /// Only the remote domain's tables learn the local prefixes.
    IntoRemote,
}

impl PeeringDirection {
    pub fn routes_local(self) -> bool {
        matches!(self, PeeringDirection::Both | PeeringDirection::IntoLocal)
    }

    pub fn routes_remote(self) -> bool {
        matches!(self, PeeringDirection::Both | PeeringDirection::IntoRemote)
    }
}

/// One side of a peering link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeeringSide {
    pub domain: DomainId,
    pub region: String,
    /// The attachment static routes point at.
    pub peering_attachment: AttachmentId,
    /// Per-group forwarding table ids of this domain.
    pub tables: BTreeMap<GroupRef, TableId>,
    #[serde(default)]
    pub prefixes: Vec<IpPrefix>,
}

/// A peering link between two domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeeringConfig {
    pub link_id: LinkId,
    #[serde(default)]
    pub direction: PeeringDirection,
    /// Groups taking part on both sides; every group when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participating_groups: Option<Vec<GroupRef>>,
    pub local: PeeringSide,
    pub remote: PeeringSide,
}

impl PeeringConfig {
    pub fn load(path: impl AsRef<Path>) -> RoutingResult<Self> {
        load_document(path)
    }
}
