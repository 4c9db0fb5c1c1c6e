//! Peering route synthesis
//!
//! Peering links do not exchange routes dynamically, so cross-region
//! reachability is reproduced with static routes: every participating table
//! on one side gets a route per prefix of the other side, via the local
//! peering attachment.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use transit_orch_common::{Action, DependencyKey, Directive, DirectiveId};
use transit_policy::{PeeringConfig, PeeringDirection, PeeringSide, RoutingError, RoutingResult};
use transit_types::{AttachmentId, DomainId, GroupRef, IpPrefix, LinkId, TableId};

use crate::tables::*;

/// Per-group forwarding tables of one domain, as seen by a peering link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainTables {
    pub domain: DomainId,
    pub region: String,
    /// Attachment of the peering link in this domain
    pub peering_attachment: AttachmentId,
    pub tables: BTreeMap<GroupRef, TableId>,
}

impl DomainTables {
    pub fn new(
        domain: DomainId,
        region: impl Into<String>,
        peering_attachment: AttachmentId,
        tables: BTreeMap<GroupRef, TableId>,
    ) -> Self {
        Self {
            domain,
            region: region.into(),
            peering_attachment,
            tables,
        }
    }
}

impl From<&PeeringSide> for DomainTables {
    fn from(side: &PeeringSide) -> Self {
        Self::new(
            side.domain.clone(),
            side.region.as_str(),
            side.peering_attachment.clone(),
            side.tables.clone(),
        )
    }
}

/// A cross-region link between two domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringLink {
    pub id: LinkId,
    pub local: DomainTables,
    pub remote: DomainTables,
    /// Participating groups; every group of each side when `None`
    pub participating: Option<Vec<GroupRef>>,
    pub direction: PeeringDirection,
}

impl PeeringLink {
    /// Create a link between two domains in different regions
    pub fn new(id: LinkId, local: DomainTables, remote: DomainTables) -> RoutingResult<Self> {
        if local.domain == remote.domain {
            return Err(RoutingError::invalid_peering(
                id.as_str(),
                format!("domain {} cannot peer with itself", local.domain),
            ));
        }
        if local.region == remote.region {
            return Err(RoutingError::invalid_peering(
                id.as_str(),
                format!("both domains are in region {}", local.region),
            ));
        }
        Ok(Self {
            id,
            local,
            remote,
            participating: None,
            direction: PeeringDirection::Both,
        })
    }

    pub fn from_config(config: &PeeringConfig) -> RoutingResult<Self> {
        let link = Self::new(
            config.link_id.clone(),
            DomainTables::from(&config.local),
            DomainTables::from(&config.remote),
        )?
        .with_direction(config.direction);

        Ok(match &config.participating_groups {
            Some(groups) => link.with_participating(groups.iter().cloned()),
            None => link,
        })
    }

    pub fn with_participating(mut self, groups: impl IntoIterator<Item = GroupRef>) -> Self {
        let mut participating: Vec<GroupRef> = Vec::new();
        for group in groups {
            if !participating.contains(&group) {
                participating.push(group);
            }
        }
        self.participating = Some(participating);
        self
    }

    pub fn with_direction(mut self, direction: PeeringDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Directive creating the link itself; static routes wait on it
    pub fn directive(&self) -> Directive {
        Directive::new(
            DirectiveId::new(format!("{}{}{}", PEERING_PREFIX, KIND_SEPARATOR, self.id)),
            Action::CreatePeering {
                link: self.id.clone(),
                local_region: self.local.region.clone(),
                remote_region: self.remote.region.clone(),
            },
        )
    }
}

/// Directives for both sides of a peering link.
///
/// Each side fails independently: an unknown participating group aborts only
/// that side's routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringPlan {
    pub link: Directive,
    /// Routes into the local domain's tables, towards remote prefixes
    pub local: RoutingResult<Vec<Directive>>,
    /// Routes into the remote domain's tables, towards local prefixes
    pub remote: RoutingResult<Vec<Directive>>,
}

impl PeeringPlan {
    /// Every directive that can be submitted, link first
    pub fn directives(&self) -> Vec<Directive> {
        let mut directives = vec![self.link.clone()];
        for side in [&self.local, &self.remote] {
            if let Ok(routes) = side {
                directives.extend(routes.iter().cloned());
            }
        }
        directives
    }

    pub fn errors(&self) -> Vec<&RoutingError> {
        [&self.local, &self.remote]
            .into_iter()
            .filter_map(|side| side.as_ref().err())
            .collect()
    }
}

/// Deterministic id of a static route directive.
///
/// The table id is length-prefixed in the hash input; prefixes never contain
/// `|`, so distinct (table, prefix, link) triples never share an input.
pub fn route_directive_id(table: &TableId, cidr: &IpPrefix, link: &LinkId) -> DirectiveId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}|{}|{}", table.as_str().len(), table, cidr, link).as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    DirectiveId::new(format!(
        "{}{}{}",
        ROUTE_PREFIX,
        KIND_SEPARATOR,
        &hash[..ROUTE_HASH_LEN]
    ))
}

/// Synthesizes static routes for peering links.
#[derive(Debug, Default)]
pub struct PeeringRouteSynthesizer;

impl PeeringRouteSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Compute the static routes of both sides of a link.
    pub fn synthesize(
        &self,
        link: &PeeringLink,
        local_prefixes: &[IpPrefix],
        remote_prefixes: &[IpPrefix],
    ) -> PeeringPlan {
        let local = if link.direction.routes_local() {
            self.side_routes(link, &link.local, remote_prefixes)
        } else {
            debug!("Link {} does not route into {}", link.id, link.local.domain);
            Ok(Vec::new())
        };
        let remote = if link.direction.routes_remote() {
            self.side_routes(link, &link.remote, local_prefixes)
        } else {
            debug!("Link {} does not route into {}", link.id, link.remote.domain);
            Ok(Vec::new())
        };

        info!(
            "Synthesized link {} ({} -> {}): {} local routes, {} remote routes",
            link.id,
            link.local.domain,
            link.remote.domain,
            local.as_ref().map_or(0, Vec::len),
            remote.as_ref().map_or(0, Vec::len)
        );

        PeeringPlan {
            link: link.directive(),
            local,
            remote,
        }
    }

    /// Routes into `side`'s participating tables towards `prefixes`
    fn side_routes(
        &self,
        link: &PeeringLink,
        side: &DomainTables,
        prefixes: &[IpPrefix],
    ) -> RoutingResult<Vec<Directive>> {
        let groups: Vec<GroupRef> = match &link.participating {
            Some(groups) => groups.clone(),
            None => side.tables.keys().cloned().collect(),
        };

        let mut targets: Vec<(GroupRef, TableId)> = Vec::with_capacity(groups.len());
        for group in groups {
            let table = side
                .tables
                .get(&group)
                .cloned()
                .ok_or_else(|| RoutingError::unknown_group(group.as_str()))?;
            targets.push((group, table));
        }

        if prefixes.is_empty() {
            warn!(
                "Link {}: no prefixes to route into {}; peering is inert in this direction",
                link.id, side.domain
            );
            return Ok(Vec::new());
        }

        let mut seen = BTreeSet::new();
        let prefixes: Vec<IpPrefix> = prefixes.iter().copied().filter(|p| seen.insert(*p)).collect();

        let mut routes = Vec::with_capacity(targets.len() * prefixes.len());
        for (group, table) in &targets {
            for cidr in &prefixes {
                routes.push(
                    Directive::new(
                        route_directive_id(table, cidr, &link.id),
                        Action::StaticRoute {
                            table_id: table.clone(),
                            group: group.clone(),
                            cidr: *cidr,
                            via: side.peering_attachment.clone(),
                            link: link.id.clone(),
                        },
                    )
                    .depends_on(DependencyKey::PeeringAccepted(link.id.clone())),
                );
            }
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prefix(s: &str) -> IpPrefix {
        s.parse().unwrap()
    }

    fn side(domain: &str, region: &str, groups: &[&str]) -> DomainTables {
        DomainTables::new(
            DomainId::new(domain).unwrap(),
            region,
            AttachmentId::new(format!("tgw-attach-{}", domain)).unwrap(),
            groups
                .iter()
                .map(|g| {
                    (
                        GroupRef::parse(g).unwrap(),
                        TableId::new(format!("rtb-{}-{}", domain, g)).unwrap(),
                    )
                })
                .collect(),
        )
    }

    fn link() -> PeeringLink {
        PeeringLink::new(
            LinkId::new("pcx-1").unwrap(),
            side("east", "us-east-1", &["hub", "app", "db"]),
            side("west", "us-west-2", &["hub", "app"]),
        )
        .unwrap()
    }

    fn cidrs(routes: &[Directive]) -> Vec<String> {
        routes
            .iter()
            .map(|d| match &d.action {
                Action::StaticRoute { table_id, cidr, .. } => format!("{} {}", table_id, cidr),
                other => panic!("unexpected action {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_two_groups_each_side() {
        let link = link().with_participating([GroupRef::Hub, GroupRef::parse("app").unwrap()]);
        let plan = PeeringRouteSynthesizer::new().synthesize(
            &link,
            &[prefix("10.1.0.0/16")],
            &[prefix("10.2.0.0/16")],
        );

        assert_eq!(
            cidrs(plan.local.as_ref().unwrap()),
            vec!["rtb-east-hub 10.2.0.0/16", "rtb-east-app 10.2.0.0/16"]
        );
        assert_eq!(
            cidrs(plan.remote.as_ref().unwrap()),
            vec!["rtb-west-hub 10.1.0.0/16", "rtb-west-app 10.1.0.0/16"]
        );
        assert_eq!(plan.directives().len(), 5);
    }

    #[test]
    fn test_default_participation_is_every_group() {
        let plan = PeeringRouteSynthesizer::new().synthesize(
            &link(),
            &[prefix("10.1.0.0/16")],
            &[prefix("10.2.0.0/16"), prefix("10.3.0.0/16")],
        );
        assert_eq!(plan.local.unwrap().len(), 6);
        assert_eq!(plan.remote.unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_group_aborts_one_side() {
        let link = link().with_participating([GroupRef::parse("db").unwrap()]);
        let plan = PeeringRouteSynthesizer::new().synthesize(
            &link,
            &[prefix("10.1.0.0/16")],
            &[prefix("10.2.0.0/16")],
        );

        assert_eq!(plan.local.as_ref().unwrap().len(), 1);
        assert_eq!(plan.remote, Err(RoutingError::unknown_group("db")));
        assert_eq!(plan.errors().len(), 1);
    }

    #[test]
    fn test_empty_prefixes_are_inert() {
        let plan = PeeringRouteSynthesizer::new().synthesize(&link(), &[], &[prefix("10.2.0.0/16")]);
        assert_eq!(plan.remote, Ok(vec![]));
        assert_eq!(plan.local.unwrap().len(), 3);
    }

    #[test]
    fn test_route_ids_are_deterministic() {
        let synthesizer = PeeringRouteSynthesizer::new();
        let first = synthesizer.synthesize(&link(), &[prefix("10.1.0.0/16")], &[prefix("10.2.0.0/16")]);
        let second = synthesizer.synthesize(&link(), &[prefix("10.1.0.0/16")], &[prefix("10.2.0.0/16")]);
        assert_eq!(first, second);

        let id = route_directive_id(
            &TableId::new("rtb-east-hub").unwrap(),
            &prefix("10.2.0.0/16"),
            &LinkId::new("pcx-1").unwrap(),
        );
        assert!(id.as_str().starts_with("route:"));
        assert_eq!(id.as_str().len(), "route:".len() + ROUTE_HASH_LEN);
    }

    #[test]
    fn test_route_ids_distinguish_separator_in_components() {
        let cidr = prefix("10.2.0.0/16");
        let first = route_directive_id(
            &TableId::new("rtb|10.2.0.0/16|pcx").unwrap(),
            &cidr,
            &LinkId::new("x").unwrap(),
        );
        let second = route_directive_id(
            &TableId::new("rtb").unwrap(),
            &cidr,
            &LinkId::new("pcx|10.2.0.0/16|x").unwrap(),
        );
        assert_ne!(first, second);
    }

    #[test]
    fn test_link_directive_id_cannot_match_group_ids() {
        let mut link = link();
        link.id = LinkId::new("app-0-propagation").unwrap();
        assert_eq!(link.directive().id.as_str(), "peering:app-0-propagation");
    }

    #[test]
    fn test_routes_wait_for_link() {
        let plan = PeeringRouteSynthesizer::new().synthesize(&link(), &[], &[prefix("10.2.0.0/16")]);
        let link_id = LinkId::new("pcx-1").unwrap();

        assert_eq!(plan.link.provides(), Some(DependencyKey::PeeringAccepted(link_id.clone())));
        for route in plan.local.unwrap() {
            assert_eq!(route.depends_on, vec![DependencyKey::PeeringAccepted(link_id.clone())]);
        }
    }

    #[test]
    fn test_direction_limits_routes() {
        let link = link().with_direction(PeeringDirection::IntoRemote);
        let plan = PeeringRouteSynthesizer::new().synthesize(
            &link,
            &[prefix("10.1.0.0/16")],
            &[prefix("10.2.0.0/16")],
        );
        assert_eq!(plan.local, Ok(vec![]));
        assert_eq!(plan.remote.unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_links() {
        let err = PeeringLink::new(
            LinkId::new("pcx-1").unwrap(),
            side("east", "us-east-1", &["hub"]),
            side("east", "us-west-2", &["hub"]),
        )
        .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidPeering { .. }));

        let err = PeeringLink::new(
            LinkId::new("pcx-1").unwrap(),
            side("east", "us-east-1", &["hub"]),
            side("west", "us-east-1", &["hub"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("us-east-1"));
    }
}
