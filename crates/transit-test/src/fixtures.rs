//! Test fixtures for common transit topologies

use std::collections::BTreeMap;

use transit_policy::{
    AttachmentSpec, GroupPolicy, HubPolicy, PeeringConfig, PeeringDirection, PeeringSide,
    RoutingPolicy,
};
use transit_types::{AttachmentId, DomainId, GroupRef, IpPrefix, LinkId, TableId};

/// Builder for routing policies
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    policy: RoutingPolicy,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable isolation (flat mode)
    pub fn flat(mut self) -> Self {
        self.policy.isolation = false;
        self
    }

    pub fn hub_description(mut self, description: impl Into<String>) -> Self {
        self.policy.hub = HubPolicy {
            description: description.into(),
        };
        self
    }

    /// Add a group with its allow-list
    pub fn group(mut self, name: &str, allowed: &[&str]) -> Self {
        self.policy.groups.insert(
            name.to_string(),
            GroupPolicy {
                allowed_groups: allowed.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    /// Add a tag to an already added group
    pub fn with_tag(mut self, group: &str, key: &str, value: &str) -> Self {
        if let Some(policy) = self.policy.groups.get_mut(group) {
            policy.tags.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn build(self) -> RoutingPolicy {
        self.policy
    }
}

/// Parse a prefix literal
pub fn prefix(s: &str) -> IpPrefix {
    s.parse().unwrap_or_else(|e| panic!("bad prefix fixture {}: {}", s, e))
}

/// Parse an attachment id literal
pub fn attachment_id(s: &str) -> AttachmentId {
    AttachmentId::new(s).unwrap_or_else(|e| panic!("bad attachment fixture {}: {}", s, e))
}

/// Parse a group reference literal
pub fn group(s: &str) -> GroupRef {
    GroupRef::parse(s).unwrap_or_else(|e| panic!("bad group fixture {}: {}", s, e))
}

/// Common policy fixtures
pub mod policy_fixtures {
    use super::*;

    /// Only the implicit hub
    pub fn hub_only() -> RoutingPolicy {
        PolicyBuilder::new().build()
    }

    /// web -> app -> db, each allowing the next tier
    pub fn three_tier() -> RoutingPolicy {
        PolicyBuilder::new()
            .hub_description("shared services")
            .group("web", &["app"])
            .group("app", &["db"])
            .group("db", &[])
            .build()
    }

    /// A group allowing a group the policy never declares
    pub fn dangling() -> RoutingPolicy {
        PolicyBuilder::new().group("app", &["ghost"]).build()
    }

    /// Isolation disabled
    pub fn flat() -> RoutingPolicy {
        PolicyBuilder::new().flat().group("app", &[]).build()
    }
}

/// Common attachment fixtures
pub mod attachment_fixtures {
    use super::*;

    /// An attachment in a declared group
    pub fn spoke(id: &str, group: &str) -> AttachmentSpec {
        AttachmentSpec::new(attachment_id(id), group)
    }

    /// An attachment placed directly in the hub
    pub fn hub(id: &str) -> AttachmentSpec {
        AttachmentSpec::new(attachment_id(id), "hub")
    }

    /// An attachment owning the given prefixes
    pub fn with_prefixes(id: &str, group: &str, prefixes: &[&str]) -> AttachmentSpec {
        spoke(id, group).with_prefixes(prefixes.iter().map(|p| prefix(p)))
    }
}

/// Common peering fixtures
pub mod peering_fixtures {
    use super::*;

    /// One side of a link with a table per group named `rtb-{domain}-{group}`
    pub fn side(domain: &str, region: &str, groups: &[&str], prefixes: &[&str]) -> PeeringSide {
        PeeringSide {
            domain: DomainId::new(domain).unwrap_or_else(|e| panic!("bad domain fixture: {}", e)),
            region: region.to_string(),
            peering_attachment: attachment_id(&format!("tgw-attach-{}", domain)),
            tables: groups
                .iter()
                .map(|g| {
                    let table = TableId::new(format!("rtb-{}-{}", domain, g))
                        .unwrap_or_else(|e| panic!("bad table fixture: {}", e));
                    (group(g), table)
                })
                .collect::<BTreeMap<_, _>>(),
            prefixes: prefixes.iter().map(|p| prefix(p)).collect(),
        }
    }

    /// east (us-east-1, 10.1.0.0/16) peered with west (us-west-2, 10.2.0.0/16)
    pub fn east_west(participating: Option<&[&str]>) -> PeeringConfig {
        PeeringConfig {
            link_id: LinkId::new("pcx-east-west").unwrap_or_else(|e| panic!("{}", e)),
            direction: PeeringDirection::Both,
            participating_groups: participating.map(|groups| groups.iter().map(|g| group(g)).collect()),
            local: side("east", "us-east-1", &["hub", "app"], &["10.1.0.0/16"]),
            remote: side("west", "us-west-2", &["hub", "app"], &["10.2.0.0/16"]),
        }
    }
}

/// Topology change operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyChange {
    /// Attach an endpoint
    Attach(AttachmentSpec),
    /// Detach an endpoint
    Detach(AttachmentId),
}

/// A policy, a sequence of topology changes and the edges expected afterwards
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub policy: RoutingPolicy,
    pub changes: Vec<TopologyChange>,
    /// (attachment, table) pairs that must be planned
    pub expected_edges: Vec<(String, String)>,
}

impl TestScenario {
    pub fn new(name: impl Into<String>, policy: RoutingPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            changes: Vec::new(),
            expected_edges: Vec::new(),
        }
    }

    pub fn attach(mut self, spec: AttachmentSpec) -> Self {
        self.changes.push(TopologyChange::Attach(spec));
        self
    }

    pub fn detach(mut self, id: &str) -> Self {
        self.changes.push(TopologyChange::Detach(attachment_id(id)));
        self
    }

    pub fn expect_edge(mut self, attachment: impl Into<String>, table: impl Into<String>) -> Self {
        self.expected_edges.push((attachment.into(), table.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_policy_builder() {
        let policy = PolicyBuilder::new()
            .group("app", &["db"])
            .with_tag("app", "env", "prod")
            .build();

        assert!(policy.isolation);
        assert_eq!(policy.groups["app"].allowed_groups, vec!["db".to_string()]);
        assert_eq!(policy.groups["app"].tags["env"], "prod");
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_three_tier_fixture() {
        let policy = policy_fixtures::three_tier();
        assert_eq!(policy.groups.len(), 3);
        assert_eq!(policy.hub.description, "shared services");
    }

    #[test]
    fn test_attachment_fixtures() {
        let spec = attachment_fixtures::with_prefixes("vpc-1", "app", &["10.1.0.0/16"]);
        assert_eq!(spec.group_name, "app");
        assert_eq!(spec.owned_prefixes, vec![prefix("10.1.0.0/16")]);
        assert_eq!(attachment_fixtures::hub("shared-1").group_name, "hub");
    }

    #[test]
    fn test_peering_fixture() {
        let config = peering_fixtures::east_west(Some(&["hub", "app"]));
        assert_eq!(config.local.tables[&GroupRef::Hub].as_str(), "rtb-east-hub");
        assert_eq!(config.participating_groups.map(|g| g.len()), Some(2));
    }

    #[test]
    fn test_scenario() {
        let scenario = TestScenario::new("spoke joins", policy_fixtures::three_tier())
            .attach(attachment_fixtures::spoke("vpc-1", "app"))
            .detach("vpc-1")
            .expect_edge("vpc-1", "hub");

        assert_eq!(scenario.changes.len(), 2);
        assert_eq!(
            scenario.changes[1],
            TopologyChange::Detach(attachment_id("vpc-1"))
        );
        assert_eq!(scenario.expected_edges.len(), 1);
    }
}
