//! Routing domain model - groups, allow-lists, attachments and committed edges

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};
use transit_orch_common::{Action, Directive, DirectiveId, Registry};
use transit_policy::{
    parse_allow_list, GroupDeclaration, RoutingError, RoutingPolicy, RoutingResult,
};
use transit_types::{AttachmentId, DomainId, GroupName, GroupRef, IpPrefix, HUB_GROUP_NAME};

use crate::types::*;

/// In-memory representation of one routing domain.
///
/// The hub group is seeded by the constructor and always exists. Declared
/// groups live in a registry keyed by validated [`GroupName`]s, so the
/// reserved name can never be declared.
#[derive(Debug, Clone)]
pub struct RoutingDomainModel {
    mode: DomainMode,

    hub: RoutingGroup,

    /// Declared groups
    groups: Registry<GroupName, RoutingGroup>,

    /// Reverse allow-list index: group -> declared groups naming it.
    /// Keys may be groups that are not declared yet.
    allowed_by: BTreeMap<GroupName, BTreeSet<GroupName>>,

    attachments: Registry<AttachmentId, AttachmentRecord>,

    /// Edges planned so far -> directive that creates them
    edges: BTreeMap<PropagationEdge, DirectiveId>,
}

impl RoutingDomainModel {
    /// Create a model holding only the hub group
    pub fn new(seed: HubSeed, mode: DomainMode) -> Self {
        info!("Routing domain initialized ({:?} mode)", mode);
        Self {
            mode,
            hub: RoutingGroup::new(GroupRef::Hub, seed.description, Vec::new()),
            groups: Registry::new(),
            allowed_by: BTreeMap::new(),
            attachments: Registry::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Build a model from a policy document, declaring every group
    pub fn from_policy(policy: &RoutingPolicy) -> RoutingResult<Self> {
        let mut model = Self::new(
            HubSeed::new(policy.hub.description.as_str()),
            DomainMode::from_isolation(policy.isolation),
        );
        for declaration in policy.declarations()? {
            model.declare(declaration)?;
        }
        Ok(model)
    }

    pub fn mode(&self) -> DomainMode {
        self.mode
    }

    pub fn is_flat(&self) -> bool {
        self.mode == DomainMode::Flat
    }

    /// Declare a routing group.
    ///
    /// Allow-list entries may name groups that are not declared yet; they are
    /// checked when edges are computed. `hub` and self entries are dropped
    /// since hub reachability is implicit. Nothing is changed on error.
    pub fn declare_group<I, S>(
        &mut self,
        name: &str,
        allow_list: I,
        description: impl Into<String>,
    ) -> RoutingResult<&RoutingGroup>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name == HUB_GROUP_NAME {
            return Err(RoutingError::reserved_name(name));
        }
        let group_name = GroupName::new(name)?;
        if self.groups.contains_key(&group_name) {
            return Err(RoutingError::duplicate_group(name));
        }

        let peers = parse_allow_list(name, allow_list)?;
        self.insert_group(group_name, peers, description.into())
    }

    /// Declare a group from an already validated policy declaration.
    pub fn declare(&mut self, declaration: GroupDeclaration) -> RoutingResult<&RoutingGroup> {
        if self.groups.contains_key(&declaration.name) {
            return Err(RoutingError::duplicate_group(declaration.name.as_str()));
        }
        self.insert_group(
            declaration.name,
            declaration.allow_list,
            declaration.description,
        )
    }

    fn insert_group(
        &mut self,
        group_name: GroupName,
        peers: Vec<GroupName>,
        description: String,
    ) -> RoutingResult<&RoutingGroup> {
        for peer in &peers {
            self.allowed_by
                .entry(peer.clone())
                .or_default()
                .insert(group_name.clone());
        }

        info!(
            "Declared group {} (allow-list: {:?})",
            group_name,
            peers.iter().map(GroupName::as_str).collect::<Vec<_>>()
        );

        let group = RoutingGroup::new(GroupRef::Named(group_name.clone()), description, peers);
        self.groups
            .insert_new(group_name.clone(), group)
            .map(|group| &*group)
            .map_err(|_| RoutingError::duplicate_group(group_name.as_str()))
    }

    /// Returns true for the hub and every declared group
    pub fn is_declared(&self, group: &GroupRef) -> bool {
        match group {
            GroupRef::Hub => true,
            GroupRef::Named(name) => self.groups.contains_key(name),
        }
    }

    pub fn group(&self, group: &GroupRef) -> Option<&RoutingGroup> {
        match group {
            GroupRef::Hub => Some(&self.hub),
            GroupRef::Named(name) => self.groups.get(name),
        }
    }

    fn group_mut(&mut self, group: &GroupRef) -> Option<&mut RoutingGroup> {
        match group {
            GroupRef::Hub => Some(&mut self.hub),
            GroupRef::Named(name) => self.groups.get_mut(name),
        }
    }

    pub fn hub(&self) -> &RoutingGroup {
        &self.hub
    }

    /// Iterate over every group, hub first
    pub fn groups(&self) -> impl Iterator<Item = &RoutingGroup> {
        std::iter::once(&self.hub).chain(self.groups.values())
    }

    /// Iterate over declared group names in order
    pub fn declared_groups(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.keys()
    }

    /// Declared groups whose allow-list names `group`
    pub fn allowed_by(&self, group: &GroupName) -> impl Iterator<Item = &GroupName> {
        self.allowed_by.get(group).into_iter().flatten()
    }

    /// Resolve a group name from an attachment request.
    ///
    /// In flat mode every name resolves to the hub.
    pub fn resolve_group(&self, name: &str) -> RoutingResult<GroupRef> {
        if self.is_flat() {
            return Ok(GroupRef::Hub);
        }
        match GroupRef::parse(name) {
            Ok(group) if self.is_declared(&group) => Ok(group),
            _ => Err(RoutingError::unknown_group(name)),
        }
    }

    pub fn attachment(&self, id: &AttachmentId) -> Option<&AttachmentRecord> {
        self.attachments.get(id)
    }

    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentRecord> {
        self.attachments.values()
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Attachments currently bound to `group`, in id order
    pub fn attachments_in(&self, group: &GroupRef) -> impl Iterator<Item = &AttachmentRecord> {
        self.group(group)
            .into_iter()
            .flat_map(|g| g.attachments.iter())
            .filter_map(|id| self.attachments.get(id))
    }

    /// Record an attachment in an already resolved group
    pub(crate) fn insert_attachment(
        &mut self,
        id: AttachmentId,
        group: GroupRef,
        owned_prefixes: Vec<IpPrefix>,
    ) -> RoutingResult<&AttachmentRecord> {
        if self.attachments.contains_key(&id) {
            return Err(RoutingError::DuplicateAttachment { id: id.to_string() });
        }
        let target = self
            .group_mut(&group)
            .ok_or_else(|| RoutingError::unknown_group(group.as_str()))?;

        let ordinal = target.next_ordinal;
        target.next_ordinal += 1;
        target.attachments.insert(id.clone());

        let record = AttachmentRecord {
            id: id.clone(),
            group,
            ordinal,
            owned_prefixes,
        };
        self.attachments
            .insert_new(id.clone(), record)
            .map(|record| &*record)
            .map_err(|_| RoutingError::DuplicateAttachment { id: id.to_string() })
    }

    /// Remove an attachment and every edge sourced from it.
    ///
    /// Returns the record and the directive ids of the removed edges.
    pub(crate) fn remove_attachment(
        &mut self,
        id: &AttachmentId,
    ) -> RoutingResult<(AttachmentRecord, Vec<DirectiveId>)> {
        let record = self
            .attachments
            .remove(id)
            .map_err(|_| RoutingError::UnknownAttachment { id: id.to_string() })?;

        if let Some(group) = self.group_mut(&record.group) {
            group.attachments.remove(id);
        }

        let sourced: Vec<PropagationEdge> = self
            .edges
            .keys()
            .filter(|edge| &edge.attachment == id)
            .cloned()
            .collect();
        let directives = sourced
            .iter()
            .filter_map(|edge| self.edges.remove(edge))
            .collect();

        Ok((record, directives))
    }

    pub fn has_edge(&self, edge: &PropagationEdge) -> bool {
        self.edges.contains_key(edge)
    }

    pub fn edges(&self) -> impl Iterator<Item = &PropagationEdge> {
        self.edges.keys()
    }

    /// Edges whose routes are visible in `table`
    pub fn edges_into<'a>(
        &'a self,
        table: &'a GroupRef,
    ) -> impl Iterator<Item = &'a PropagationEdge> + 'a {
        self.edges.keys().filter(move |edge| &edge.table == table)
    }

    /// Mark every edge of a plan as present
    pub fn commit(&mut self, plan: &AttachmentPlan) {
        for directive in &plan.directives {
            if let Some(edge) = PropagationEdge::from_directive(directive) {
                debug!("Committed edge {} -> {}", edge.attachment, edge.table);
                self.edges.insert(edge, directive.id.clone());
            }
        }
    }

    /// Directives creating the forwarding table of every group, hub first.
    ///
    /// A flat domain has only the hub table.
    pub fn table_directives(&self) -> Vec<Directive> {
        let groups: Vec<GroupRef> = if self.is_flat() {
            vec![GroupRef::Hub]
        } else {
            self.groups().map(|g| g.name.clone()).collect()
        };

        groups
            .into_iter()
            .map(|group| Directive::new(table_directive_id(&group), Action::CreateTable { group }))
            .collect()
    }

    /// Prefixes owned by every attachment, sorted and deduplicated
    pub fn owned_prefixes(&self) -> Vec<IpPrefix> {
        self.attachments
            .values()
            .flat_map(|record| record.owned_prefixes.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Arena of independent routing domains keyed by domain id.
#[derive(Debug, Default)]
pub struct DomainArena {
    domains: BTreeMap<DomainId, RoutingDomainModel>,
}

impl DomainArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: DomainId, model: RoutingDomainModel) -> RoutingResult<()> {
        if self.domains.contains_key(&id) {
            return Err(RoutingError::DuplicateDomain { id: id.to_string() });
        }
        info!("Added routing domain {}", id);
        self.domains.insert(id, model);
        Ok(())
    }

    pub fn get(&self, id: &DomainId) -> Option<&RoutingDomainModel> {
        self.domains.get(id)
    }

    pub fn get_mut(&mut self, id: &DomainId) -> Option<&mut RoutingDomainModel> {
        self.domains.get_mut(id)
    }

    pub fn remove(&mut self, id: &DomainId) -> Option<RoutingDomainModel> {
        self.domains.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &DomainId> {
        self.domains.keys()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model() -> RoutingDomainModel {
        RoutingDomainModel::new(HubSeed::default(), DomainMode::Isolated)
    }

    fn named(name: &str) -> GroupRef {
        GroupRef::parse(name).unwrap()
    }

    const NONE: [&str; 0] = [];

    #[test]
    fn test_hub_is_seeded() {
        let model = RoutingDomainModel::new(HubSeed::new("shared"), DomainMode::Isolated);
        assert!(model.is_declared(&GroupRef::Hub));
        assert_eq!(model.hub().description, "shared");
        assert_eq!(model.groups().count(), 1);
    }

    #[test]
    fn test_declare_hub_is_reserved() {
        let mut model = model();
        let err = model.declare_group("hub", NONE, "").unwrap_err();
        assert_eq!(err, RoutingError::reserved_name("hub"));
    }

    #[test]
    fn test_duplicate_declaration_keeps_first() {
        let mut model = model();
        model.declare_group("app", ["db"], "first").unwrap();

        let err = model.declare_group("app", ["web"], "second").unwrap_err();
        assert_eq!(err, RoutingError::duplicate_group("app"));

        let app = model.group(&named("app")).unwrap();
        assert_eq!(app.description, "first");
        assert_eq!(app.allow_list, vec![GroupName::new("db").unwrap()]);
        assert_eq!(model.allowed_by(&GroupName::new("web").unwrap()).count(), 0);
    }

    #[test]
    fn test_forward_reference_indexed() {
        let mut model = model();
        model.declare_group("app", ["db", "hub", "app"], "").unwrap();

        let db = GroupName::new("db").unwrap();
        assert!(!model.is_declared(&GroupRef::Named(db.clone())));
        let allowers: Vec<_> = model.allowed_by(&db).map(GroupName::as_str).collect();
        assert_eq!(allowers, vec!["app"]);
        // hub and self entries are dropped
        assert_eq!(model.group(&named("app")).unwrap().allow_list.len(), 1);
    }

    #[test]
    fn test_invalid_allow_list_leaves_state_unchanged() {
        let mut model = model();
        assert!(model.declare_group("app", ["db tier"], "").is_err());
        assert!(!model.is_declared(&named("app")));
    }

    #[test]
    fn test_resolve_group() {
        let mut model = model();
        model.declare_group("app", NONE, "").unwrap();

        assert_eq!(model.resolve_group("hub").unwrap(), GroupRef::Hub);
        assert_eq!(model.resolve_group("app").unwrap(), named("app"));
        assert_eq!(
            model.resolve_group("ghost").unwrap_err(),
            RoutingError::unknown_group("ghost")
        );
        assert_eq!(
            model.resolve_group("").unwrap_err(),
            RoutingError::unknown_group("")
        );
    }

    #[test]
    fn test_flat_mode_resolves_to_hub() {
        let model = RoutingDomainModel::new(HubSeed::default(), DomainMode::Flat);
        assert_eq!(model.resolve_group("anything").unwrap(), GroupRef::Hub);
        assert_eq!(model.table_directives().len(), 1);
    }

    #[test]
    fn test_ordinals_are_never_reused() {
        let mut model = model();
        model.declare_group("app", NONE, "").unwrap();
        let vpc1 = AttachmentId::new("vpc-1").unwrap();
        let vpc2 = AttachmentId::new("vpc-2").unwrap();

        model.insert_attachment(vpc1.clone(), named("app"), vec![]).unwrap();
        model.remove_attachment(&vpc1).unwrap();
        let record = model.insert_attachment(vpc2, named("app"), vec![]).unwrap();
        assert_eq!(record.ordinal, 1);
    }

    #[test]
    fn test_duplicate_attachment() {
        let mut model = model();
        let vpc = AttachmentId::new("vpc-1").unwrap();
        model.insert_attachment(vpc.clone(), GroupRef::Hub, vec![]).unwrap();
        assert!(matches!(
            model.insert_attachment(vpc, GroupRef::Hub, vec![]),
            Err(RoutingError::DuplicateAttachment { .. })
        ));
        assert_eq!(model.attachment_count(), 1);
    }

    #[test]
    fn test_table_directives_hub_first() {
        let mut model = model();
        model.declare_group("web", NONE, "").unwrap();
        model.declare_group("app", NONE, "").unwrap();

        let ids: Vec<_> = model
            .table_directives()
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["hub-table", "app-table", "web-table"]);
    }

    #[test]
    fn test_owned_prefixes_sorted_and_deduplicated() {
        let mut model = model();
        let p1: IpPrefix = "10.2.0.0/16".parse().unwrap();
        let p2: IpPrefix = "10.1.0.0/16".parse().unwrap();
        model
            .insert_attachment(AttachmentId::new("vpc-1").unwrap(), GroupRef::Hub, vec![p1, p2])
            .unwrap();
        model
            .insert_attachment(AttachmentId::new("vpc-2").unwrap(), GroupRef::Hub, vec![p1])
            .unwrap();

        assert_eq!(model.owned_prefixes(), vec![p2, p1]);
    }

    #[test]
    fn test_from_policy() {
        let mut policy = RoutingPolicy::default();
        policy.isolation = false;
        policy.groups.insert("app".into(), Default::default());

        let model = RoutingDomainModel::from_policy(&policy).unwrap();
        assert!(model.is_flat());
        assert!(model.is_declared(&named("app")));
    }

    #[test]
    fn test_domain_arena() {
        let mut arena = DomainArena::new();
        let east = DomainId::new("east").unwrap();
        arena.insert(east.clone(), model()).unwrap();

        assert!(matches!(
            arena.insert(east.clone(), model()),
            Err(RoutingError::DuplicateDomain { .. })
        ));
        arena
            .get_mut(&east)
            .unwrap()
            .declare_group("app", NONE, "")
            .unwrap();
        arena
            .insert(DomainId::new("west").unwrap(), model())
            .unwrap();

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(&east).unwrap().declared_groups().count(), 1);
        assert_eq!(
            arena
                .get(&DomainId::new("west").unwrap())
                .unwrap()
                .declared_groups()
                .count(),
            0
        );
    }
}
