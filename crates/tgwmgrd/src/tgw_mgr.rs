//! Transit Gateway Manager - ties planning to provisioning

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};
use transit_orch_common::{
    Action, DependencyKey, Directive, DirectiveExecutor, DirectiveId, ProvisioningClient,
    SubmitReport,
};
use transit_policy::{AttachmentSpec, RoutingPolicy, RoutingResult};
use transit_types::{AttachmentId, DomainId, GroupRef, LinkId, ResourceId, TableId};

use crate::model::RoutingDomainModel;
use crate::peering::{DomainTables, PeeringPlan};
use crate::registrar::AttachmentRegistrar;
use crate::types::*;

/// Transit Gateway Manager
///
/// Owns one routing domain, the provisioning client it is applied through,
/// and the directives planned but not yet successfully submitted.
pub struct TgwMgr<C: ProvisioningClient> {
    model: RoutingDomainModel,

    client: C,

    executor: DirectiveExecutor,

    /// Planned directives awaiting successful submission
    outstanding: BTreeMap<DirectiveId, Directive>,
}

impl<C: ProvisioningClient> TgwMgr<C> {
    /// Create a manager for a model, queueing its table directives
    pub fn new(model: RoutingDomainModel, client: C) -> Self {
        let mut mgr = Self {
            model,
            client,
            executor: DirectiveExecutor::new(),
            outstanding: BTreeMap::new(),
        };
        let tables = mgr.model.table_directives();
        mgr.enqueue(tables);

        info!(
            "TgwMgr initialized with {} groups via {}",
            mgr.model.groups().count(),
            mgr.client.name()
        );
        mgr
    }

    /// Create a manager from a policy document
    pub fn from_policy(policy: &RoutingPolicy, client: C) -> RoutingResult<Self> {
        Ok(Self::new(RoutingDomainModel::from_policy(policy)?, client))
    }

    pub fn model(&self) -> &RoutingDomainModel {
        &self.model
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn executor(&self) -> &DirectiveExecutor {
        &self.executor
    }

    /// Directives planned but not yet applied, in id order
    pub fn outstanding(&self) -> impl Iterator<Item = &Directive> {
        self.outstanding.values()
    }

    fn enqueue(&mut self, directives: impl IntoIterator<Item = Directive>) {
        for directive in directives {
            self.outstanding.insert(directive.id.clone(), directive);
        }
    }

    /// Declare a group and queue its table
    #[instrument(skip(self, allow_list))]
    pub fn declare_group(
        &mut self,
        name: &str,
        allow_list: &[&str],
        description: &str,
    ) -> RoutingResult<()> {
        let group = self
            .model
            .declare_group(name, allow_list.iter().copied(), description)?
            .name
            .clone();
        if !self.model.is_flat() {
            let table = Directive::new(
                table_directive_id(&group),
                Action::CreateTable { group },
            );
            self.enqueue([table]);
        }
        Ok(())
    }

    /// Attach an endpoint and queue its directives
    #[instrument(skip(self, spec), fields(attachment = %spec.attachment_id, group = %spec.group_name))]
    pub fn attach(&mut self, spec: &AttachmentSpec) -> RoutingResult<AttachmentPlan> {
        let plan = AttachmentRegistrar::new(&mut self.model).attach(
            &spec.attachment_id,
            &spec.group_name,
            spec.owned_prefixes.clone(),
        )?;
        self.enqueue(plan.directives.iter().cloned());
        Ok(plan)
    }

    /// Re-plan an attachment, queueing only the edges still missing
    #[instrument(skip(self))]
    pub fn replan(&mut self, id: &AttachmentId) -> RoutingResult<AttachmentPlan> {
        let plan = AttachmentRegistrar::new(&mut self.model).replan(id)?;
        debug!("Replanned {}: {} new directives", id, plan.directives.len());
        self.enqueue(plan.directives.iter().cloned());
        Ok(plan)
    }

    /// Detach an endpoint and queue tombstones for what it created
    #[instrument(skip(self))]
    pub fn detach(&mut self, id: &AttachmentId) -> RoutingResult<Vec<Directive>> {
        let tombstones = AttachmentRegistrar::new(&mut self.model).detach(id)?;

        for tombstone in &tombstones {
            if let Action::Tombstone { target } = &tombstone.action {
                if self.outstanding.remove(target).is_some() {
                    debug!("Dropped unsubmitted directive {}", target);
                }
            }
        }
        self.enqueue(tombstones.iter().cloned());
        Ok(tombstones)
    }

    /// Queue the directives of one side of a peering plan.
    ///
    /// The local side requests the link itself; the remote side only queues
    /// its routes, which wait until [`Self::mark_peering_accepted`] is called.
    pub fn enqueue_peering(&mut self, plan: &PeeringPlan, local_side: bool) {
        let routes = if local_side { &plan.local } else { &plan.remote };
        match routes {
            Ok(routes) => {
                if local_side {
                    self.enqueue([plan.link.clone()]);
                }
                self.enqueue(routes.iter().cloned());
            }
            Err(e) => warn!("Peering {} not queued: {}", plan.link.id, e),
        }
    }

    /// Record a peering link accepted by the other domain's manager
    pub fn mark_peering_accepted(&mut self, link: &LinkId, resource: ResourceId) {
        self.executor
            .mark_satisfied(DependencyKey::PeeringAccepted(link.clone()), resource);
    }

    /// Submit every outstanding directive.
    ///
    /// Successful directives leave the outstanding set; failed and blocked
    /// ones stay and are resubmitted by the next call.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> SubmitReport {
        let directives: Vec<Directive> = self.outstanding.values().cloned().collect();
        let report = self.executor.submit(&self.client, &directives).await;

        for id in report.succeeded() {
            self.outstanding.remove(id);
        }
        if !self.outstanding.is_empty() {
            warn!(
                "{} directives still outstanding after submission",
                self.outstanding.len()
            );
        }
        report
    }

    /// Table ids reported by the provisioning layer, per group
    pub fn table_ids(&self) -> BTreeMap<GroupRef, TableId> {
        self.model
            .groups()
            .filter_map(|group| {
                self.executor
                    .table_id(&group.name)
                    .map(|table| (group.name.clone(), table))
            })
            .collect()
    }

    /// Describe this domain for a peering link
    pub fn domain_tables(
        &self,
        domain: DomainId,
        region: &str,
        peering_attachment: AttachmentId,
    ) -> DomainTables {
        DomainTables::new(domain, region, peering_attachment, self.table_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use transit_orch_common::{InMemoryProvisioner, SubmitStatus};
    use transit_policy::GroupPolicy;

    fn policy() -> RoutingPolicy {
        let mut policy = RoutingPolicy::default();
        policy.groups.insert(
            "app".to_string(),
            GroupPolicy {
                allowed_groups: vec!["db".to_string()],
                ..Default::default()
            },
        );
        policy.groups.insert("db".to_string(), GroupPolicy::default());
        policy
    }

    fn spec(id: &str, group: &str) -> AttachmentSpec {
        AttachmentSpec::new(AttachmentId::new(id).unwrap(), group)
    }

    #[test]
    fn test_tgwmgr_new() {
        let mgr = TgwMgr::from_policy(&policy(), InMemoryProvisioner::new()).unwrap();
        let queued: Vec<_> = mgr.outstanding().map(|d| d.id.to_string()).collect();
        assert_eq!(queued, vec!["app-table", "db-table", "hub-table"]);
    }

    #[tokio::test]
    async fn test_attach_and_submit() {
        let mut mgr = TgwMgr::from_policy(&policy(), InMemoryProvisioner::new()).unwrap();
        mgr.attach(&spec("vpc-app", "app")).unwrap();
        mgr.attach(&spec("vpc-db", "db")).unwrap();

        let report = mgr.submit().await;
        assert!(report.is_complete(), "{:?}", report);
        assert_eq!(mgr.outstanding().count(), 0);

        let tables = mgr.table_ids();
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[&GroupRef::Hub].as_str(), "rtb-hub");
        assert!(mgr.client().object_keys().contains(&"propagate:vpc-db:rtb-app".to_string()));
    }

    #[tokio::test]
    async fn test_failed_directive_is_resubmitted() {
        let client = InMemoryProvisioner::new();
        client.fail_next("create_table:db");
        let mut mgr = TgwMgr::from_policy(&policy(), client).unwrap();
        mgr.attach(&spec("vpc-db", "db")).unwrap();

        let first = mgr.submit().await;
        assert!(!first.is_complete());
        assert!(mgr.outstanding().any(|d| d.id.as_str() == "db-table"));

        let second = mgr.submit().await;
        assert!(second.is_complete(), "{:?}", second);
        assert_eq!(mgr.outstanding().count(), 0);
    }

    #[tokio::test]
    async fn test_detach_withdraws() {
        let mut mgr = TgwMgr::from_policy(&policy(), InMemoryProvisioner::new()).unwrap();
        mgr.attach(&spec("vpc-app", "app")).unwrap();
        mgr.submit().await;
        let objects = mgr.client().object_count();

        let tombstones = mgr.detach(&AttachmentId::new("vpc-app").unwrap()).unwrap();
        let report = mgr.submit().await;

        for tombstone in &tombstones {
            assert_eq!(report.status(&tombstone.id), Some(&SubmitStatus::Withdrawn));
        }
        assert_eq!(mgr.client().object_count(), objects - tombstones.len());
    }

    #[tokio::test]
    async fn test_detach_before_submit_drops_directives() {
        let mut mgr = TgwMgr::from_policy(&policy(), InMemoryProvisioner::new()).unwrap();
        mgr.attach(&spec("vpc-app", "app")).unwrap();
        mgr.detach(&AttachmentId::new("vpc-app").unwrap()).unwrap();

        let report = mgr.submit().await;
        assert!(report.is_complete());
        assert_eq!(mgr.client().object_keys().len(), 3);
    }

    #[test]
    fn test_declare_group_queues_table() {
        let mut mgr = TgwMgr::from_policy(&policy(), InMemoryProvisioner::new()).unwrap();
        mgr.declare_group("web", &["app"], "frontend").unwrap();
        assert!(mgr.outstanding().any(|d| d.id.as_str() == "web-table"));
        assert!(mgr.declare_group("web", &[], "").is_err());
    }
}
