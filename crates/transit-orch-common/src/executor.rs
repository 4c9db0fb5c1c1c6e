//! Dependency-ordered directive submission.
//!
//! The executor submits directives in waves. Every directive whose
//! dependencies are satisfied goes out in the current wave, concurrently with
//! the rest of the wave; applying a directive satisfies the key it provides and
//! releases its dependents into the next wave. Failures are reported, never
//! retried here.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use transit_types::{AttachmentId, GroupRef, IpPrefix, LinkId, ResourceId, TableId};

use crate::client::{ProvisionError, ProvisionResult, ProvisioningClient};
use crate::dependency::DependencyQueue;
use crate::directive::{Action, DependencyKey, Directive, DirectiveId};
use crate::status::{SubmitReport, SubmitStatus};

/// A provisioning call with every reference resolved.
#[derive(Debug)]
enum Call {
    CreateTable(GroupRef),
    Associate(AttachmentId, TableId),
    Propagate(AttachmentId, TableId),
    StaticRoute(TableId, IpPrefix, AttachmentId),
    CreatePeering(LinkId, String, String),
    Destroy(DirectiveId, ResourceId),
    Skip,
}

#[derive(Debug)]
enum CallOutcome {
    Created(ResourceId),
    Destroyed(DirectiveId),
    Skipped,
}

impl Call {
    async fn invoke<C>(self, client: &C) -> ProvisionResult<CallOutcome>
    where
        C: ProvisioningClient + ?Sized,
    {
        let created = match self {
            Call::CreateTable(group) => client.create_table(&group).await?.into(),
            Call::Associate(attachment, table) => client.associate(&attachment, &table).await?,
            Call::Propagate(attachment, table) => client.propagate(&attachment, &table).await?,
            Call::StaticRoute(table, cidr, via) => {
                client.create_static_route(&table, &cidr, &via).await?
            }
            Call::CreatePeering(link, local, remote) => {
                client.create_peering(&link, &local, &remote).await?
            }
            Call::Destroy(target, resource) => {
                client.destroy(&resource).await?;
                return Ok(CallOutcome::Destroyed(target));
            }
            Call::Skip => return Ok(CallOutcome::Skipped),
        };
        Ok(CallOutcome::Created(created))
    }
}

/// Submits directive sets to a [`ProvisioningClient`] and remembers what was applied.
///
/// The executor state carries across submissions: a directive applied in an
/// earlier submission is reported as already present, and dependency keys
/// satisfied earlier stay satisfied.
#[derive(Debug, Default)]
pub struct DirectiveExecutor {
    /// dependency -> object that satisfied it
    satisfied: BTreeMap<DependencyKey, ResourceId>,
    /// directive -> object it created
    applied: BTreeMap<DirectiveId, ResourceId>,
    /// directive -> key it provided
    provided: BTreeMap<DirectiveId, DependencyKey>,
}

impl DirectiveExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dependency satisfied outside this executor.
    ///
    /// Used for objects created by another domain's executor, such as a
    /// peering link accepted on the remote side.
    pub fn mark_satisfied(&mut self, key: DependencyKey, resource: ResourceId) {
        debug!("Dependency {} satisfied externally by {}", key, resource);
        self.satisfied.insert(key, resource);
    }

    pub fn is_satisfied(&self, key: &DependencyKey) -> bool {
        self.satisfied.contains_key(key)
    }

    pub fn resource_for(&self, key: &DependencyKey) -> Option<&ResourceId> {
        self.satisfied.get(key)
    }

    pub fn applied_resource(&self, id: &DirectiveId) -> Option<&ResourceId> {
        self.applied.get(id)
    }

    /// Returns the table id reported for a group, once its table exists.
    pub fn table_id(&self, group: &GroupRef) -> Option<TableId> {
        self.satisfied
            .get(&DependencyKey::Table(group.clone()))
            .cloned()
            .map(TableId::from)
    }

    /// Submits a directive set in dependency order.
    #[instrument(skip_all, fields(client = client.name(), directives = directives.len()))]
    pub async fn submit<C>(&mut self, client: &C, directives: &[Directive]) -> SubmitReport
    where
        C: ProvisioningClient + ?Sized,
    {
        let mut report = SubmitReport::default();
        let mut queue: DependencyQueue<DirectiveId, Directive> = DependencyQueue::new();

        for directive in directives {
            if let Some(resource) = self.applied.get(&directive.id) {
                report.record(
                    directive.id.clone(),
                    SubmitStatus::AlreadyPresent {
                        resource: resource.clone(),
                    },
                );
                continue;
            }
            let waiting_on: Vec<DependencyKey> = directive
                .depends_on
                .iter()
                .filter(|key| !self.satisfied.contains_key(*key))
                .cloned()
                .collect();
            queue.add(directive.id.clone(), directive.clone(), waiting_on);
        }

        let mut wave_no = 0usize;
        loop {
            let wave = queue.drain_ready();
            if wave.is_empty() {
                break;
            }
            wave_no += 1;
            debug!("Submitting wave {} ({} directives)", wave_no, wave.len());

            let calls: Vec<_> = wave
                .into_iter()
                .map(|(id, directive)| {
                    let call = self.prepare(&directive);
                    (id, directive, call)
                })
                .collect();

            let outcomes = join_all(calls.into_iter().map(|(id, directive, call)| async move {
                let outcome = match call {
                    Ok(call) => call.invoke(client).await,
                    Err(e) => Err(e),
                };
                (id, directive, outcome)
            }))
            .await;

            for (id, directive, outcome) in outcomes {
                match outcome {
                    Ok(CallOutcome::Created(resource)) => {
                        self.applied.insert(id.clone(), resource.clone());
                        if let Some(key) = directive.provides() {
                            self.satisfied.insert(key.clone(), resource.clone());
                            self.provided.insert(id.clone(), key.clone());
                            queue.satisfy(&key);
                        }
                        report.record(id, SubmitStatus::Applied { resource });
                    }
                    Ok(CallOutcome::Destroyed(target)) => {
                        self.applied.remove(&target);
                        if let Some(key) = self.provided.remove(&target) {
                            self.satisfied.remove(&key);
                        }
                        report.record(id, SubmitStatus::Withdrawn);
                    }
                    Ok(CallOutcome::Skipped) => {
                        report.record(id, SubmitStatus::Ignored);
                    }
                    Err(e) => {
                        warn!("Directive {} failed: {}", id, e);
                        report.record_failure(id, &e);
                    }
                }
            }
        }

        for (id, _, missing) in queue.drain_blocked() {
            warn!("Directive {} blocked on {} unsatisfied dependencies", id, missing.len());
            report.record_blocked(id, missing);
        }

        info!(
            "Submitted {} directives via {} in {} waves ({} applied)",
            directives.len(),
            client.name(),
            wave_no,
            report.applied().count()
        );
        report
    }

    fn resolve_table(&self, group: &GroupRef) -> ProvisionResult<TableId> {
        self.table_id(group)
            .ok_or_else(|| ProvisionError::Unresolved(DependencyKey::Table(group.clone()).to_string()))
    }

    fn prepare(&self, directive: &Directive) -> ProvisionResult<Call> {
        let call = match &directive.action {
            Action::CreateTable { group } => Call::CreateTable(group.clone()),
            Action::Associate { attachment, group } => {
                Call::Associate(attachment.clone(), self.resolve_table(group)?)
            }
            Action::Propagate {
                attachment, table, ..
            } => Call::Propagate(attachment.clone(), self.resolve_table(table)?),
            Action::StaticRoute {
                table_id,
                cidr,
                via,
                ..
            } => Call::StaticRoute(table_id.clone(), *cidr, via.clone()),
            Action::CreatePeering {
                link,
                local_region,
                remote_region,
            } => Call::CreatePeering(link.clone(), local_region.clone(), remote_region.clone()),
            Action::Tombstone { target } => match self.applied.get(target) {
                Some(resource) => Call::Destroy(target.clone(), resource.clone()),
                None => Call::Skip,
            },
        };
        Ok(call)
    }
}
