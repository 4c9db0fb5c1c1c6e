//! Reachability planner - propagation edges for a newly attached endpoint
//!
//! For an attachment `a` in group `G` the planner emits, in order:
//!
//! 1. the association of `a` with `G`'s table
//! 2. the self edge `a -> G`
//! 3. for a spoke: `a -> hub`, and `h -> G` for every hub attachment `h`
//! 4. for a hub attachment: `a -> A` for every declared group `A`
//! 5. for every allow-listed peer `A` (either direction of the relationship):
//!    `a -> A`, and `b -> G` for every attachment `b` of `A`
//!
//! Edges already present in the model, or already emitted earlier in the same
//! plan, are dropped. The planner never mutates the model.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use transit_orch_common::{Action, DependencyKey, Directive};
use transit_policy::{RoutingError, RoutingResult};
use transit_types::{AttachmentId, GroupName, GroupRef};

use crate::model::RoutingDomainModel;
use crate::types::*;

/// Computes the directives required for one attachment.
pub struct ReachabilityPlanner<'a> {
    model: &'a RoutingDomainModel,
}

/// Accumulates directives of one plan, dropping duplicate edges.
struct PlanBuilder<'a> {
    model: &'a RoutingDomainModel,
    plan: AttachmentPlan,
    seen: BTreeSet<PropagationEdge>,
}

impl<'a> PlanBuilder<'a> {
    fn emit_association(&mut self, record: &AttachmentRecord) {
        let directive = Directive::new(
            record.association_id(),
            Action::Associate {
                attachment: record.id.clone(),
                group: record.group.clone(),
            },
        )
        .depends_on(DependencyKey::Table(record.group.clone()));
        self.plan.directives.push(directive);
    }

    fn emit_edge(&mut self, source: &AttachmentRecord, table: &GroupRef) {
        let edge = PropagationEdge::new(source.id.clone(), source.group.clone(), table.clone());
        if self.model.has_edge(&edge) {
            debug!("Edge {} -> {} already present", source.id, table);
            return;
        }
        if !self.seen.insert(edge) {
            return;
        }

        debug!("Edge {} ({}) -> {}", source.id, source.group, table);
        let directive = Directive::new(
            source.propagation_id(table),
            Action::Propagate {
                attachment: source.id.clone(),
                source: source.group.clone(),
                table: table.clone(),
            },
        )
        .depends_on(DependencyKey::Attachment(source.id.clone()))
        .depends_on(DependencyKey::Table(table.clone()));
        self.plan.directives.push(directive);
    }

    /// Make every attachment of `from` visible in `table`
    fn emit_members_into(&mut self, from: &GroupRef, table: &GroupRef) {
        let model = self.model;
        let members: Vec<&AttachmentRecord> = model.attachments_in(from).collect();
        for member in members {
            self.emit_edge(member, table);
        }
    }
}

impl<'a> ReachabilityPlanner<'a> {
    pub fn new(model: &'a RoutingDomainModel) -> Self {
        Self { model }
    }

    /// Plan the directives for an already recorded attachment.
    ///
    /// Allow-list entries naming undeclared groups are reported in
    /// [`AttachmentPlan::dangling`]; every edge not depending on them is
    /// still returned.
    pub fn plan(&self, id: &AttachmentId) -> RoutingResult<AttachmentPlan> {
        let record = self
            .model
            .attachment(id)
            .ok_or_else(|| RoutingError::UnknownAttachment { id: id.to_string() })?;

        let mut builder = PlanBuilder {
            model: self.model,
            plan: AttachmentPlan::new(id.clone()),
            seen: BTreeSet::new(),
        };

        builder.emit_association(record);
        builder.emit_edge(record, &record.group);

        if self.model.is_flat() {
            return Ok(builder.plan);
        }

        match &record.group {
            GroupRef::Hub => {
                for group in self.model.declared_groups() {
                    builder.emit_edge(record, &GroupRef::Named(group.clone()));
                }
            }
            GroupRef::Named(name) => {
                builder.emit_edge(record, &GroupRef::Hub);
                builder.emit_members_into(&GroupRef::Hub, &record.group);

                for peer in self.peers(name, &mut builder.plan.dangling) {
                    let peer = GroupRef::Named(peer);
                    builder.emit_edge(record, &peer);
                    builder.emit_members_into(&peer, &record.group);
                }
            }
        }

        Ok(builder.plan)
    }

    /// Declared peers of `group` from both sides of every allow relationship.
    fn peers(&self, group: &GroupName, dangling: &mut Vec<RoutingError>) -> Vec<GroupName> {
        let mut peers: Vec<GroupName> = Vec::new();

        let own = self
            .model
            .group(&GroupRef::Named(group.clone()))
            .map(|g| g.allow_list.clone())
            .unwrap_or_default();
        for peer in own {
            if !self.model.is_declared(&GroupRef::Named(peer.clone())) {
                warn!("Group {} allows undeclared group {}", group, peer);
                dangling.push(RoutingError::dangling_allow_list(group.as_str(), peer.as_str()));
                continue;
            }
            if !peers.contains(&peer) {
                peers.push(peer);
            }
        }

        for peer in self.model.allowed_by(group) {
            if peer != group && !peers.contains(peer) {
                peers.push(peer.clone());
            }
        }

        peers
    }
}
