//! Attachment registrar - validates and records attachments

use tracing::{info, warn};
use transit_orch_common::{Action, Directive};
use transit_policy::RoutingResult;
use transit_types::{AttachmentId, IpPrefix};

use crate::model::RoutingDomainModel;
use crate::planner::ReachabilityPlanner;
use crate::types::*;

/// Records attachments in a model and plans their directives.
///
/// Nothing is submitted here; the returned directives describe what should
/// exist, so a caller can compare them with the provisioning layer first.
pub struct AttachmentRegistrar<'a> {
    model: &'a mut RoutingDomainModel,
}

impl<'a> AttachmentRegistrar<'a> {
    pub fn new(model: &'a mut RoutingDomainModel) -> Self {
        Self { model }
    }

    /// Attach an endpoint to a group.
    ///
    /// Fails with `UnknownGroup` if the group was never declared and with
    /// `DuplicateAttachment` if the id is already attached; the model is
    /// unchanged in both cases. On success the planned edges are committed
    /// to the model.
    pub fn attach(
        &mut self,
        id: &AttachmentId,
        group_name: &str,
        owned_prefixes: Vec<IpPrefix>,
    ) -> RoutingResult<AttachmentPlan> {
        let group = self.model.resolve_group(group_name)?;
        let ordinal = self
            .model
            .insert_attachment(id.clone(), group.clone(), owned_prefixes)?
            .ordinal;

        let plan = ReachabilityPlanner::new(self.model).plan(id)?;
        self.model.commit(&plan);

        info!(
            "Attached {} to {} (ordinal {}, {} directives)",
            id,
            group,
            ordinal,
            plan.directives.len()
        );
        for err in &plan.dangling {
            warn!("Attachment {} planned partially: {}", id, err);
        }
        Ok(plan)
    }

    /// Re-plan an attachment against the current model.
    ///
    /// Only edges missing from the model are returned, e.g. edges towards an
    /// allow-listed group declared after the attachment joined.
    pub fn replan(&mut self, id: &AttachmentId) -> RoutingResult<AttachmentPlan> {
        let mut plan = ReachabilityPlanner::new(self.model).plan(id)?;
        // The association was planned on attach
        plan.directives
            .retain(|d| !matches!(d.action, Action::Associate { .. }));
        self.model.commit(&plan);
        Ok(plan)
    }

    /// Detach an endpoint.
    ///
    /// Returns tombstones for its association and every edge sourced from it.
    pub fn detach(&mut self, id: &AttachmentId) -> RoutingResult<Vec<Directive>> {
        let (record, edges) = self.model.remove_attachment(id)?;

        let tombstones: Vec<Directive> = std::iter::once(record.association_id())
            .chain(edges)
            .map(|target| Directive::new(tombstone_id(&target), Action::Tombstone { target }))
            .collect();

        info!(
            "Detached {} from {} ({} tombstones)",
            id,
            record.group,
            tombstones.len()
        );
        Ok(tombstones)
    }
}
