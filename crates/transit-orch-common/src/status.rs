//! Submission status and report types.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use transit_types::ResourceId;

use crate::client::ProvisionError;
use crate::directive::{DependencyKey, DirectiveId};

/// Outcome of submitting a single directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitStatus {
    /// The provisioning layer applied the directive.
    Applied { resource: ResourceId },
    /// The directive had already been applied by this executor.
    AlreadyPresent { resource: ResourceId },
    /// A tombstone withdrew a previously applied directive.
    Withdrawn,
    /// A tombstone targeted a directive this executor never applied.
    Ignored,
    /// The provisioning call failed; retry belongs to the caller.
    Failed { error: String },
    /// Some dependency was never satisfied in this submission.
    WaitingForDependency { missing: Vec<DependencyKey> },
}

impl SubmitStatus {
    /// Returns true if the directive's effect is in place (or intentionally absent).
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SubmitStatus::Applied { .. }
                | SubmitStatus::AlreadyPresent { .. }
                | SubmitStatus::Withdrawn
                | SubmitStatus::Ignored
        )
    }

    /// Returns true if resubmitting the same directive later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitStatus::Failed { .. } | SubmitStatus::WaitingForDependency { .. }
        )
    }

    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            SubmitStatus::Applied { resource } | SubmitStatus::AlreadyPresent { resource } => {
                Some(resource)
            }
            _ => None,
        }
    }
}

/// Per-directive outcome of one submission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmitReport {
    pub statuses: BTreeMap<DirectiveId, SubmitStatus>,
}

impl SubmitReport {
    pub fn record(&mut self, id: DirectiveId, status: SubmitStatus) {
        self.statuses.insert(id, status);
    }

    pub(crate) fn record_failure(&mut self, id: DirectiveId, error: &ProvisionError) {
        self.record(
            id,
            SubmitStatus::Failed {
                error: error.to_string(),
            },
        );
    }

    pub(crate) fn record_blocked(&mut self, id: DirectiveId, missing: BTreeSet<DependencyKey>) {
        self.record(
            id,
            SubmitStatus::WaitingForDependency {
                missing: missing.into_iter().collect(),
            },
        );
    }

    pub fn status(&self, id: &DirectiveId) -> Option<&SubmitStatus> {
        self.statuses.get(id)
    }

    /// Returns true if every directive succeeded.
    pub fn is_complete(&self) -> bool {
        self.statuses.values().all(SubmitStatus::is_success)
    }

    pub fn applied(&self) -> impl Iterator<Item = &DirectiveId> {
        self.statuses
            .iter()
            .filter(|(_, s)| matches!(s, SubmitStatus::Applied { .. }))
            .map(|(id, _)| id)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &DirectiveId> {
        self.statuses
            .iter()
            .filter(|(_, s)| s.is_success())
            .map(|(id, _)| id)
    }

    pub fn retryable(&self) -> impl Iterator<Item = &DirectiveId> {
        self.statuses
            .iter()
            .filter(|(_, s)| s.is_retryable())
            .map(|(id, _)| id)
    }

    pub fn merge(&mut self, other: SubmitReport) {
        self.statuses.extend(other.statuses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_types::GroupRef;

    fn resource(id: &str) -> ResourceId {
        ResourceId::new(id).unwrap()
    }

    #[test]
    fn test_status_classification() {
        assert!(SubmitStatus::Applied {
            resource: resource("rtb-hub")
        }
        .is_success());
        assert!(SubmitStatus::Ignored.is_success());
        assert!(!SubmitStatus::Failed {
            error: "boom".into()
        }
        .is_success());

        assert!(SubmitStatus::WaitingForDependency { missing: vec![] }.is_retryable());
        assert!(!SubmitStatus::Withdrawn.is_retryable());
    }

    #[test]
    fn test_report_completeness() {
        let mut report = SubmitReport::default();
        report.record(
            DirectiveId::new("hub-table"),
            SubmitStatus::Applied {
                resource: resource("rtb-hub"),
            },
        );
        assert!(report.is_complete());
        assert_eq!(report.applied().count(), 1);

        let mut missing = BTreeSet::new();
        missing.insert(DependencyKey::Table(GroupRef::Hub));
        report.record_blocked(DirectiveId::new("edge"), missing);
        assert!(!report.is_complete());
        assert_eq!(report.retryable().count(), 1);
        assert_eq!(report.succeeded().count(), 1);
    }
}
