//! Verification helpers for planned directives and provisioned objects

use thiserror::Error;
use transit_orch_common::{Action, Directive, InMemoryProvisioner, SubmitReport};

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected edge {attachment} -> {table} not planned")]
    MissingEdge { attachment: String, table: String },

    #[error("Unexpected edge {attachment} -> {table}")]
    UnexpectedEdge { attachment: String, table: String },

    #[error("Expected directive '{id}' not found")]
    MissingDirective { id: String },

    #[error("Expected static route to {cidr} in {table} not found")]
    MissingRoute { table: String, cidr: String },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Directive '{id}' did not succeed: {status}")]
    NotApplied { id: String, status: String },

    #[error("Expected object '{key}' not provisioned")]
    MissingObject { key: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verifier over a planned directive set
pub struct DirectiveVerifier<'a> {
    directives: &'a [Directive],
}

impl<'a> DirectiveVerifier<'a> {
    pub fn new(directives: &'a [Directive]) -> Self {
        Self { directives }
    }

    /// (attachment, table) of every propagation directive
    pub fn edges(&self) -> Vec<(String, String)> {
        self.directives
            .iter()
            .filter_map(|d| match &d.action {
                Action::Propagate {
                    attachment, table, ..
                } => Some((attachment.to_string(), table.to_string())),
                _ => None,
            })
            .collect()
    }

    fn has_edge(&self, attachment: &str, table: &str) -> bool {
        self.edges()
            .iter()
            .any(|(a, t)| a == attachment && t == table)
    }

    /// Verify that `attachment` is propagated into `table`
    pub fn assert_edge(&self, attachment: &str, table: &str) -> VerifyResult<()> {
        if self.has_edge(attachment, table) {
            Ok(())
        } else {
            Err(VerificationError::MissingEdge {
                attachment: attachment.to_string(),
                table: table.to_string(),
            })
        }
    }

    /// Verify that `attachment` is NOT propagated into `table`
    pub fn assert_no_edge(&self, attachment: &str, table: &str) -> VerifyResult<()> {
        if self.has_edge(attachment, table) {
            Err(VerificationError::UnexpectedEdge {
                attachment: attachment.to_string(),
                table: table.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn assert_edge_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.edges().len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: "edges".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_directive(&self, id: &str) -> VerifyResult<()> {
        if self.directives.iter().any(|d| d.id.as_str() == id) {
            Ok(())
        } else {
            Err(VerificationError::MissingDirective { id: id.to_string() })
        }
    }

    /// Verify a static route to `cidr` in the table with id `table`
    pub fn assert_route(&self, table: &str, cidr: &str) -> VerifyResult<()> {
        let found = self.directives.iter().any(|d| {
            matches!(&d.action, Action::StaticRoute { table_id, cidr: c, .. }
                if table_id.as_str() == table && c.to_string() == cidr)
        });
        if found {
            Ok(())
        } else {
            Err(VerificationError::MissingRoute {
                table: table.to_string(),
                cidr: cidr.to_string(),
            })
        }
    }

    pub fn assert_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.directives.len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: "directives".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// Verifier over a submission report
pub struct ReportVerifier<'a> {
    report: &'a SubmitReport,
}

impl<'a> ReportVerifier<'a> {
    pub fn new(report: &'a SubmitReport) -> Self {
        Self { report }
    }

    /// Verify that the directive succeeded (applied, present, withdrawn or ignored)
    pub fn assert_succeeded(&self, id: &str) -> VerifyResult<()> {
        let status = self
            .report
            .statuses
            .iter()
            .find(|(key, _)| key.as_str() == id)
            .map(|(_, status)| status);

        match status {
            None => Err(VerificationError::MissingDirective { id: id.to_string() }),
            Some(status) if status.is_success() => Ok(()),
            Some(status) => Err(VerificationError::NotApplied {
                id: id.to_string(),
                status: format!("{:?}", status),
            }),
        }
    }

    pub fn assert_complete(&self) -> VerifyResult<()> {
        match self.report.statuses.iter().find(|(_, s)| !s.is_success()) {
            None => Ok(()),
            Some((id, status)) => Err(VerificationError::NotApplied {
                id: id.to_string(),
                status: format!("{:?}", status),
            }),
        }
    }
}

/// Verifier over the objects held by an in-memory provisioner
pub struct ProvisionerVerifier<'a> {
    client: &'a InMemoryProvisioner,
}

impl<'a> ProvisionerVerifier<'a> {
    pub fn new(client: &'a InMemoryProvisioner) -> Self {
        Self { client }
    }

    /// Verify that an object created by the given call exists
    pub fn assert_object(&self, call_key: &str) -> VerifyResult<()> {
        if self.client.object_keys().iter().any(|k| k == call_key) {
            Ok(())
        } else {
            Err(VerificationError::MissingObject {
                key: call_key.to_string(),
            })
        }
    }

    pub fn assert_object_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.client.object_count();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: "objects".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
