//! Provisioning client boundary.

use async_trait::async_trait;
use thiserror::Error;
use transit_types::{AttachmentId, GroupRef, IpPrefix, LinkId, ResourceId, TableId};

/// Result type alias for provisioning calls.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors reported by the provisioning layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// The remote call failed; the same call may succeed later.
    #[error("Provisioning call {operation} failed: {message}")]
    Transient { operation: String, message: String },

    /// The remote service rejected the call outright.
    #[error("Provisioning call {operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    /// A directive referenced an object this client never produced.
    #[error("Unresolved reference: {0}")]
    Unresolved(String),
}

impl ProvisionError {
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProvisionError::Transient { .. })
    }
}

/// The capability that creates and destroys transit routing objects.
///
/// Every operation must be idempotent: calling it twice with identical
/// arguments returns the same identifier and creates nothing new. The
/// returned identifiers are stable and usable as dependency keys by later
/// calls.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Returns the client name (for logging).
    fn name(&self) -> &str;

    /// Creates the forwarding table of a routing group.
    async fn create_table(&self, group: &GroupRef) -> ProvisionResult<TableId>;

    /// Binds an attachment to a table.
    async fn associate(
        &self,
        attachment: &AttachmentId,
        table: &TableId,
    ) -> ProvisionResult<ResourceId>;

    /// Makes an attachment's routes visible in a table.
    async fn propagate(
        &self,
        attachment: &AttachmentId,
        table: &TableId,
    ) -> ProvisionResult<ResourceId>;

    /// Installs a static route to `cidr` through `via`.
    async fn create_static_route(
        &self,
        table: &TableId,
        cidr: &IpPrefix,
        via: &AttachmentId,
    ) -> ProvisionResult<ResourceId>;

    /// Requests and accepts a cross-region peering link.
    async fn create_peering(
        &self,
        link: &LinkId,
        local_region: &str,
        remote_region: &str,
    ) -> ProvisionResult<ResourceId>;

    /// Destroys a previously created object. Destroying an absent object is not an error.
    async fn destroy(&self, resource: &ResourceId) -> ProvisionResult<()>;
}
