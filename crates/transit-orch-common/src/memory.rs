//! In-memory provisioning client.
//!
//! Objects are keyed by their call arguments, so repeated calls return the
//! same identifier and create nothing new. Used by the `apply` command for dry
//! runs and by tests, with per-operation failure injection.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use transit_types::{AttachmentId, GroupRef, IpPrefix, LinkId, ResourceId, TableId};

use crate::client::{ProvisionError, ProvisionResult, ProvisioningClient};

#[derive(Debug, Default)]
struct State {
    /// call key -> created object
    objects: BTreeMap<String, ResourceId>,
    /// call keys that fail on their next invocation
    failures: BTreeSet<String>,
    calls: u64,
    created: u64,
    destroyed: u64,
}

/// Idempotent [`ProvisioningClient`] that keeps every object in memory.
#[derive(Debug, Default)]
pub struct InMemoryProvisioner {
    state: Mutex<State>,
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call with the given key fail with a transient error.
    ///
    /// Keys have the form `operation:arg[:arg...]`, e.g. `create_table:app`
    /// or `propagate:vpc-1:rtb-hub`.
    pub fn fail_next(&self, call_key: impl Into<String>) {
        self.state.lock().failures.insert(call_key.into());
    }

    pub fn contains(&self, resource: &ResourceId) -> bool {
        self.state.lock().objects.values().any(|r| r == resource)
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    pub fn created_count(&self) -> u64 {
        self.state.lock().created
    }

    pub fn destroyed_count(&self) -> u64 {
        self.state.lock().destroyed
    }

    /// Returns the call keys of every live object.
    pub fn object_keys(&self) -> Vec<String> {
        self.state.lock().objects.keys().cloned().collect()
    }

    fn upsert(&self, call_key: String, resource: impl FnOnce() -> String) -> ProvisionResult<ResourceId> {
        let mut state = self.state.lock();
        state.calls += 1;

        if state.failures.remove(&call_key) {
            let operation = call_key.split(':').next().unwrap_or_default().to_string();
            return Err(ProvisionError::transient(operation, format!("injected failure for {}", call_key)));
        }

        if let Some(existing) = state.objects.get(&call_key) {
            debug!("{} already exists as {}", call_key, existing);
            return Ok(existing.clone());
        }

        let id = ResourceId::new(resource())
            .map_err(|e| ProvisionError::rejected(call_key.clone(), e.to_string()))?;
        state.objects.insert(call_key, id.clone());
        state.created += 1;
        Ok(id)
    }
}

#[async_trait]
impl ProvisioningClient for InMemoryProvisioner {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn create_table(&self, group: &GroupRef) -> ProvisionResult<TableId> {
        self.upsert(format!("create_table:{}", group), || format!("rtb-{}", group))
            .map(TableId::from)
    }

    async fn associate(
        &self,
        attachment: &AttachmentId,
        table: &TableId,
    ) -> ProvisionResult<ResourceId> {
        self.upsert(format!("associate:{}:{}", attachment, table), || {
            format!("assoc-{}-{}", attachment, table)
        })
    }

    async fn propagate(
        &self,
        attachment: &AttachmentId,
        table: &TableId,
    ) -> ProvisionResult<ResourceId> {
        self.upsert(format!("propagate:{}:{}", attachment, table), || {
            format!("prop-{}-{}", attachment, table)
        })
    }

    async fn create_static_route(
        &self,
        table: &TableId,
        cidr: &IpPrefix,
        via: &AttachmentId,
    ) -> ProvisionResult<ResourceId> {
        self.upsert(format!("create_static_route:{}:{}:{}", table, cidr, via), || {
            format!("route-{}-{}", table, cidr.to_string().replace('/', "_"))
        })
    }

    async fn create_peering(
        &self,
        link: &LinkId,
        local_region: &str,
        remote_region: &str,
    ) -> ProvisionResult<ResourceId> {
        self.upsert(
            format!("create_peering:{}:{}:{}", link, local_region, remote_region),
            || format!("pcx-{}", link),
        )
    }

    async fn destroy(&self, resource: &ResourceId) -> ProvisionResult<()> {
        let mut state = self.state.lock();
        state.calls += 1;

        let key = state
            .objects
            .iter()
            .find(|(_, r)| *r == resource)
            .map(|(k, _)| k.clone());
        if let Some(key) = key {
            state.objects.remove(&key);
            state.destroyed += 1;
        }
        Ok(())
    }
}
