//! Common provisioning abstractions for the transit control plane.
//!
//! This crate provides the types shared by every planner and executor:
//!
//! - [`Directive`]: A single idempotent provisioning call with dependency keys
//! - [`ProvisioningClient`]: The boundary to whatever creates routing objects
//! - [`DirectiveExecutor`]: Dependency-ordered submission of directive sets
//! - [`Registry`]: Ordered map that prevents auto-vivification bugs
//! - [`SubmitStatus`]: Per-directive submission outcome
//!
//! # Architecture
//!
//! Planning and provisioning are separate steps:
//!
//! 1. Policy changes are applied to an in-memory routing model
//! 2. Planners derive the directives needed for the change
//! 3. The executor orders directives by their dependency keys
//! 4. Each wave of ready directives is submitted to the client concurrently
//! 5. The report records what was applied and what is still waiting
//!
//! # Example
//!
//! ```ignore
//! use transit_orch_common::{DirectiveExecutor, InMemoryProvisioner};
//!
//! let client = InMemoryProvisioner::new();
//! let mut executor = DirectiveExecutor::new();
//!
//! let report = executor.submit(&client, &plan.directives).await;
//! for id in report.retryable() {
//!     tracing::warn!("{} needs another submission", id);
//! }
//! ```

mod client;
mod dependency;
mod directive;
mod executor;
mod memory;
mod registry;
mod status;

pub use client::{ProvisionError, ProvisionResult, ProvisioningClient};
pub use dependency::{DependencyQueue, PendingEntry};
pub use directive::{Action, DependencyKey, Directive, DirectiveId};
pub use executor::DirectiveExecutor;
pub use memory::InMemoryProvisioner;
pub use registry::{Registry, RegistryError};
pub use status::{SubmitReport, SubmitStatus};
