//! Test infrastructure for the transit control plane
//!
//! Provides:
//! - Policy and attachment fixtures for common topologies
//! - Topology change scenarios (attach / detach sequences)
//! - Directive and provisioner verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
