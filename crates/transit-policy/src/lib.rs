//! Routing policy for the transit control plane.
//!
//! This crate holds everything a caller supplies to the planner:
//!
//! - [`RoutingPolicy`]: routing groups, allow-lists and the isolation flag
//! - [`AttachmentSpec`]: endpoints to bind to groups, with owned prefixes
//! - [`PeeringConfig`]: cross-region links between two domains
//! - [`RoutingError`]: the validation error taxonomy
//!
//! Documents are YAML or JSON, selected by file extension.

pub mod error;
pub mod format;
pub mod inventory;
pub mod peering;
pub mod policy;

pub use error::{RoutingError, RoutingResult};
pub use format::{load_document, save_document, DocumentFormat};
pub use inventory::AttachmentSpec;
pub use peering::{PeeringConfig, PeeringDirection, PeeringSide};
pub use policy::{parse_allow_list, GroupDeclaration, GroupPolicy, HubPolicy, RoutingPolicy};
