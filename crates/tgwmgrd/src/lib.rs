//! Transit gateway routing manager
//!
//! Plans the forwarding-table entries of a hub-and-spoke transit network:
//! propagation edges for every attachment according to its routing group,
//! and static routes reproducing reachability across peering links.

mod model;
mod peering;
mod planner;
mod registrar;
mod tables;
mod tgw_mgr;
mod types;

pub use model::{DomainArena, RoutingDomainModel};
pub use peering::{
    route_directive_id, DomainTables, PeeringLink, PeeringPlan, PeeringRouteSynthesizer,
};
pub use planner::ReachabilityPlanner;
pub use registrar::AttachmentRegistrar;
pub use tables::*;
pub use tgw_mgr::TgwMgr;
pub use types::*;
