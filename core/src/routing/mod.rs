//! Distance-vector routing
//!
//! - Table: destination → (next hop, distance), relaxed from advertisements
//! - Engine: per-packet decision (deliver, forward, flood, drop)

pub mod engine;
pub mod table;

pub use engine::{DropReason, ForwardDecision, ForwardingEngine, LocalDelivery};
pub use table::{RouteEntry, RoutingTable};
