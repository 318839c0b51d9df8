// AetherMesh Core: multi-hop mesh over short-range radio
//
// Every node routes: frames are decoded, de-duplicated, delivered locally or
// relayed one hop closer to their destination. Distance-vector routes are
// learned from neighbor advertisements.

pub mod dedup;
pub mod node;
pub mod packet;
pub mod routing;
pub mod signal;
pub mod transport;

use thiserror::Error;

pub use dedup::{DedupCache, Fingerprint};
pub use node::{NodeConfig, NodeController, NodeStats};
pub use packet::{MacAddress, Packet, PacketError, PacketFlags, PacketType};
pub use routing::{DropReason, ForwardDecision, ForwardingEngine, LocalDelivery, RoutingTable};
pub use signal::CrossContextSignal;
pub use transport::{MemoryMedium, RadioTransport, TransportError, UdpRadio};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
