// Transport module: radio contract and software radios

pub mod abstraction;
pub mod memory;
pub mod udp;

pub use abstraction::{PeerTable, RadioTransport, TransportError, MAX_PEERS};
pub use memory::{MemoryMedium, MemoryRadio};
pub use udp::UdpRadio;
