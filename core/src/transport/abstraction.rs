//! Radio transport contract
//!
//! Frames are opaque byte strings addressed to 6-byte peers. Receiving never
//! blocks. Unicast sends need the destination in the radio's peer table; the
//! broadcast address is always registered.

use crate::packet::{MacAddress, MTU};
use thiserror::Error;

/// Peer table size of the reference radio
pub const MAX_PEERS: usize = 20;

/// Errors that can occur in the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Peer not registered: {0}")]
    PeerNotRegistered(MacAddress),

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(MacAddress),

    #[error("Peer table full ({0} peers)")]
    PeerTableFull(usize),

    #[error("Frame too large: {len} bytes (mtu {mtu})")]
    FrameTooLarge { len: usize, mtu: usize },

    #[error("Transport busy")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Send/receive raw frames over the radio
pub trait RadioTransport {
    /// Queue `frame` for `dest`. Unicast destinations must be registered.
    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), TransportError>;

    /// Return one pending frame and its sender, or `None` without waiting
    fn receive(&mut self) -> Result<Option<(MacAddress, Vec<u8>)>, TransportError>;

    /// Register a unicast peer. Registering an existing peer is a no-op.
    fn add_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError>;

    /// Deregister a unicast peer. The broadcast address cannot be removed.
    fn remove_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError>;

    /// Largest frame accepted by `send`
    fn mtu(&self) -> usize {
        MTU
    }
}

/// Peer table shared by the software radios
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: Vec<MacAddress>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, peer: &MacAddress) -> bool {
        peer.is_broadcast() || self.peers.contains(peer)
    }

    pub fn add(&mut self, peer: &MacAddress) -> Result<(), TransportError> {
        if self.contains(peer) {
            return Ok(());
        }
        if self.peers.len() >= MAX_PEERS {
            return Err(TransportError::PeerTableFull(MAX_PEERS));
        }
        self.peers.push(*peer);
        Ok(())
    }

    pub fn remove(&mut self, peer: &MacAddress) {
        self.peers.retain(|p| p != peer);
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
