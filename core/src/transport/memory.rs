//! In-process radio medium for tests and simulation
//!
//! Nodes attach to a shared `MemoryMedium` and only hear each other when a
//! link exists between them, which makes multi-hop topologies (A–B–C with A
//! and C out of range) easy to build.

use super::abstraction::{PeerTable, RadioTransport, TransportError};
use crate::packet::{MacAddress, MTU};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MediumState {
    inboxes: HashMap<MacAddress, VecDeque<(MacAddress, Vec<u8>)>>,
    links: HashSet<(MacAddress, MacAddress)>,
}

impl MediumState {
    fn linked(&self, a: &MacAddress, b: &MacAddress) -> bool {
        self.links.contains(&(*a, *b))
    }
}

/// Shared medium; cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    state: Arc<Mutex<MediumState>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node and return its radio
    pub fn attach(&self, address: MacAddress) -> MemoryRadio {
        self.state.lock().inboxes.entry(address).or_default();
        MemoryRadio {
            address,
            medium: self.clone(),
            peers: PeerTable::new(),
        }
    }

    /// Put `a` and `b` in radio range of each other
    pub fn link(&self, a: MacAddress, b: MacAddress) {
        let mut state = self.state.lock();
        state.links.insert((a, b));
        state.links.insert((b, a));
    }

    pub fn unlink(&self, a: MacAddress, b: MacAddress) {
        let mut state = self.state.lock();
        state.links.remove(&(a, b));
        state.links.remove(&(b, a));
    }

    /// Frames waiting for `address`
    pub fn pending(&self, address: &MacAddress) -> usize {
        self.state
            .lock()
            .inboxes
            .get(address)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Inject a frame as if `from` had transmitted it to `to`, ignoring links
    pub fn inject(&self, from: MacAddress, to: MacAddress, frame: Vec<u8>) {
        self.state
            .lock()
            .inboxes
            .entry(to)
            .or_default()
            .push_back((from, frame));
    }
}

/// One node's view of a `MemoryMedium`
#[derive(Debug)]
pub struct MemoryRadio {
    address: MacAddress,
    medium: MemoryMedium,
    peers: PeerTable,
}

impl MemoryRadio {
    pub fn address(&self) -> MacAddress {
        self.address
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }
}

impl RadioTransport for MemoryRadio {
    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > MTU {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                mtu: MTU,
            });
        }
        if !self.peers.contains(dest) {
            return Err(TransportError::PeerNotRegistered(*dest));
        }

        let mut state = self.medium.state.lock();
        if dest.is_broadcast() {
            let hearers: Vec<MacAddress> = state
                .inboxes
                .keys()
                .filter(|node| **node != self.address && state.linked(&self.address, node))
                .copied()
                .collect();
            for node in hearers {
                if let Some(inbox) = state.inboxes.get_mut(&node) {
                    inbox.push_back((self.address, frame.to_vec()));
                }
            }
            return Ok(());
        }

        if !state.linked(&self.address, dest) {
            return Err(TransportError::PeerUnreachable(*dest));
        }
        match state.inboxes.get_mut(dest) {
            Some(inbox) => {
                inbox.push_back((self.address, frame.to_vec()));
                Ok(())
            }
            None => Err(TransportError::PeerUnreachable(*dest)),
        }
    }

    fn receive(&mut self) -> Result<Option<(MacAddress, Vec<u8>)>, TransportError> {
        Ok(self
            .medium
            .state
            .lock()
            .inboxes
            .get_mut(&self.address)
            .and_then(|q| q.pop_front()))
    }

    fn add_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError> {
        self.peers.add(peer)
    }

    fn remove_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError> {
        self.peers.remove(peer);
        Ok(())
    }
}
