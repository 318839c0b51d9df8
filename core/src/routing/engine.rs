//! Forwarding Engine: per-packet delivery decision
//!
//! Decision order for every received packet:
//! 1. **Integrity** (opt-in): drop if the carried checksum does not match
//! 2. **Duplicate**: drop if the payload fingerprint was seen recently
//! 3. **Local**: destination is us or broadcast, dispatch by packet type
//! 4. **TTL**: decrement, drop at zero
//! 5. **Forward**: unicast to the known next hop, or flood to broadcast
//!
//! The engine never touches the radio; it returns a `ForwardDecision` and the
//! caller performs the send.

use super::table::RoutingTable;
use crate::dedup::DedupCache;
use crate::packet::{MacAddress, Packet, PacketType};
use tracing::{debug, trace, warn};

/// What happened to a packet addressed to this node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalDelivery {
    /// Routing advertisement applied; `changed` entries were added or shortened
    Routing { changed: usize },
    /// TCP/UDP payload for the application layer
    Payload(PacketType),
    /// Type with no local handler (ICMP, unknown), or a malformed advertisement
    Ignored(PacketType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Duplicate,
    TtlExpired,
    ChecksumMismatch,
}

/// Outcome of processing one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardDecision {
    /// Packet was for us (or everyone) and has been dispatched
    Delivered(LocalDelivery),
    /// Send `packet` (ttl already decremented) to `next_hop`
    Forward { next_hop: MacAddress, packet: Packet },
    /// No route known; send `packet` (ttl already decremented) to broadcast
    Flood { packet: Packet },
    Dropped(DropReason),
}

/// Routing table plus duplicate window for one node
pub struct ForwardingEngine {
    local: MacAddress,
    routes: RoutingTable,
    seen: DedupCache,
    verify_checksums: bool,
}

impl ForwardingEngine {
    pub fn new(local: MacAddress) -> Self {
        Self::with_cache(local, DedupCache::new())
    }

    pub fn with_cache(local: MacAddress, seen: DedupCache) -> Self {
        Self {
            local,
            routes: RoutingTable::new(local),
            seen,
            verify_checksums: false,
        }
    }

    /// Drop packets whose carried checksum does not match their contents
    pub fn set_verify_checksums(&mut self, enabled: bool) {
        self.verify_checksums = enabled;
    }

    pub fn local(&self) -> MacAddress {
        self.local
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut RoutingTable {
        &mut self.routes
    }

    pub fn seen(&self) -> &DedupCache {
        &self.seen
    }

    /// Record the payload of a packet this node originates so its own flood
    /// is not processed again when a neighbor echoes it back.
    pub fn mark_originated(&mut self, packet: &Packet) {
        self.seen
            .contains_and_record(DedupCache::fingerprint(&packet.payload));
    }

    /// Dispatch a packet this node addressed to itself
    pub fn deliver_local(&mut self, packet: &Packet) -> LocalDelivery {
        self.dispatch_local(packet)
    }

    /// Central decision for every received packet
    pub fn process(&mut self, mut packet: Packet) -> ForwardDecision {
        if self.verify_checksums {
            if let Err(e) = packet.verify_checksum() {
                debug!("Dropping packet from {}: {}", packet.src, e);
                return ForwardDecision::Dropped(DropReason::ChecksumMismatch);
            }
        }

        let fingerprint = DedupCache::fingerprint(&packet.payload);
        if self.seen.contains_and_record(fingerprint) {
            trace!("Duplicate payload from {}, dropping", packet.src);
            return ForwardDecision::Dropped(DropReason::Duplicate);
        }

        if packet.dest == self.local || packet.dest.is_broadcast() {
            return ForwardDecision::Delivered(self.dispatch_local(&packet));
        }

        packet.ttl = packet.ttl.saturating_sub(1);
        if packet.ttl == 0 {
            debug!("TTL expired for packet {} -> {}", packet.src, packet.dest);
            return ForwardDecision::Dropped(DropReason::TtlExpired);
        }

        match self.routes.lookup(&packet.dest) {
            Some(next_hop) => {
                debug!("Forwarding {} -> {} via {}", packet.src, packet.dest, next_hop);
                ForwardDecision::Forward { next_hop, packet }
            }
            None => {
                debug!("No route to {}, flooding", packet.dest);
                ForwardDecision::Flood { packet }
            }
        }
    }

    fn dispatch_local(&mut self, packet: &Packet) -> LocalDelivery {
        match packet.packet_type {
            PacketType::Routing => {
                match self.routes.consume_advertisement(packet.src, &packet.payload) {
                    Some(changed) => {
                        if changed > 0 {
                            debug!("Learned {} route(s) from {}", changed, packet.src);
                        }
                        LocalDelivery::Routing { changed }
                    }
                    None => {
                        warn!(
                            "Malformed routing advertisement from {} ({} bytes)",
                            packet.src,
                            packet.payload.len()
                        );
                        LocalDelivery::Ignored(PacketType::Routing)
                    }
                }
            }
            PacketType::Tcp | PacketType::Udp => {
                debug!("Delivered {}", packet);
                LocalDelivery::Payload(packet.packet_type)
            }
            PacketType::Icmp | PacketType::Unknown(_) => {
                trace!("No handler for {}", packet.packet_type);
                LocalDelivery::Ignored(packet.packet_type)
            }
        }
    }
}
