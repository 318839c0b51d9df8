//! Distance-vector routing table
//!
//! Every destination maps to the neighbor to hand packets to and the hop
//! count through it. The only write path is `relax`, which accepts a route
//! when the destination is new or the offered distance is strictly shorter.
//! Routes never expire: a vanished node keeps its last route until a shorter
//! one is learned.

use crate::packet::{MacAddress, Packet};
use std::collections::BTreeMap;

/// Where to send packets for one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: MacAddress,
    /// Hop count; 0 only for the local node
    pub distance: u8,
}

/// Routing table seeded with the local node at distance 0
#[derive(Debug, Clone)]
pub struct RoutingTable {
    local: MacAddress,
    routes: BTreeMap<MacAddress, RouteEntry>,
}

impl RoutingTable {
    pub fn new(local: MacAddress) -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(
            local,
            RouteEntry {
                next_hop: local,
                distance: 0,
            },
        );
        Self { local, routes }
    }

    pub fn local(&self) -> MacAddress {
        self.local
    }

    /// Insert or shorten the route to `destination`. Returns true if the table changed.
    pub fn relax(&mut self, destination: MacAddress, next_hop: MacAddress, distance: u8) -> bool {
        match self.routes.get_mut(&destination) {
            None => {
                self.routes.insert(destination, RouteEntry { next_hop, distance });
                true
            }
            Some(current) if distance < current.distance => {
                *current = RouteEntry { next_hop, distance };
                true
            }
            Some(_) => false,
        }
    }

    pub fn lookup(&self, destination: &MacAddress) -> Option<MacAddress> {
        self.routes.get(destination).map(|r| r.next_hop)
    }

    pub fn get(&self, destination: &MacAddress) -> Option<&RouteEntry> {
        self.routes.get(destination)
    }

    /// All routes ordered by destination, self entry included
    pub fn entries(&self) -> impl Iterator<Item = (&MacAddress, &RouteEntry)> {
        self.routes.iter()
    }

    /// Destinations reachable in one hop
    pub fn neighbors(&self) -> Vec<MacAddress> {
        self.routes
            .iter()
            .filter(|(_, r)| r.distance == 1)
            .map(|(dest, _)| *dest)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Never true in practice; the self entry is always present
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// One broadcast ROUTING packet per entry, sourced from the local node
    pub fn advertisements(&self) -> Vec<Packet> {
        self.routes
            .iter()
            .map(|(dest, route)| Packet::routing_advertisement(self.local, *dest, route.distance))
            .collect()
    }

    /// Learn from an advertisement `(destination, distance)` sent by `sender`.
    ///
    /// Returns the number of entries that changed, or `None` if the payload
    /// is too short to carry an advertisement.
    pub fn consume_advertisement(&mut self, sender: MacAddress, payload: &[u8]) -> Option<usize> {
        let destination = MacAddress::from_slice(payload)?;
        let distance = *payload.get(6)?;

        let mut changed = 0;
        if self.relax(destination, sender, distance.saturating_add(1)) {
            changed += 1;
        }
        if self.relax(sender, sender, 1) {
            changed += 1;
        }
        Some(changed)
    }
}
