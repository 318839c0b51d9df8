//! Node Controller: one mesh node and its cooperative tasks
//!
//! The controller owns all node state (identity, routing table, duplicate
//! window, paired peers) and the radio. `run_until` multiplexes three tasks
//! on the calling task with `tokio::select!`:
//! - Intake: every intake tick, poll the radio once and process the frame
//! - Advertisement: every advertisement interval, broadcast the routing table
//! - Console (optional): execute one command per line read off-thread,
//!   including `send` to originate traffic
//!
//! State only changes inside a branch handler and no handler awaits, so the
//! tasks never observe each other mid-update and no locks are needed.

pub mod config;
pub mod console;

pub use config::NodeConfig;
pub use console::{Command, Console, LineResult, PROMPT};

use crate::dedup::DedupCache;
use crate::packet::{MacAddress, Packet, PacketType};
use crate::routing::{DropReason, ForwardDecision, ForwardingEngine, LocalDelivery, RoutingTable};
use crate::transport::RadioTransport;
use crate::MeshError;
use std::collections::HashSet;
use std::future::Future;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Counters for everything the node has done since startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub frames_received: u64,
    pub decode_errors: u64,
    pub delivered: u64,
    pub forwarded: u64,
    pub flooded: u64,
    pub dropped_duplicate: u64,
    pub dropped_ttl: u64,
    pub dropped_checksum: u64,
    pub advertisements_sent: u64,
    pub send_failures: u64,
}

/// Everything a node knows; owned by exactly one `NodeController`
pub struct NodeState {
    engine: ForwardingEngine,
    /// Unicast peers currently registered with the radio
    paired: HashSet<MacAddress>,
}

impl NodeState {
    pub fn new(local: MacAddress, config: &NodeConfig) -> Self {
        let mut engine =
            ForwardingEngine::with_cache(local, DedupCache::with_capacity(config.dedup_capacity));
        engine.set_verify_checksums(config.verify_checksums);
        Self {
            engine,
            paired: HashSet::new(),
        }
    }

    pub fn local(&self) -> MacAddress {
        self.engine.local()
    }

    pub fn routes(&self) -> &RoutingTable {
        self.engine.routes()
    }

    pub fn seen(&self) -> &DedupCache {
        self.engine.seen()
    }

    pub fn paired(&self) -> &HashSet<MacAddress> {
        &self.paired
    }
}

pub struct NodeController<R: RadioTransport> {
    state: NodeState,
    radio: R,
    config: NodeConfig,
    stats: NodeStats,
}

impl<R: RadioTransport> NodeController<R> {
    pub fn new(local: MacAddress, radio: R, config: NodeConfig) -> Self {
        Self {
            state: NodeState::new(local, &config),
            radio,
            config,
            stats: NodeStats::default(),
        }
    }

    pub fn local(&self) -> MacAddress {
        self.state.local()
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn routes(&self) -> &RoutingTable {
        self.state.routes()
    }

    /// Direct table access, for seeding static routes
    pub fn routes_mut(&mut self) -> &mut RoutingTable {
        self.state.engine.routes_mut()
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Intake step: take at most one frame off the radio and process it
    pub fn poll_once(&mut self) -> Option<ForwardDecision> {
        match self.radio.receive() {
            Ok(Some((sender, frame))) => self.handle_frame(sender, &frame),
            Ok(None) => None,
            Err(e) => {
                warn!("Radio receive failed: {}", e);
                None
            }
        }
    }

    /// Decode and process one raw frame heard from `sender`
    pub fn handle_frame(&mut self, sender: MacAddress, frame: &[u8]) -> Option<ForwardDecision> {
        self.stats.frames_received += 1;

        let packet = match Packet::from_bytes(frame) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("Discarding frame from {}: {}", sender, e);
                return None;
            }
        };

        let decision = self.state.engine.process(packet);
        self.apply(&decision);
        Some(decision)
    }

    /// Broadcast one ROUTING packet per routing table entry.
    /// Returns how many were sent.
    pub fn advertise(&mut self) -> usize {
        let mut sent = 0;
        for mut packet in self.state.routes().advertisements() {
            packet.ttl = self.config.default_ttl;
            match self.transmit(MacAddress::BROADCAST, &mut packet) {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.stats.send_failures += 1;
                    warn!("Routing advertisement failed: {}", e);
                }
            }
        }
        self.stats.advertisements_sent += sent as u64;
        debug!("Advertised {} route(s)", sent);
        sent
    }

    /// Originate a packet from this node.
    ///
    /// Broadcast goes straight out; other destinations use the known next hop
    /// or fall back to a flood. The payload is recorded as seen so echoes of
    /// our own packet are dropped.
    pub fn send_data(
        &mut self,
        dest: MacAddress,
        packet_type: PacketType,
        payload: Vec<u8>,
    ) -> Result<(), MeshError> {
        let mut packet = Packet::new(packet_type, self.local(), dest, payload);
        packet.ttl = self.config.default_ttl;
        // Validate size before recording the fingerprint
        packet.compute_checksum()?;
        self.state.engine.mark_originated(&packet);

        if dest == self.local() {
            let delivery = self.state.engine.deliver_local(&packet);
            self.stats.delivered += 1;
            debug!("Loopback delivery: {:?}", delivery);
            return Ok(());
        }

        let next_hop = if dest.is_broadcast() {
            MacAddress::BROADCAST
        } else {
            self.state
                .routes()
                .lookup(&dest)
                .unwrap_or(MacAddress::BROADCAST)
        };

        self.transmit(next_hop, &mut packet).map_err(|e| {
            self.stats.send_failures += 1;
            e
        })
    }

    /// Reply lines for one read-only console command
    pub fn execute_command(&self, line: &str) -> Vec<String> {
        Command::parse(line).execute(self.state.routes())
    }

    /// Reply lines for one console line; `send` originates a UDP packet
    pub fn handle_console_line(&mut self, line: &str) -> Vec<String> {
        match Command::parse(line) {
            Command::Send { dest, text } => {
                let len = text.len();
                match self.send_data(dest, PacketType::Udp, text.into_bytes()) {
                    Ok(()) => vec![format!("(cmd: send) {} bytes to {}", len, dest)],
                    Err(e) => {
                        warn!("Console send to {} failed: {}", dest, e);
                        Vec::new()
                    }
                }
            }
            command => command.execute(self.state.routes()),
        }
    }

    /// Run intake, advertisement and (optionally) console until `shutdown`
    /// completes, then hand the controller back.
    pub async fn run_until<S>(mut self, mut console: Option<Console>, shutdown: S) -> Self
    where
        S: Future<Output = ()>,
    {
        info!("Node started");
        info!("MAC address: {}", self.local());

        let mut intake = interval(self.config.intake_tick());
        intake.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut adverts = interval(self.config.advertise_interval());
        adverts.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Node stopping");
                    break;
                }
                _ = intake.tick() => {
                    self.poll_once();
                }
                _ = adverts.tick() => {
                    self.advertise();
                }
                line = next_console_line(&mut console) => {
                    match line {
                        Ok(Some(line)) => {
                            for reply in self.handle_console_line(&line) {
                                println!("{}", reply);
                            }
                        }
                        Ok(None) => {
                            info!("Console input closed");
                            console = None;
                        }
                        Err(e) => {
                            warn!("Console read failed, disabling console: {}", e);
                            console = None;
                        }
                    }
                }
            }
        }

        self
    }

    /// Run forever
    pub async fn run(self, console: Option<Console>) {
        self.run_until(console, std::future::pending()).await;
    }

    fn apply(&mut self, decision: &ForwardDecision) {
        match decision {
            ForwardDecision::Delivered(delivery) => {
                self.stats.delivered += 1;
                if let LocalDelivery::Payload(packet_type) = delivery {
                    debug!("{} payload handed to application layer", packet_type);
                }
            }
            ForwardDecision::Forward { next_hop, packet } => {
                let mut packet = packet.clone();
                match self.transmit(*next_hop, &mut packet) {
                    Ok(()) => self.stats.forwarded += 1,
                    Err(e) => {
                        self.stats.send_failures += 1;
                        warn!("Forward to {} failed: {}", next_hop, e);
                    }
                }
            }
            ForwardDecision::Flood { packet } => {
                let mut packet = packet.clone();
                match self.transmit(MacAddress::BROADCAST, &mut packet) {
                    Ok(()) => self.stats.flooded += 1,
                    Err(e) => {
                        self.stats.send_failures += 1;
                        warn!("Flood failed: {}", e);
                    }
                }
            }
            ForwardDecision::Dropped(reason) => match reason {
                DropReason::Duplicate => self.stats.dropped_duplicate += 1,
                DropReason::TtlExpired => self.stats.dropped_ttl += 1,
                DropReason::ChecksumMismatch => self.stats.dropped_checksum += 1,
            },
        }
    }

    /// Encode and send; unicast destinations are paired only for the send
    fn transmit(&mut self, dest: MacAddress, packet: &mut Packet) -> Result<(), MeshError> {
        let frame = packet.to_bytes()?;

        if dest.is_broadcast() {
            self.radio.send(&dest, &frame)?;
            return Ok(());
        }

        self.radio.add_peer(&dest)?;
        self.state.paired.insert(dest);

        let result = self.radio.send(&dest, &frame);

        match self.radio.remove_peer(&dest) {
            Ok(()) => {
                self.state.paired.remove(&dest);
            }
            Err(e) => warn!("Failed to unpair {}: {}", dest, e),
        }

        result.map_err(MeshError::from)
    }
}

async fn next_console_line(console: &mut Option<Console>) -> LineResult {
    match console {
        Some(console) => console.next_line().await,
        None => std::future::pending().await,
    }
}
