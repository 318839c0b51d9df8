//! UDP radio emulation
//!
//! Lets several nodes run on one machine (or a LAN). Each node binds a UDP
//! socket; its configured neighbors stand in for the nodes within radio
//! range. A datagram carries the sender address followed by the frame:
//!
//! [6 bytes] sender address
//! [N bytes] frame

use super::abstraction::{PeerTable, RadioTransport, TransportError};
use crate::packet::{MacAddress, MTU};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use tracing::{debug, info};

const SENDER_PREFIX: usize = 6;

pub struct UdpRadio {
    address: MacAddress,
    socket: UdpSocket,
    neighbors: HashMap<MacAddress, SocketAddr>,
    peers: PeerTable,
    buf: Vec<u8>,
}

impl UdpRadio {
    /// Bind a non-blocking socket for node `address`
    pub fn bind(address: MacAddress, bind: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        info!("UDP radio for {} bound to {}", address, socket.local_addr()?);

        Ok(Self {
            address,
            socket,
            neighbors: HashMap::new(),
            peers: PeerTable::new(),
            buf: vec![0u8; SENDER_PREFIX + MTU + 1],
        })
    }

    /// Put a node "in range"
    pub fn add_neighbor(&mut self, address: MacAddress, socket: SocketAddr) {
        self.neighbors.insert(address, socket);
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn address(&self) -> MacAddress {
        self.address
    }

    fn transmit(&self, to: &SocketAddr, frame: &[u8]) -> Result<(), TransportError> {
        let mut datagram = Vec::with_capacity(SENDER_PREFIX + frame.len());
        datagram.extend_from_slice(self.address.as_bytes());
        datagram.extend_from_slice(frame);

        match self.socket.send_to(&datagram, to) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::Busy),
            Err(e) => Err(e.into()),
        }
    }
}

impl RadioTransport for UdpRadio {
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

        if dest.is_broadcast() {
            // Every neighbor gets a chance; report the first failure
            let mut first_error = None;
            for (neighbor, socket) in &self.neighbors {
                if let Err(e) = self.transmit(socket, frame) {
                    debug!("Broadcast to {} at {} failed: {}", neighbor, socket, e);
                    first_error.get_or_insert(e);
                }
            }
            return first_error.map_or(Ok(()), Err);
        }

        let socket = self
            .neighbors
            .get(dest)
            .ok_or(TransportError::PeerUnreachable(*dest))?;
        self.transmit(socket, frame)
    }

    fn receive(&mut self) -> Result<Option<(MacAddress, Vec<u8>)>, TransportError> {
        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let Some(sender) = MacAddress::from_slice(&self.buf[..len]) else {
                debug!("Ignoring {}-byte datagram from {}", len, from);
                continue;
            };
            if len - SENDER_PREFIX > MTU {
                debug!("Ignoring oversized frame from {}", sender);
                continue;
            }
            return Ok(Some((sender, self.buf[SENDER_PREFIX..len].to_vec())));
        }
    }

    fn add_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError> {
        self.peers.add(peer)
    }

    fn remove_peer(&mut self, peer: &MacAddress) -> Result<(), TransportError> {
        self.peers.remove(peer);
        Ok(())
    }
}
