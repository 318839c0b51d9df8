//! Packet Protocol: fixed binary frame for radio mesh traffic
//!
//! This module provides:
//! - MacAddress: 6-byte node address, all-ones is broadcast
//! - PacketType / PacketFlags: typed header fields
//! - Packet: header + payload with the 16-bit additive checksum
//!
//! Frame layout (32-byte header, network byte order, then payload):
//! type(2) ttl(1) flags(1) src(6) dst(6) src_port(2) dst_port(2)
//! seq(4) ack(4) flags(1) ttl(1) checksum(2)

pub mod address;
pub mod frame;
pub mod types;

pub use address::MacAddress;
pub use frame::{Packet, DEFAULT_TTL, HEADER_SIZE, MAX_PAYLOAD_SIZE, MTU};
pub use types::{PacketFlags, PacketType};

use thiserror::Error;

/// Packet codec errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Frame too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Checksum mismatch: frame carries {carried:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { carried: u16, computed: u16 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
