/// 6-byte radio address

use super::PacketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node address on the radio medium.
///
/// Displays as 12 lowercase hex digits with no separators, which is the form
/// the console prints and the visualizer parses back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Reserved broadcast address; permanently registered on every radio
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Read an address from the first 6 bytes of `data`
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = data.get(..6)?.try_into().ok()?;
        Some(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for MacAddress {
    type Err = PacketError;

    /// Accepts `aabbccddee01`, `AA:BB:CC:DD:EE:01` and `aa-bb-cc-dd-ee-01`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();

        let decoded =
            hex::decode(&compact).map_err(|_| PacketError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; 6] = decoded
            .try_into()
            .map_err(|_| PacketError::InvalidAddress(s.to_string()))?;
        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = PacketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(addr: MacAddress) -> Self {
        addr.to_string()
    }
}
