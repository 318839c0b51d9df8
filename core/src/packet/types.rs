/// Typed header fields: packet type and control flags

use std::fmt;

/// Packet type carried in the first two header bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Connection-oriented payload (0x0001)
    Tcp,
    /// Datagram payload (0x0002)
    Udp,
    /// Control message (0x0003)
    Icmp,
    /// Distance-vector advertisement (0x0004)
    Routing,
    /// Any other wire value, kept so re-encoding is lossless
    Unknown(u16),
}

impl PacketType {
    /// Convert from the wire value
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => PacketType::Tcp,
            2 => PacketType::Udp,
            3 => PacketType::Icmp,
            4 => PacketType::Routing,
            other => PacketType::Unknown(other),
        }
    }

    /// Convert to the wire value
    pub fn as_u16(&self) -> u16 {
        match self {
            PacketType::Tcp => 1,
            PacketType::Udp => 2,
            PacketType::Icmp => 3,
            PacketType::Routing => 4,
            PacketType::Unknown(other) => *other,
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Tcp => write!(f, "TCP"),
            PacketType::Udp => write!(f, "UDP"),
            PacketType::Icmp => write!(f, "ICMP"),
            PacketType::Routing => write!(f, "ROUTING"),
            PacketType::Unknown(v) => write!(f, "UNKNOWN({})", v),
        }
    }
}

/// Control flag bitset (SYN/ACK/FIN/RST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketFlags(pub u8);

impl PacketFlags {
    pub const NONE: PacketFlags = PacketFlags(0x00);
    pub const SYN: PacketFlags = PacketFlags(0x01);
    pub const ACK: PacketFlags = PacketFlags(0x02);
    pub const FIN: PacketFlags = PacketFlags(0x04);
    pub const RST: PacketFlags = PacketFlags(0x08);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: PacketFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: PacketFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: PacketFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PacketFlags {
    type Output = PacketFlags;

    fn bitor(self, rhs: PacketFlags) -> PacketFlags {
        PacketFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for PacketFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (PacketFlags::SYN, "SYN"),
            (PacketFlags::ACK, "ACK"),
            (PacketFlags::FIN, "FIN"),
            (PacketFlags::RST, "RST"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_conversion() {
        assert_eq!(PacketType::Tcp.as_u16(), 1);
        assert_eq!(PacketType::Udp.as_u16(), 2);
        assert_eq!(PacketType::Icmp.as_u16(), 3);
        assert_eq!(PacketType::Routing.as_u16(), 4);

        assert_eq!(PacketType::from_u16(4), PacketType::Routing);
        assert_eq!(PacketType::from_u16(0x99), PacketType::Unknown(0x99));
        assert_eq!(PacketType::Unknown(0x99).as_u16(), 0x99);
    }

    #[test]
    fn test_flags_bitset() {
        let mut flags = PacketFlags::SYN | PacketFlags::ACK;
        assert!(flags.contains(PacketFlags::SYN));
        assert!(flags.contains(PacketFlags::ACK));
        assert!(!flags.contains(PacketFlags::FIN));

        flags.remove(PacketFlags::SYN);
        flags.insert(PacketFlags::RST);
        assert_eq!(flags.bits(), 0x0A);
        assert_eq!(flags.to_string(), "ACK|RST");
    }

    #[test]
    fn test_empty_flags_display_numeric() {
        assert_eq!(PacketFlags::NONE.to_string(), "0");
    }
}
