/// Packet: fixed header framing with a 16-bit additive checksum

use super::{MacAddress, PacketError, PacketFlags, PacketType};
use std::fmt;

/// Largest frame the reference radio accepts
pub const MTU: usize = 250;

/// type(2) ttl(1) flags(1) src(6) dst(6) ports(2+2) seq(4) ack(4) flags(1) ttl(1) checksum(2)
pub const HEADER_SIZE: usize = 32;

/// Largest payload that still fits one radio frame
pub const MAX_PAYLOAD_SIZE: usize = MTU - HEADER_SIZE;

/// Hop budget for packets originated by a node
pub const DEFAULT_TTL: u8 = 64;

const CHECKSUM_OFFSET: usize = HEADER_SIZE - 2;

/// A mesh packet as carried on the radio
///
/// The header repeats `flags` and `ttl` just before the checksum. Both copies
/// are written on encode; decoding reads only the leading ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    /// Remaining hop budget
    pub ttl: u8,
    pub flags: PacketFlags,
    pub src: MacAddress,
    /// `MacAddress::BROADCAST` addresses every node in range
    pub dest: MacAddress,
    pub src_port: u16,
    pub dest_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub payload: Vec<u8>,
    /// Checksum as carried on the wire; refreshed by `to_bytes`, untouched by `from_bytes`
    pub checksum: u16,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            packet_type: PacketType::Udp,
            ttl: DEFAULT_TTL,
            flags: PacketFlags::NONE,
            src: MacAddress([0; 6]),
            dest: MacAddress([0; 6]),
            src_port: 0,
            dest_port: 0,
            seq: 0,
            ack: 0,
            payload: Vec::new(),
            checksum: 0,
        }
    }
}

impl Packet {
    /// Create a packet with default ttl and zeroed ports/sequence numbers
    pub fn new(
        packet_type: PacketType,
        src: MacAddress,
        dest: MacAddress,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            packet_type,
            src,
            dest,
            payload,
            ..Default::default()
        }
    }

    /// Routing advertisement: `destination(6) ++ distance(1)`, always broadcast
    pub fn routing_advertisement(src: MacAddress, destination: MacAddress, distance: u8) -> Self {
        let mut payload = Vec::with_capacity(7);
        payload.extend_from_slice(destination.as_bytes());
        payload.push(distance);
        Self::new(PacketType::Routing, src, MacAddress::BROADCAST, payload)
    }

    /// Serialize the packet and stamp the computed checksum into it
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, PacketError> {
        let mut buf = self.encode_unchecked()?;
        let checksum = checksum16(&buf);
        buf[CHECKSUM_OFFSET..HEADER_SIZE].copy_from_slice(&checksum.to_be_bytes());
        self.checksum = checksum;
        Ok(buf)
    }

    /// Serialize without mutating; the embedded checksum is still computed
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        self.clone().to_bytes()
    }

    /// Deserialize a frame
    ///
    /// The checksum is read but not verified; integrity is left to the radio
    /// layer. Use `verify_checksum` when that trust is not wanted.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < HEADER_SIZE {
            return Err(PacketError::TooShort {
                need: HEADER_SIZE,
                got: data.len(),
            });
        }

        let u16_at = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
        let u32_at = |i: usize| u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
        let mac_at = |i: usize| {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&data[i..i + 6]);
            MacAddress(bytes)
        };

        Ok(Packet {
            packet_type: PacketType::from_u16(u16_at(0)),
            ttl: data[2],
            flags: PacketFlags(data[3]),
            src: mac_at(4),
            dest: mac_at(10),
            src_port: u16_at(16),
            dest_port: u16_at(18),
            seq: u32_at(20),
            ack: u32_at(24),
            // 28 and 29 repeat flags/ttl
            checksum: u16_at(CHECKSUM_OFFSET),
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }

    /// Checksum this packet would carry if encoded now
    pub fn compute_checksum(&self) -> Result<u16, PacketError> {
        Ok(checksum16(&self.encode_unchecked()?))
    }

    /// Compare the carried checksum against a fresh computation
    pub fn verify_checksum(&self) -> Result<(), PacketError> {
        let computed = self.compute_checksum()?;
        if computed != self.checksum {
            return Err(PacketError::ChecksumMismatch {
                carried: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Header with a zeroed checksum field, followed by the payload
    fn encode_unchecked(&self) -> Result<Vec<u8>, PacketError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge {
                len: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.packet_type.as_u16().to_be_bytes());
        buf.push(self.ttl);
        buf.push(self.flags.bits());
        buf.extend_from_slice(self.src.as_bytes());
        buf.extend_from_slice(self.dest.as_bytes());
        buf.extend_from_slice(&self.src_port.to_be_bytes());
        buf.extend_from_slice(&self.dest_port.to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.ack.to_be_bytes());
        buf.push(self.flags.bits());
        buf.push(self.ttl);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }
}

/// Sum of all bytes, modulo 65536
fn checksum16(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(*b as u16))
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet(type={}, src={}:{}, dest={}:{}, seq={}, ack={}, flags={}, ttl={}, payload_length={})",
            self.packet_type,
            self.src,
            self.src_port,
            self.dest,
            self.dest_port,
            self.seq,
            self.ack,
            self.flags,
            self.ttl,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_test_packet() -> Packet {
        Packet {
            packet_type: PacketType::Tcp,
            ttl: 12,
            flags: PacketFlags::SYN,
            src: MacAddress([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]),
            dest: MacAddress([0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]),
            src_port: 12345,
            dest_port: 80,
            seq: 1,
            ack: 0,
            payload: b"Hello, AetherMesh!".to_vec(),
            checksum: 0,
        }
    }

    #[test]
    fn test_header_size_and_payload_ceiling() {
        assert_eq!(HEADER_SIZE, 32);
        assert_eq!(MAX_PAYLOAD_SIZE, 218);
    }

    #[test]
    fn test_packet_layout() {
        let mut packet = make_test_packet();
        let bytes = packet.to_bytes().unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + packet.payload.len());
        assert_eq!(&bytes[0..2], &[0x00, 0x01]);
        assert_eq!(bytes[2], 12);
        assert_eq!(bytes[3], 0x01);
        assert_eq!(&bytes[4..10], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&bytes[10..16], &[0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
        assert_eq!(&bytes[16..18], &12345u16.to_be_bytes());
        assert_eq!(&bytes[18..20], &80u16.to_be_bytes());
        assert_eq!(&bytes[20..24], &1u32.to_be_bytes());
        assert_eq!(&bytes[24..28], &0u32.to_be_bytes());
        // Trailing copies of flags and ttl
        assert_eq!(bytes[28], 0x01);
        assert_eq!(bytes[29], 12);
        assert_eq!(&bytes[HEADER_SIZE..], b"Hello, AetherMesh!");
    }

    #[test]
    fn test_checksum_is_byte_sum_with_zeroed_field() {
        let mut packet = make_test_packet();
        let bytes = packet.to_bytes().unwrap();

        let mut zeroed = bytes.clone();
        zeroed[30] = 0;
        zeroed[31] = 0;
        let expected = zeroed.iter().map(|b| *b as u32).sum::<u32>() % 65536;

        assert_eq!(packet.checksum as u32, expected);
        assert_eq!(u16::from_be_bytes([bytes[30], bytes[31]]) as u32, expected);
    }

    #[test]
    fn test_checksum16_wraps_modulo_65536() {
        // 300 * 255 = 76500 = 65536 + 10964
        let bytes = vec![0xFF; 300];
        assert_eq!(checksum16(&bytes), 10964);
    }

    #[test]
    fn test_checksum_deterministic() {
        let packet = make_test_packet();
        let bytes1 = packet.encode().unwrap();
        let bytes2 = packet.encode().unwrap();

        assert_eq!(bytes1, bytes2);
        assert_eq!(packet.compute_checksum().unwrap(), packet.compute_checksum().unwrap());
    }

    #[test]
    fn test_decode_too_short() {
        let data = [0u8; HEADER_SIZE - 1];
        match Packet::from_bytes(&data) {
            Err(PacketError::TooShort { need, got }) => {
                assert_eq!(need, HEADER_SIZE);
                assert_eq!(got, HEADER_SIZE - 1);
            }
            other => panic!("Expected TooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_header_only() {
        let mut packet = make_test_packet();
        packet.payload.clear();
        let bytes = packet.to_bytes().unwrap();

        let restored = Packet::from_bytes(&bytes).unwrap();
        assert!(restored.payload.is_empty());
        assert_eq!(restored, packet);
    }

    #[test]
    fn test_payload_too_large() {
        let mut packet = make_test_packet();
        packet.payload = vec![0; MAX_PAYLOAD_SIZE + 1];

        assert_eq!(
            packet.to_bytes(),
            Err(PacketError::PayloadTooLarge {
                len: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE
            })
        );
    }

    #[test]
    fn test_decode_does_not_verify_checksum() {
        let mut packet = make_test_packet();
        let mut bytes = packet.to_bytes().unwrap();
        bytes[HEADER_SIZE] ^= 0xFF;

        let restored = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(restored.checksum, packet.checksum);
        assert!(matches!(
            restored.verify_checksum(),
            Err(PacketError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_checksum_accepts_intact_frame() {
        let mut packet = make_test_packet();
        let bytes = packet.to_bytes().unwrap();
        let restored = Packet::from_bytes(&bytes).unwrap();
        assert!(restored.verify_checksum().is_ok());
    }

    #[test]
    fn test_unknown_type_survives_reencode() {
        let mut packet = make_test_packet();
        packet.packet_type = PacketType::Unknown(0x1234);
        let bytes = packet.to_bytes().unwrap();

        let mut restored = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(restored.packet_type, PacketType::Unknown(0x1234));
        assert_eq!(restored.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_routing_advertisement_payload() {
        let src = MacAddress([0x02; 6]);
        let dest = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
        let packet = Packet::routing_advertisement(src, dest, 3);

        assert_eq!(packet.packet_type, PacketType::Routing);
        assert_eq!(packet.dest, MacAddress::BROADCAST);
        assert_eq!(packet.payload, vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01, 0x03]);
    }

    #[test]
    fn test_display_summary() {
        let packet = make_test_packet();
        assert_eq!(
            packet.to_string(),
            "Packet(type=TCP, src=010203040506:12345, dest=0a0b0c0d0e0f:80, seq=1, ack=0, flags=SYN, ttl=12, payload_length=18)"
        );
    }

    fn arb_packet() -> impl Strategy<Value = Packet> {
        (
            any::<u16>(),
            any::<u8>(),
            any::<u8>(),
            any::<[u8; 6]>(),
            any::<[u8; 6]>(),
            any::<(u16, u16)>(),
            any::<(u32, u32)>(),
            proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        )
            .prop_map(|(ty, ttl, flags, src, dest, (sp, dp), (seq, ack), payload)| Packet {
                packet_type: PacketType::from_u16(ty),
                ttl,
                flags: PacketFlags(flags),
                src: MacAddress(src),
                dest: MacAddress(dest),
                src_port: sp,
                dest_port: dp,
                seq,
                ack,
                payload,
                checksum: 0,
            })
    }

    proptest! {
        #[test]
        fn prop_decode_reproduces_encoded_fields(packet in arb_packet()) {
            let mut original = packet.clone();
            let bytes = original.to_bytes().unwrap();
            let restored = Packet::from_bytes(&bytes).unwrap();

            prop_assert_eq!(&restored, &original);
            prop_assert_eq!(restored.compute_checksum().unwrap(), original.checksum);
        }
    }
}
