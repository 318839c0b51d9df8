// Integration tests for the UDP radio emulation
//
// Sockets bind to 127.0.0.1:0 so tests never collide on ports.

use aethermesh_core::node::{NodeConfig, NodeController};
use aethermesh_core::packet::{MacAddress, Packet, PacketType, MTU};
use aethermesh_core::routing::{ForwardDecision, LocalDelivery};
use aethermesh_core::transport::{RadioTransport, TransportError, UdpRadio};
use std::net::UdpSocket;
use std::time::{Duration, Instant};

fn mac(n: u8) -> MacAddress {
    MacAddress([0x02, 0xAE, 0x00, 0x00, 0x00, n])
}

fn bind(n: u8) -> UdpRadio {
    UdpRadio::bind(mac(n), "127.0.0.1:0".parse().unwrap()).unwrap()
}

/// Two radios that can hear each other
fn pair() -> (UdpRadio, UdpRadio) {
    let mut a = bind(1);
    let mut b = bind(2);
    a.add_neighbor(mac(2), b.local_addr().unwrap());
    b.add_neighbor(mac(1), a.local_addr().unwrap());
    (a, b)
}

/// Poll a non-blocking radio until a frame arrives or a second passes
fn receive_within(radio: &mut UdpRadio) -> Option<(MacAddress, Vec<u8>)> {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if let Some(received) = radio.receive().unwrap() {
            return Some(received);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn test_broadcast_reaches_neighbor() {
    let (mut a, mut b) = pair();

    a.send(&MacAddress::BROADCAST, b"hello").unwrap();

    let (sender, frame) = receive_within(&mut b).expect("no frame received");
    assert_eq!(sender, mac(1));
    assert_eq!(frame, b"hello");

    println!("✓ Broadcast frames reach configured neighbors");
}

#[test]
fn test_receive_is_non_blocking() {
    let mut a = bind(1);
    let start = Instant::now();
    assert!(a.receive().unwrap().is_none());
    assert!(start.elapsed() < Duration::from_millis(500));

    println!("✓ Receive returns immediately when nothing is pending");
}

#[test]
fn test_unicast_requires_registration() {
    let (mut a, mut b) = pair();

    assert!(matches!(
        a.send(&mac(2), b"x"),
        Err(TransportError::PeerNotRegistered(_))
    ));

    a.add_peer(&mac(2)).unwrap();
    a.send(&mac(2), b"unicast").unwrap();
    a.remove_peer(&mac(2)).unwrap();

    let (_, frame) = receive_within(&mut b).expect("no frame received");
    assert_eq!(frame, b"unicast");

    println!("✓ Unicast needs the destination registered as a peer");
}

#[test]
fn test_unknown_neighbor_unreachable() {
    let mut a = bind(1);
    a.add_peer(&mac(9)).unwrap();
    assert!(matches!(
        a.send(&mac(9), b"x"),
        Err(TransportError::PeerUnreachable(_))
    ));

    println!("✓ Unicast to a node out of range fails cleanly");
}

#[test]
fn test_broadcast_continues_past_failing_neighbor() {
    let (mut a, mut b) = pair();
    // An IPv6 destination cannot be reached from an IPv4 socket
    a.add_neighbor(mac(3), "[::1]:9".parse().unwrap());

    assert!(a.send(&MacAddress::BROADCAST, b"to all").is_err());

    let (sender, frame) = receive_within(&mut b).expect("healthy neighbor missed the broadcast");
    assert_eq!(sender, mac(1));
    assert_eq!(frame, b"to all");

    println!("✓ One unreachable neighbor does not starve the others");
}

#[test]
fn test_oversized_frame_rejected() {
    let (mut a, _b) = pair();
    let frame = vec![0u8; MTU + 1];
    assert!(matches!(
        a.send(&MacAddress::BROADCAST, &frame),
        Err(TransportError::FrameTooLarge { .. })
    ));

    println!("✓ Frames above the MTU are refused");
}

#[test]
fn test_runt_datagram_ignored() {
    let mut b = bind(2);
    let stray = UdpSocket::bind("127.0.0.1:0").unwrap();
    stray.send_to(&[1, 2, 3], b.local_addr().unwrap()).unwrap();

    // Give the datagram time to land, then make sure it is skipped
    std::thread::sleep(Duration::from_millis(50));
    assert!(b.receive().unwrap().is_none());

    println!("✓ Datagrams without a sender address are ignored");
}

#[test]
fn test_nodes_exchange_packets_over_udp() {
    let (a, b) = pair();
    let mut node_a = NodeController::new(mac(1), a, NodeConfig::default());
    let mut node_b = NodeController::new(mac(2), b, NodeConfig::default());

    node_a.advertise();

    let mut decision = None;
    let deadline = Instant::now() + Duration::from_secs(1);
    while decision.is_none() && Instant::now() < deadline {
        decision = node_b.poll_once();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(
        decision,
        Some(ForwardDecision::Delivered(LocalDelivery::Routing { changed: 1 }))
    );
    assert_eq!(node_b.routes().lookup(&mac(1)), Some(mac(1)));

    node_b
        .send_data(mac(1), PacketType::Udp, b"over udp".to_vec())
        .unwrap();

    let (sender, frame) = receive_within(node_a.radio_mut()).expect("no frame received");
    assert_eq!(sender, mac(2));
    let packet = Packet::from_bytes(&frame).unwrap();
    assert_eq!(packet.payload, b"over udp");
    assert!(packet.verify_checksum().is_ok());

    println!("✓ Two nodes learn routes and exchange packets over UDP");
}
