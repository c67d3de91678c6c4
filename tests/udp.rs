#![allow(clippy::unwrap_used)]

use phonic::crypto::{EncryptMode, TransportSecrets, VoiceGroupCrypto};
use phonic::rtp::{self, SequenceClock};
use phonic::udp::{
    DISCOVERY_PACKET_LEN, DiscoverIpResult, KEEPALIVE_MARKER, UdpState, VoiceUdp,
};
use std::future::poll_fn;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::net::UdpSocket;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn server() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

/// Answers one discovery request the way a voice server does.
async fn answer_discovery(server: &UdpSocket, address: &str, port: u16) -> u32 {
    let mut request = [0u8; 128];
    let (len, peer) = server.recv_from(&mut request).await.unwrap();
    assert_eq!(len, DISCOVERY_PACKET_LEN);
    assert_eq!(&request[..4], &[0x00, 0x01, 0x00, 0x46]);

    let ssrc = u32::from_be_bytes(request[4..8].try_into().unwrap());

    let mut response = [0u8; DISCOVERY_PACKET_LEN];
    response[..4].copy_from_slice(&[0x00, 0x02, 0x00, 0x46]);
    response[4..8].copy_from_slice(&ssrc.to_be_bytes());
    response[8..8 + address.len()].copy_from_slice(address.as_bytes());
    response[72..].copy_from_slice(&port.to_be_bytes());

    // Noise before the real answer must be skipped.
    server.send_to(&[0xFF; 12], peer).await.unwrap();
    server.send_to(&response, peer).await.unwrap();
    ssrc
}

#[tokio::test]
async fn discovers_external_address() {
    let (server, port) = server().await;
    let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .unwrap();
    assert_eq!(udp.state(), UdpState::Unbound);

    let (result, ssrc) = tokio::join!(
        udp.discover(0xDEAD_BEEF, TIMEOUT),
        answer_discovery(&server, "203.0.113.5", 50000),
    );

    assert_eq!(ssrc, 0xDEAD_BEEF);
    assert_eq!(
        result.unwrap(),
        DiscoverIpResult {
            address: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
            port: 50000,
        }
    );
    assert_eq!(udp.state(), UdpState::Discovered);
}

#[tokio::test]
async fn keepalives_carry_rolling_counter() {
    let (server, port) = server().await;
    let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .unwrap();

    for expected in 0u64..3 {
        udp.send_keepalive().unwrap();

        let mut datagram = [0u8; 32];
        let len = tokio::time::timeout(TIMEOUT, server.recv(&mut datagram))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(len, 9);
        assert_eq!(datagram[0], KEEPALIVE_MARKER);
        assert_eq!(u64::from_le_bytes(datagram[1..9].try_into().unwrap()), expected);
    }
}

#[tokio::test]
async fn relayed_voice_packet_decodes() {
    let (server, port) = server().await;
    let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .unwrap();

    // Learn the client's address from its first keepalive.
    udp.send_keepalive().unwrap();
    let (_, client) = server.recv_from(&mut [0u8; 32]).await.unwrap();

    let secrets = TransportSecrets {
        mode: EncryptMode::XChaCha20Poly1305,
        secret_key: [3; 32],
        ssrc: 7,
    };
    let mut sender = VoiceGroupCrypto::new(&secrets);
    let receiver = VoiceGroupCrypto::new(&secrets);

    let (sequence, timestamp) = SequenceClock::new(100, 9600).next();
    let header = rtp::encode_header(sequence, timestamp, 7);
    let sealed = sender.encrypt(b"opus frame", &header).unwrap();
    server
        .send_to(&rtp::encode_packet(&header, &sealed), client)
        .await
        .unwrap();

    let mut buffer = vec![0u8; 2048];
    let len = tokio::time::timeout(TIMEOUT, poll_fn(|cx| udp.poll_recv(cx, &mut buffer)))
        .await
        .unwrap()
        .unwrap();

    let packet = rtp::decode_packet(&buffer[..len], &receiver).unwrap();
    assert_eq!(packet.sequence, 100);
    assert_eq!(packet.timestamp, 9600);
    assert_eq!(packet.ssrc, 7);
    assert_eq!(packet.payload, b"opus frame");
}
