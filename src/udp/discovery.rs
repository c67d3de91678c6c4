//! Codec for the IP discovery handshake.
//!
//! Request and response share one 74 byte layout: a 2 byte type, a 2 byte
//! length (always 70), the SSRC, a NUL padded address string of 64 bytes
//! and the port, all big endian.

use discortp::discord::{IpDiscoveryPacket, IpDiscoveryType, MutableIpDiscoveryPacket};
use std::net::IpAddr;
use std::str::FromStr;

use super::error::{VoiceUdpError, VoiceUdpErrorType};

/// Size of both the discovery request and its response.
pub const DISCOVERY_PACKET_LEN: usize = IpDiscoveryPacket::const_packet_size();

// Length field counts everything after the type and length fields.
const DISCOVERY_BODY_LEN: u16 = 70;

/// The client's address as seen by the voice server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoverIpResult {
    /// External IP address of the client.
    pub address: IpAddr,

    /// External UDP port bound by the client.
    pub port: u16,
}

#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn discovery_request(ssrc: u32) -> [u8; DISCOVERY_PACKET_LEN] {
    let mut bytes = [0u8; DISCOVERY_PACKET_LEN];
    let mut view = MutableIpDiscoveryPacket::new(&mut bytes[..])
        .expect("buffer has the exact size of a discovery packet");

    view.set_pkt_type(IpDiscoveryType::Request);
    view.set_length(DISCOVERY_BODY_LEN);
    view.set_ssrc(ssrc);
    bytes
}

pub fn parse_discovery_response(bytes: &[u8]) -> Result<DiscoverIpResult, VoiceUdpError> {
    let invalid = |reason: &'static str| VoiceUdpError::new(VoiceUdpErrorType::DiscoveringIp, reason);

    if bytes.len() < DISCOVERY_PACKET_LEN {
        return Err(invalid("discovery response is too short"));
    }

    let view = IpDiscoveryPacket::new(bytes).ok_or_else(|| invalid("discovery response is too short"))?;
    if view.get_pkt_type() != IpDiscoveryType::Response {
        return Err(invalid("datagram is not a discovery response"));
    }

    let raw = view.get_address_raw();
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let address = std::str::from_utf8(&raw[..end])
        .ok()
        .and_then(|address| IpAddr::from_str(address).ok())
        .ok_or_else(|| invalid("discovery response carries an invalid address"))?;

    Ok(DiscoverIpResult {
        address,
        port: view.get_port(),
    })
}
