use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Handshake completion, telling the client where the media server lives.
///
/// The `heartbeat_interval` field some servers still include is wrong and
/// ignored; Hello is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct Ready {
    pub ssrc: u32,
    #[serde(with = "crate::deserializers::ip_string")]
    pub ip: IpAddr,
    pub port: u16,
    pub modes: Vec<String>,
}
