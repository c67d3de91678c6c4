use std::time::Duration;

use phonic_types::payload::Speaking;
use phonic_types::payload::incoming::{ClientConnect, ClientDisconnect};
use twilight_model::gateway::CloseFrame;

use crate::crypto::EncryptMode;
use crate::udp::DiscoverIpResult;

/// Negotiated parameters of an established voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub ssrc: u32,
    pub mode: EncryptMode,
    /// Address the voice server sees this client from.
    pub external: DiscoverIpResult,
    /// Group encryption protocol version the call started with.
    pub dave_protocol_version: u16,
}

/// Events yielded by [`VoiceGateway`] in the order they happen.
///
/// [`VoiceGateway`]: super::VoiceGateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The first session description was received; voice can flow.
    Ready(SessionInfo),

    /// A session was established again after a reconnect.
    Resumed(SessionInfo),

    /// A remote user started or stopped speaking.
    Speaking(Speaking),

    ClientConnect(ClientConnect),

    /// A remote user left; `ssrc` is the stream they were sending on, if
    /// known.
    ClientDisconnect {
        event: ClientDisconnect,
        ssrc: Option<u32>,
    },

    HeartbeatAck { latency: Option<Duration> },

    /// The connection dropped with a recoverable code and a reconnect
    /// is scheduled after `delay`.
    Reconnecting { code: Option<u16>, delay: Duration },

    /// The session ended for good. The stream ends after this event.
    Closed(Option<CloseFrame<'static>>),
}
