use phonic_types::CloseCode;

/// The current state of a [`VoiceGateway`].
///
/// [`VoiceGateway`]: super::VoiceGateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayState {
    /// Opening the first WebSocket connection.
    Connecting,

    /// Connected and waiting for Hello; nothing is sent before it.
    AwaitingHello,

    /// Identify was queued and the gateway has not answered with Ready yet.
    Identifying,

    /// Ready arrived; IP discovery and protocol selection are in flight
    /// until the session description is received.
    AwaitingReady,

    /// Session description received, voice can flow.
    Ready,

    /// Waiting for the reconnect timer or redoing the handshake after a
    /// recoverable close.
    Resuming,

    /// A close frame is being sent and the connection is winding down.
    Closing,

    /// The session ended for good.
    Closed,
}

impl GatewayState {
    /// Whether a close with this code ends the session for good.
    #[must_use]
    pub(crate) fn is_critical_close(code: Option<u16>) -> bool {
        code.and_then(|code| CloseCode::try_from(code).ok())
            .is_some_and(|code| code.is_critical())
    }

    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            Self::AwaitingHello | Self::Identifying | Self::AwaitingReady | Self::Ready
        )
    }

    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayState;

    #[test]
    fn classifies_close_codes() {
        for code in [4004, 4006, 4011, 4012, 4014, 4016, 4017, 4022] {
            assert!(GatewayState::is_critical_close(Some(code)), "{code}");
        }

        for code in [1000, 1006, 4000, 4001, 4009, 4015, 4020, 4021, 4999] {
            assert!(!GatewayState::is_critical_close(Some(code)), "{code}");
        }
        assert!(!GatewayState::is_critical_close(None));
    }
}
