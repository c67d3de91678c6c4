use std::error::Error;
use std::fmt::Display;

#[derive(Debug)]
pub struct VoiceUdpError {
    pub(crate) kind: VoiceUdpErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl VoiceUdpError {
    #[must_use]
    pub fn kind(&self) -> &VoiceUdpErrorType {
        &self.kind
    }

    pub(crate) fn new(kind: VoiceUdpErrorType, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            kind,
            source: Some(source.into()),
        }
    }
}

impl Display for VoiceUdpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            VoiceUdpErrorType::Connect => f.write_str("could not connect to the voice UDP server"),
            VoiceUdpErrorType::Sending => f.write_str("could not send UDP packet"),
            VoiceUdpErrorType::Receiving => f.write_str("could not receive UDP packet"),
            VoiceUdpErrorType::DiscoveringIp => f.write_str("could not discover external address"),
            VoiceUdpErrorType::DiscoveryTimedOut => {
                f.write_str("voice server did not answer IP discovery in time")
            }
            VoiceUdpErrorType::Closed => f.write_str("voice UDP socket is closed"),
        }
    }
}

impl Error for VoiceUdpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum VoiceUdpErrorType {
    /// Could not bind or connect the socket to the voice server.
    Connect,

    /// Could not send a datagram.
    Sending,

    /// Socket failed while waiting for datagrams.
    Receiving,

    /// IP discovery could not be sent or its reply was invalid.
    DiscoveringIp,

    /// No reply to IP discovery arrived before the configured timeout.
    DiscoveryTimedOut,

    /// The socket was used after [`VoiceUdp::close`].
    ///
    /// [`VoiceUdp::close`]: super::VoiceUdp::close
    Closed,
}
