use std::error::Error;
use std::fmt::Display;

/// Non-terminal failure reported by the [`VoiceGateway`] stream.
///
/// The session keeps running (or schedules a reconnect) after yielding
/// one of these; the stream only ends after [`VoiceEvent::Closed`].
///
/// [`VoiceGateway`]: super::VoiceGateway
/// [`VoiceEvent::Closed`]: super::VoiceEvent::Closed
#[derive(Debug)]
pub struct VoiceGatewayError {
    pub(crate) kind: VoiceGatewayErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl VoiceGatewayError {
    #[must_use]
    pub fn kind(&self) -> &VoiceGatewayErrorType {
        &self.kind
    }

    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    pub(crate) fn deserializing(event: &str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            kind: VoiceGatewayErrorType::Deserializing {
                event: event.to_owned(),
            },
            source: Some(source.into()),
        }
    }
}

impl Display for VoiceGatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            VoiceGatewayErrorType::Connecting => {
                f.write_str("could not connect to the voice gateway")
            }
            VoiceGatewayErrorType::Sending => f.write_str("could not send a gateway message"),
            VoiceGatewayErrorType::Transport => f.write_str("voice UDP transport failed"),
            VoiceGatewayErrorType::Deserializing { event } => {
                f.write_str("voice gateway event could not be deserialized: event=")?;
                f.write_str(event)
            }
            VoiceGatewayErrorType::InvalidHeartbeatInterval => {
                f.write_str("voice gateway sent a zero heartbeat interval")
            }
            VoiceGatewayErrorType::UnsupportedMode { offered } => {
                f.write_str("voice server offered no supported encryption mode: offered=")?;
                f.write_str(&offered.join(","))
            }
        }
    }
}

impl Error for VoiceGatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum VoiceGatewayErrorType {
    /// The WebSocket connection could not be opened.
    Connecting,

    /// A message could not be written to the WebSocket.
    Sending,

    /// The UDP socket failed; the session reconnects from scratch.
    Transport,

    /// Voice gateway event could not be deserialized.
    Deserializing { event: String },

    /// Hello asked for heartbeats at an interval below one millisecond.
    InvalidHeartbeatInterval,

    /// None of the modes in Ready can be used.
    UnsupportedMode { offered: Vec<String> },
}
