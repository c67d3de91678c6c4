use std::error::Error;
use std::fmt::Display;
use tracing::Level;

/// Reason a received datagram was dropped.
///
/// None of these are fatal to the transport.
#[derive(Debug)]
pub struct PacketError {
    pub(crate) kind: PacketErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl PacketError {
    #[must_use]
    pub fn kind(&self) -> &PacketErrorType {
        &self.kind
    }

    pub(crate) fn malformed(len: usize) -> Self {
        Self {
            kind: PacketErrorType::Malformed { len },
            source: None,
        }
    }

    /// Log level the drop is worth reporting at.
    #[must_use]
    pub fn level(&self) -> Level {
        match self.kind {
            PacketErrorType::Decrypt { .. } => Level::WARN,
            PacketErrorType::Malformed { .. } | PacketErrorType::Extension { .. } => Level::DEBUG,
            PacketErrorType::Keepalive | PacketErrorType::Rtcp => Level::TRACE,
        }
    }
}

impl Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PacketErrorType::Malformed { len } => {
                f.write_str("malformed RTP datagram: len=")?;
                Display::fmt(len, f)
            }
            PacketErrorType::Rtcp => f.write_str("RTCP datagram on the media socket"),
            PacketErrorType::Keepalive => f.write_str("undecryptable keepalive-sized packet"),
            PacketErrorType::Decrypt { ciphertext_len } => {
                f.write_str("could not decrypt voice packet: ciphertext_len=")?;
                Display::fmt(ciphertext_len, f)
            }
            PacketErrorType::Extension { words } => {
                f.write_str("header extension exceeds payload: words=")?;
                Display::fmt(words, f)
            }
        }
    }
}

impl Error for PacketError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PacketErrorType {
    /// Datagram is too short for its header and trailer.
    Malformed { len: usize },

    /// Control packet that carries no audio.
    Rtcp,

    /// Ciphertext has the size of the server's empty keepalive packet and
    /// could not be decrypted; this is expected traffic.
    Keepalive,

    /// Authentication failed for any other packet.
    Decrypt { ciphertext_len: usize },

    /// Extension word count points past the end of the plaintext.
    Extension { words: u16 },
}
