use serde_repr::{Deserialize_repr, Serialize_repr};

/// Voice gateway opcodes.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[non_exhaustive]
#[repr(u8)]
pub enum OpCode {
    /// Start a voice websocket connection.
    Identify = 0,
    /// Select the protocol to use.
    SelectProtocol = 1,
    /// Received to indicate completion of handshake.
    Ready = 2,
    /// Fired periodically to keep connection alive.
    Heartbeat = 3,
    /// Received to indicate session description.
    SessionDescription = 4,
    /// Sent and received to indicate speaking status.
    Speaking = 5,
    /// Received in response to a heartbeat.
    HeartbeatAck = 6,
    /// Resume a previously disconnected session.
    Resume = 7,
    /// Received after connecting, contains heartbeat interval.
    Hello = 8,
    /// Received to indicate a successful resume.
    Resumed = 9,
    /// Received to indicate one or more clients have connected
    /// to the voice channel.
    ClientConnect = 11,
    /// Received to indicate someone was disconnected.
    ClientDisconnect = 13,
    /// A downgrade from the group encryption protocol is upcoming.
    PrepareTransition = 21,
    /// Execute a previously announced protocol transition.
    ExecuteTransition = 22,
    /// Acknowledge readiness for a previously announced transition.
    TransitionReady = 23,
    /// A protocol version or group change is upcoming.
    PrepareEpoch = 24,
    /// Credential and public key of the MLS external sender (binary).
    MlsExternalSender = 25,
    /// MLS key package for a pending group member (binary).
    MlsKeyPackage = 26,
    /// MLS proposals to be appended or revoked (binary).
    MlsProposals = 27,
    /// MLS commit with optional welcome messages (binary).
    MlsCommitWelcome = 28,
    /// MLS commit to be processed for an upcoming transition (binary).
    MlsAnnounceCommitTransition = 29,
    /// MLS welcome to the group for an upcoming transition (binary).
    MlsWelcome = 30,
    /// Flag an invalid commit or welcome, requesting re-addition.
    MlsInvalidCommitWelcome = 31,
}

impl OpCode {
    /// Tries to match an integer value to an opcode.
    ///
    /// Returns [`None`] if no match is found.
    #[must_use]
    pub const fn from(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Identify),
            1 => Some(Self::SelectProtocol),
            2 => Some(Self::Ready),
            3 => Some(Self::Heartbeat),
            4 => Some(Self::SessionDescription),
            5 => Some(Self::Speaking),
            6 => Some(Self::HeartbeatAck),
            7 => Some(Self::Resume),
            8 => Some(Self::Hello),
            9 => Some(Self::Resumed),
            11 => Some(Self::ClientConnect),
            13 => Some(Self::ClientDisconnect),
            21 => Some(Self::PrepareTransition),
            22 => Some(Self::ExecuteTransition),
            23 => Some(Self::TransitionReady),
            24 => Some(Self::PrepareEpoch),
            25 => Some(Self::MlsExternalSender),
            26 => Some(Self::MlsKeyPackage),
            27 => Some(Self::MlsProposals),
            28 => Some(Self::MlsCommitWelcome),
            29 => Some(Self::MlsAnnounceCommitTransition),
            30 => Some(Self::MlsWelcome),
            31 => Some(Self::MlsInvalidCommitWelcome),
            _ => None,
        }
    }

    /// Whether the payload of this opcode travels as a binary frame.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::MlsExternalSender
                | Self::MlsKeyPackage
                | Self::MlsProposals
                | Self::MlsCommitWelcome
                | Self::MlsAnnounceCommitTransition
                | Self::MlsWelcome
        )
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        val as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use static_assertions::assert_impl_all;
    use std::fmt::Debug;

    assert_impl_all!(
        OpCode: Clone,
        Copy,
        Debug,
        Deserialize<'static>,
        Eq,
        PartialEq,
        Send,
        Serialize,
        Sync,
    );

    #[test]
    fn from_matches_discriminant() {
        for code in 0..=u8::MAX {
            if let Some(op) = OpCode::from(code) {
                assert_eq!(u8::from(op), code);
            }
        }
        assert_eq!(OpCode::from(10), None);
        assert_eq!(OpCode::from(12), None);
    }

    #[test]
    fn binary_family() {
        assert!(OpCode::MlsWelcome.is_binary());
        assert!(!OpCode::PrepareTransition.is_binary());
        assert!(!OpCode::MlsInvalidCommitWelcome.is_binary());
    }
}
