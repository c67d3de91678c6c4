//! Extension point for end-to-end group encryption (DAVE).
//!
//! The session decodes the transition opcodes and routes them here, then
//! sends whatever replies the handler returns. Key package, commit and
//! welcome cryptography lives entirely behind [`GroupKeyHandler`].

use std::fmt::Debug;

use phonic_types::OpCode;
use phonic_types::payload::binary;
use phonic_types::payload::incoming::{
    ExecuteTransition, MlsTransitionMessage, PrepareEpoch, PrepareTransition,
};
use phonic_types::payload::outgoing::{InvalidCommitWelcome, TransitionReady};
use serde_json::json;
use tokio_websockets::Message as WsMessage;

/// Group key message received from the voice gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKeyEvent<'a> {
    PrepareTransition(&'a PrepareTransition),
    ExecuteTransition(&'a ExecuteTransition),
    PrepareEpoch(&'a PrepareEpoch),
    /// Credential and public key of the external sender.
    ExternalSender(&'a [u8]),
    Proposals(&'a [u8]),
    AnnounceCommitTransition(&'a MlsTransitionMessage),
    Welcome(&'a MlsTransitionMessage),
}

/// Message a [`GroupKeyHandler`] wants sent back to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKeyReply {
    TransitionReady { transition_id: u16 },
    KeyPackage(Vec<u8>),
    CommitWelcome(Vec<u8>),
    InvalidCommitWelcome { transition_id: u16 },
}

impl GroupKeyReply {
    /// Encodes the reply as a WebSocket message.
    ///
    /// MLS payloads travel as binary frames, the rest as JSON.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn into_message(self) -> WsMessage {
        let json = |op: OpCode, data: serde_json::Value| {
            let payload = json!({ "op": op, "d": data });
            WsMessage::text(payload.to_string())
        };

        match self {
            Self::TransitionReady { transition_id } => json(
                OpCode::TransitionReady,
                json!(TransitionReady { transition_id }),
            ),
            Self::InvalidCommitWelcome { transition_id } => json(
                OpCode::MlsInvalidCommitWelcome,
                json!(InvalidCommitWelcome { transition_id }),
            ),
            Self::KeyPackage(payload) => {
                WsMessage::binary(binary::encode(OpCode::MlsKeyPackage, &payload))
            }
            Self::CommitWelcome(payload) => {
                WsMessage::binary(binary::encode(OpCode::MlsCommitWelcome, &payload))
            }
        }
    }
}

/// Handles group key transitions for a voice session.
///
/// Handlers must return quickly: they run inside the session's poll loop
/// between heartbeats.
pub trait GroupKeyHandler: Debug + Send {
    /// Highest protocol version advertised in Identify. `0` opts out of
    /// end-to-end encryption.
    fn max_protocol_version(&self) -> u16;

    /// Called once the session description announced the starting
    /// protocol version.
    fn session_started(&mut self, protocol_version: u16) {
        let _ = protocol_version;
    }

    fn handle(&mut self, event: GroupKeyEvent<'_>) -> Vec<GroupKeyReply>;
}

/// Handler for clients without end-to-end encryption.
///
/// It acknowledges transitions so the call can proceed and rejects every
/// commit or welcome it is handed, since it holds no group state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl GroupKeyHandler for Passthrough {
    fn max_protocol_version(&self) -> u16 {
        0
    }

    fn handle(&mut self, event: GroupKeyEvent<'_>) -> Vec<GroupKeyReply> {
        match event {
            // Transition 0 is applied immediately and needs no answer.
            GroupKeyEvent::PrepareTransition(prepare) if prepare.transition_id != 0 => {
                vec![GroupKeyReply::TransitionReady {
                    transition_id: prepare.transition_id,
                }]
            }
            GroupKeyEvent::AnnounceCommitTransition(message) | GroupKeyEvent::Welcome(message) => {
                vec![GroupKeyReply::InvalidCommitWelcome {
                    transition_id: message.transition_id,
                }]
            }
            GroupKeyEvent::PrepareTransition(_)
            | GroupKeyEvent::ExecuteTransition(_)
            | GroupKeyEvent::PrepareEpoch(_)
            | GroupKeyEvent::ExternalSender(_)
            | GroupKeyEvent::Proposals(_) => Vec::new(),
        }
    }
}
