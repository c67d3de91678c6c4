//! Binary frames used by the MLS half of the group-key-transition family.
//!
//! Server frames are laid out as `[seq: u16 BE][opcode: u8][payload]`,
//! client frames as `[opcode: u8][payload]`.

use std::error::Error;
use std::fmt::Display;

use super::incoming::MlsTransitionMessage;
use super::{Event, VoiceGatewayEvent};
use crate::OpCode;

const SERVER_HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFrameError {
    /// Frame is shorter than its fixed header.
    TooShort { len: usize },
    /// Opcode byte is unknown or is not a binary server opcode.
    UnexpectedOpcode { opcode: u8 },
}

impl Display for BinaryFrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { len } => {
                f.write_str("binary frame is too short: len=")?;
                Display::fmt(len, f)
            }
            Self::UnexpectedOpcode { opcode } => {
                f.write_str("unexpected opcode in binary frame: ")?;
                Display::fmt(opcode, f)
            }
        }
    }
}

impl Error for BinaryFrameError {}

/// Parses a binary frame sent by the voice gateway.
pub fn parse(frame: &[u8]) -> Result<VoiceGatewayEvent, BinaryFrameError> {
    if frame.len() < SERVER_HEADER_LEN {
        return Err(BinaryFrameError::TooShort { len: frame.len() });
    }

    let seq = u16::from_be_bytes([frame[0], frame[1]]);
    let opcode = frame[2];
    let payload = &frame[SERVER_HEADER_LEN..];

    let event = match OpCode::from(opcode) {
        Some(OpCode::MlsExternalSender) => Event::MlsExternalSender(payload.to_vec()),
        Some(OpCode::MlsProposals) => Event::MlsProposals(payload.to_vec()),
        Some(OpCode::MlsAnnounceCommitTransition) => {
            Event::MlsAnnounceCommitTransition(transition_message(frame.len(), payload)?)
        }
        Some(OpCode::MlsWelcome) => Event::MlsWelcome(transition_message(frame.len(), payload)?),
        _ => return Err(BinaryFrameError::UnexpectedOpcode { opcode }),
    };

    Ok(VoiceGatewayEvent {
        seq: Some(u64::from(seq)),
        event,
    })
}

fn transition_message(
    frame_len: usize,
    payload: &[u8],
) -> Result<MlsTransitionMessage, BinaryFrameError> {
    let [high, low, data @ ..] = payload else {
        return Err(BinaryFrameError::TooShort { len: frame_len });
    };

    Ok(MlsTransitionMessage {
        transition_id: u16::from_be_bytes([*high, *low]),
        data: data.to_vec(),
    })
}

/// Builds a binary frame to be sent to the voice gateway.
#[must_use]
pub fn encode(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(u8::from(opcode));
    frame.extend_from_slice(payload);
    frame
}
