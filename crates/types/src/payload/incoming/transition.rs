use serde::{Deserialize, Serialize};

/// Announces a protocol transition, usually a downgrade away from group
/// encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct PrepareTransition {
    pub transition_id: u16,
    pub protocol_version: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct ExecuteTransition {
    pub transition_id: u16,
}

/// Announces a new epoch of the group, or a protocol version upgrade when
/// `epoch` is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct PrepareEpoch {
    pub epoch: u64,
    pub protocol_version: u16,
}

/// Binary commit or welcome message bound to a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MlsTransitionMessage {
    pub transition_id: u16,
    pub data: Vec<u8>,
}
