use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct Heartbeat {
    /// Unix timestamp in milliseconds, echoed back in the acknowledgement.
    pub t: u64,
    /// Last sequence number received from the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_ack: Option<u64>,
}
