use serde::{Deserialize, Serialize};
use twilight_model::id::{Id, marker::UserMarker};

/// Users connected to the voice channel.
///
/// Sent once for everybody already present right after the handshake and
/// again whenever somebody joins, so it is a snapshot rather than a strict
/// join notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ClientConnect {
    pub user_ids: Vec<Id<UserMarker>>,
}
