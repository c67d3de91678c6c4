use serde::{Deserialize, Serialize};
use twilight_model::id::{Id, marker::UserMarker};

/// A user left the voice channel; their SSRC mapping is stale from now on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ClientDisconnect {
    pub user_id: Id<UserMarker>,
}
