mod client_connect;
mod client_disconnect;
mod heartbeat;
mod ready;
mod session_description;
mod transition;

pub use self::client_connect::ClientConnect;
pub use self::client_disconnect::ClientDisconnect;
pub use self::heartbeat::{HeartbeatAck, Hello};
pub use self::ready::Ready;
pub use self::session_description::SessionDescription;
pub use self::transition::{ExecuteTransition, MlsTransitionMessage, PrepareEpoch, PrepareTransition};
