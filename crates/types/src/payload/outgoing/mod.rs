mod heartbeat;
mod identify;
mod resume;
mod select_protocol;
mod transition;

pub use self::heartbeat::Heartbeat;
pub use self::identify::Identify;
pub use self::resume::Resume;
pub use self::select_protocol::{SelectProtocol, SelectProtocolBuilder, SelectProtocolData};
pub use self::transition::{InvalidCommitWelcome, TransitionReady};
