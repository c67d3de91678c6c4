use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct TransitionReady {
    pub transition_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct InvalidCommitWelcome {
    pub transition_id: u16,
}
