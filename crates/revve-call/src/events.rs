use uuid::Uuid;

use crate::error::CallError;

/// Lifecycle notification delivered to subscribers of a coordinator.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The transport connected and the call is live.
    Started { session_id: Uuid },
    /// A live call was stopped, expired or closed.
    Ended { session_id: Uuid },
    /// A call attempt failed after it was accepted.
    Failed {
        session_id: Uuid,
        error: CallError,
    },
}

impl CallEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::Started { session_id }
            | Self::Ended { session_id }
            | Self::Failed { session_id, .. } => *session_id,
        }
    }
}
