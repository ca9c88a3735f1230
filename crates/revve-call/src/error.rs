use livekit_api::access_token::AccessTokenError;
use revve_api::ApiError;
use revve_types::CallState;
use std::sync::Arc;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the call coordinator.
///
/// Fetch-layer errors arrive unchanged inside [`CallError::Api`]. The
/// domain-level misuse variants are grouped by [`CallError::is_call_error`].
#[derive(Error, Debug, Clone)]
pub enum CallError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Call error: Microphone access is required")]
    PermissionDenied,

    #[error("Call error: No active call to end")]
    NoActiveCall,

    #[error("Call error: a call is already in progress ({state})")]
    Busy { state: CallState },

    #[error("Call error: assistant id must not be empty")]
    InvalidAssistantId,

    #[error("Call error: call attempt was cancelled")]
    Cancelled,

    #[error("Call error: coordinator is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("LiveKit token error: {0}")]
    Token(#[source] Arc<AccessTokenError>),
}

impl From<AccessTokenError> for CallError {
    fn from(err: AccessTokenError) -> Self {
        Self::Token(Arc::new(err))
    }
}

impl CallError {
    /// Returns `true` for domain-level misuse and refusal, as opposed to
    /// failures propagated from the network or transport.
    pub fn is_call_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::NoActiveCall
                | Self::Busy { .. }
                | Self::InvalidAssistantId
                | Self::Cancelled
                | Self::Closed
        )
    }
}
