//! Transport session seam.
//!
//! A transport session is the opaque real-time connection owned by the wrapped
//! media SDK (a LiveKit room, a Pipecat/Daily client). The coordinator creates
//! one per call through a [`TransportFactory`], connects it, relays its events
//! and disconnects it on teardown. Media internals never cross this boundary.

use async_trait::async_trait;
use revve_types::{CallCredentials, TransportEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("unsupported credentials: {0}")]
    UnsupportedCredentials(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("disconnect failed: {0}")]
    Disconnect(String),

    #[error("operation not supported by this transport: {0}")]
    Unsupported(&'static str),

    #[error("device error: {0}")]
    Device(String),
}

/// One live connection to a call.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Joins the call described by `credentials` with the microphone enabled.
    async fn connect(&self, credentials: &CallCredentials) -> Result<(), TransportError>;

    /// Leaves the call. Must be safe to call more than once.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Subscribes to the session's native events.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;

    async fn set_microphone_enabled(&self, _enabled: bool) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("set_microphone_enabled"))
    }

    async fn select_microphone(&self, _device_id: &str) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("select_microphone"))
    }
}

/// Builds a transport session for a set of credentials.
///
/// Returning an error here means the credentials do not fit this transport
/// (e.g. a web-call URL handed to a LiveKit factory).
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        credentials: &CallCredentials,
    ) -> Result<Arc<dyn TransportSession>, TransportError>;
}
