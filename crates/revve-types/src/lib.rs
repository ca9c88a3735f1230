//! Shared wire models and state enums for the Revve voice SDK.
//!
//! This crate holds the types that cross crate boundaries: the credential
//! payloads returned by the Revve API, the call lifecycle states owned by the
//! coordinator, and the native transport events re-published to observers.
//! It performs no I/O.

pub mod call;
pub mod transport;

pub use call::{CallCredentials, CallInfo, CallTransport, ConnectionDetails};
pub use transport::{MediaDevice, Transcript, TransportEvent, TransportState};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a call coordinator.
///
/// A successful call walks the states in declaration order and returns to
/// `Idle` after `Disconnecting`. Any failure before `Active` returns straight
/// to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No call in progress.
    #[default]
    Idle,
    /// Waiting for the platform to grant microphone access.
    AcquiringPermission,
    /// Configuring the platform audio session for duplex voice.
    ConfiguringAudio,
    /// Exchanging the assistant id for connection credentials.
    FetchingCredentials,
    /// Waiting for the transport session to connect.
    Connecting,
    /// Call is live.
    Active,
    /// Tearing down the transport and audio session.
    Disconnecting,
}

impl CallState {
    /// Returns the canonical string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringPermission => "acquiring_permission",
            Self::ConfiguringAudio => "configuring_audio",
            Self::FetchingCredentials => "fetching_credentials",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Disconnecting => "disconnecting",
        }
    }

    /// Returns `true` while a `start` is still in flight.
    pub fn is_starting(self) -> bool {
        matches!(
            self,
            Self::AcquiringPermission
                | Self::ConfiguringAudio
                | Self::FetchingCredentials
                | Self::Connecting
        )
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
