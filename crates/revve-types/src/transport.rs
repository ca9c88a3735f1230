//! Native transport events re-published to observers.
//!
//! These mirror what the wrapped real-time SDK reports about its connection
//! and media. The coordinator relays them unmodified.

use serde::{Deserialize, Serialize};

/// Connection state reported by a transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Disconnected,
    Initializing,
    Initialized,
    Authenticating,
    Connecting,
    Connected,
    Ready,
    Disconnecting,
    Error,
}

impl TransportState {
    /// Returns the human-readable description shown in UI status lines.
    pub fn description(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Authenticating => "authenticating",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Disconnecting => "disconnecting",
            Self::Error => "error",
        }
    }

    /// Whether a user should consider themselves in a call.
    pub fn is_in_call(self) -> bool {
        matches!(
            self,
            Self::Authenticating | Self::Connecting | Self::Connected | Self::Ready
        )
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// An audio input device known to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDevice {
    pub id: String,
    pub name: String,
}

/// A speech transcript fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
}

/// An event emitted by a transport session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransportEvent {
    StateChanged { state: TransportState },
    Connected,
    Disconnected,
    /// The assistant joined and is ready. `expires_at` is a unix timestamp.
    BotReady { expires_at: Option<i64> },
    RemoteAudioLevel { level: f32, participant: String },
    LocalAudioLevel { level: f32 },
    UserTranscript(Transcript),
    BotTranscript { text: String },
    MicEnabled { enabled: bool },
    AvailableMicsUpdated { mics: Vec<MediaDevice> },
    MicUpdated { mic: Option<MediaDevice> },
    Error { message: String },
}
