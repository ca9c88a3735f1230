//! Credential payloads returned by the Revve API.
//!
//! Both response schemas arrive as snake_case JSON. `ConnectionDetails` is the
//! LiveKit room grant from `/web-calls`; `CallInfo` is the web-call record from
//! `/inbound-web-calls` whose transport carries an opaque call URL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// LiveKit room credentials for a single participant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    /// The LiveKit server URL (`wss://...`).
    pub server_url: String,
    /// The room name to join.
    pub room_name: String,
    /// The participant join token.
    pub participant_token: String,
    /// The participant name/identity.
    pub participant_name: String,
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("server_url", &self.server_url)
            .field("room_name", &self.room_name)
            .field("participant_token", &"[REDACTED]")
            .field("participant_name", &self.participant_name)
            .finish()
    }
}

/// Transport section of a web-call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTransport {
    /// Transport provider name (e.g. `daily`).
    pub provider: String,
    #[serde(default)]
    pub assistant_video_enabled: bool,
    /// URL the client joins; carries its own authorization.
    pub call_url: String,
}

/// Web-call record created by `/inbound-web-calls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(rename = "type")]
    pub call_type: String,
    pub transport: CallTransport,
    #[serde(default)]
    pub web_call_url: Option<String>,
    pub status: String,
    pub assistant_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Everything a transport session needs to join a call.
///
/// Owned by the coordinator for the duration of one call attempt and dropped
/// once connect succeeds or fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallCredentials {
    /// Server URL plus per-participant token (LiveKit).
    Room(ConnectionDetails),
    /// Opaque call URL plus call metadata (Pipecat/Daily).
    WebCall(CallInfo),
}

impl CallCredentials {
    /// The address the transport connects to.
    pub fn server_url(&self) -> &str {
        match self {
            Self::Room(details) => &details.server_url,
            Self::WebCall(info) => &info.transport.call_url,
        }
    }

    /// The participant token, when the credentials carry one separately.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Room(details) => Some(&details.participant_token),
            Self::WebCall(_) => None,
        }
    }
}

impl From<ConnectionDetails> for CallCredentials {
    fn from(details: ConnectionDetails) -> Self {
        Self::Room(details)
    }
}

impl From<CallInfo> for CallCredentials {
    fn from(info: CallInfo) -> Self {
        Self::WebCall(info)
    }
}
