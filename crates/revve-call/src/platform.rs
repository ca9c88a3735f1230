//! Platform audio session seam.
//!
//! The embedding application implements [`AudioSession`] on top of whatever
//! the host OS offers (AVAudioSession, Android AudioManager, a desktop audio
//! stack). The coordinator is its only caller.

use async_trait::async_trait;

/// Session category requested for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCategory {
    /// Simultaneous capture and playback.
    PlayAndRecord,
}

/// Session mode requested for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Echo cancellation and voice processing tuned for two-way speech.
    VoiceChat,
}

/// How the platform audio session should be configured for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSessionConfig {
    pub category: AudioCategory,
    pub mode: AudioMode,
    pub allow_bluetooth: bool,
    pub default_to_speaker: bool,
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            category: AudioCategory::PlayAndRecord,
            mode: AudioMode::VoiceChat,
            allow_bluetooth: true,
            default_to_speaker: true,
        }
    }
}

/// Failure reported by the platform audio layer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("audio session error: {0}")]
pub struct AudioSessionError(pub String);

/// Microphone permission and audio routing for the host platform.
#[async_trait]
pub trait AudioSession: Send + Sync {
    /// Asks the user for recording permission. Resolves once they answer.
    async fn request_record_permission(&self) -> bool;

    /// Applies `config` and activates the session.
    fn configure(&self, config: &AudioSessionConfig) -> Result<(), AudioSessionError>;

    /// Deactivates the session, letting other apps resume audio.
    fn deactivate(&self) -> Result<(), AudioSessionError>;
}
