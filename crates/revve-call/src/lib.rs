//! Voice call coordination for the Revve SDK.
//!
//! [`CallCoordinator`] sequences microphone permission, platform audio
//! configuration, credential exchange and transport connect, and exposes a
//! narrow lifecycle event channel (call started, ended, failed). The media
//! transport itself (LiveKit, Pipecat/Daily) and the platform audio session
//! are supplied by the embedding application through the [`TransportFactory`]
//! and [`AudioSession`] traits.
//!
//! Credentials come from a [`CredentialSource`] chosen at construction: the
//! Revve API, locally minted LiveKit tokens, or fixed pre-issued credentials.
//!
//! [`CallViewModel`] shows how an application binds the coordinator and the
//! relayed transport events to observable UI state.

pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod events;
pub mod platform;
pub mod transport;
pub mod view_model;

pub use config::{
    load_config, ApiConfig, CallConfig, ConfigError, CredentialsConfig, LiveKitConfig,
    LoggingConfig, SdkConfig,
};
pub use coordinator::{CallCoordinator, CallCoordinatorBuilder};
pub use credentials::{
    ApiCredentialSource, CallRequest, CredentialSource, LiveKitTokenSource,
    StaticCredentialSource,
};
pub use error::CallError;
pub use events::CallEvent;
pub use platform::{AudioCategory, AudioMode, AudioSession, AudioSessionConfig, AudioSessionError};
pub use transport::{TransportError, TransportFactory, TransportSession};
pub use view_model::{CallViewModel, CallViewState};
