//! Credential strategies.
//!
//! Step four of a call start obtains [`CallCredentials`] from whichever
//! [`CredentialSource`] the coordinator was built with. The choice is fixed at
//! construction; the coordinator never inspects which strategy it holds.

use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use revve_api::{ApiClient, ApiError, CallEndpoint, Metadata};
use revve_types::{CallCredentials, ConnectionDetails};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::LiveKitConfig;
use crate::error::CallError;

/// What a call was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub assistant_id: String,
    pub metadata: Option<Metadata>,
}

/// Produces the credentials for one call attempt.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self, request: &CallRequest) -> Result<CallCredentials, CallError>;
}

/// Exchanges the assistant id with the Revve API.
#[derive(Debug, Clone)]
pub struct ApiCredentialSource {
    client: ApiClient,
    endpoint: CallEndpoint,
}

impl ApiCredentialSource {
    pub fn new(client: ApiClient, endpoint: CallEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl CredentialSource for ApiCredentialSource {
    async fn credentials(&self, request: &CallRequest) -> Result<CallCredentials, CallError> {
        let metadata = request.metadata.as_ref();
        let credentials = match self.endpoint {
            CallEndpoint::WebCalls => self
                .client
                .fetch_connection_details(&request.assistant_id, metadata)
                .await?
                .into(),
            CallEndpoint::InboundWebCalls => self
                .client
                .create_call(&request.assistant_id, metadata)
                .await?
                .into(),
        };
        Ok(credentials)
    }
}

/// Mints LiveKit join tokens locally; no REST round-trip.
///
/// Each call gets a fresh room named after the assistant and a random
/// participant identity. Request metadata is embedded in the token as JSON.
#[derive(Debug, Clone)]
pub struct LiveKitTokenSource {
    config: LiveKitConfig,
}

impl LiveKitTokenSource {
    pub fn new(config: LiveKitConfig) -> Self {
        Self { config }
    }

    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<String, CallError> {
        let mut token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        if let Some(metadata) = metadata.filter(|m| !m.is_empty()) {
            // A string map always serializes.
            let json = serde_json::to_string(metadata).unwrap_or_default();
            token = token.with_metadata(&json);
        }

        Ok(token.to_jwt()?)
    }
}

#[async_trait]
impl CredentialSource for LiveKitTokenSource {
    async fn credentials(&self, request: &CallRequest) -> Result<CallCredentials, CallError> {
        if self.config.url.is_empty() {
            return Err(CallError::Api(ApiError::InvalidUrl(
                "LiveKit url is not configured".to_string(),
            )));
        }

        let room_name = format!("{}-{}", request.assistant_id, Uuid::new_v4().simple());
        let identity = format!("user-{}", Uuid::new_v4().simple());
        let participant_token = self.generate_join_token(
            &room_name,
            &identity,
            &identity,
            request.metadata.as_ref(),
        )?;

        debug!(room = %room_name, "minted LiveKit join token");

        Ok(CallCredentials::Room(ConnectionDetails {
            server_url: self.config.url.clone(),
            room_name,
            participant_token,
            participant_name: identity,
        }))
    }
}

/// Hands out the same pre-issued credentials for every call.
#[derive(Debug, Clone)]
pub struct StaticCredentialSource {
    credentials: CallCredentials,
}

impl StaticCredentialSource {
    pub fn new(credentials: impl Into<CallCredentials>) -> Self {
        Self {
            credentials: credentials.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn credentials(&self, _request: &CallRequest) -> Result<CallCredentials, CallError> {
        Ok(self.credentials.clone())
    }
}
