use crate::error::ApiError;
use reqwest::header::CONTENT_TYPE;
use revve_types::{CallInfo, ConnectionDetails};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Production API host used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://app.revve.ai";

/// Free-form key/value pairs attached to a call.
pub type Metadata = HashMap<String, String>;

/// Sub-resource under `/api/voice-agents/{assistant_id}/` that issues credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallEndpoint {
    /// Returns LiveKit [`ConnectionDetails`].
    #[default]
    WebCalls,
    /// Returns a [`CallInfo`] web-call record.
    InboundWebCalls,
}

impl CallEndpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebCalls => "web-calls",
            Self::InboundWebCalls => "inbound-web-calls",
        }
    }
}

/// API key and host for one client. Immutable once built.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Url,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ClientConfig {
    /// Uses [`DEFAULT_BASE_URL`].
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL"),
        }
    }

    /// Uses a custom host, e.g. `http://localhost:3000` for development.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` does not parse or cannot
    /// carry a path.
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }
        Ok(Self {
            api_key: api_key.into(),
            base_url: parsed,
        })
    }
}

#[derive(Serialize)]
struct CallRequestBody<'a> {
    metadata: &'a Metadata,
}

/// Client for the credential exchange endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Uses a caller-provided `reqwest::Client` (proxies, timeouts, tests).
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds `{base}/api/voice-agents/{assistant_id}/{endpoint}`.
    ///
    /// The assistant id is inserted as a single escaped path segment.
    pub fn endpoint_url(
        &self,
        assistant_id: &str,
        endpoint: CallEndpoint,
    ) -> Result<Url, ApiError> {
        if assistant_id.is_empty() {
            return Err(ApiError::InvalidUrl(
                "assistant id must not be empty".to_string(),
            ));
        }

        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidUrl(format!(
                    "{} cannot be used as a base URL",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "voice-agents", assistant_id, endpoint.as_str()]);
        Ok(url)
    }

    /// Exchanges an assistant id for LiveKit room credentials via `/web-calls`.
    pub async fn fetch_connection_details(
        &self,
        assistant_id: &str,
        metadata: Option<&Metadata>,
    ) -> Result<ConnectionDetails, ApiError> {
        self.post(assistant_id, CallEndpoint::WebCalls, metadata).await
    }

    /// Creates a web call via `/inbound-web-calls`.
    pub async fn create_call(
        &self,
        assistant_id: &str,
        metadata: Option<&Metadata>,
    ) -> Result<CallInfo, ApiError> {
        self.post(assistant_id, CallEndpoint::InboundWebCalls, metadata)
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        assistant_id: &str,
        endpoint: CallEndpoint,
        metadata: Option<&Metadata>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(assistant_id, endpoint)?;

        let body = match metadata {
            Some(metadata) if !metadata.is_empty() => Some(
                serde_json::to_vec(&CallRequestBody { metadata })
                    .map_err(|e| ApiError::Serialization(Arc::new(e)))?,
            ),
            _ => None,
        };

        debug!(
            %url,
            has_metadata = body.is_some(),
            "requesting call credentials"
        );

        let mut request = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(
                status = status.as_u16(),
                endpoint = endpoint.as_str(),
                "credential request rejected"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::InvalidResponse);
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(Arc::new(e)))
    }
}
