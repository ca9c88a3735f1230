//! SDK configuration loading from file and environment variables.

use revve_api::{ApiClient, CallEndpoint, ClientConfig, DEFAULT_BASE_URL};
use revve_types::ConnectionDetails;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::credentials::{
    ApiCredentialSource, CredentialSource, LiveKitTokenSource, StaticCredentialSource,
};
use crate::error::CallError;

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level SDK configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SdkConfig {
    /// Revve API access.
    #[serde(default)]
    pub api: ApiConfig,

    /// How call credentials are obtained.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Call behaviour.
    #[serde(default)]
    pub call: CallConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Revve API key and host.
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,

    /// Host including scheme, without trailing path. Default: `https://app.revve.ai`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Credential strategy, chosen once at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CredentialsConfig {
    /// Exchange the assistant id with the Revve API.
    Api {
        #[serde(default)]
        endpoint: CallEndpoint,
    },
    /// Mint LiveKit join tokens locally from known server parameters.
    #[serde(rename = "livekit")]
    LiveKit(LiveKitConfig),
    /// Use fixed, pre-issued room credentials.
    Static(ConnectionDetails),
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self::Api {
            endpoint: CallEndpoint::default(),
        }
    }
}

/// LiveKit server parameters for local token minting.
#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

/// Call behaviour settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallConfig {
    /// Ends the call automatically after this many seconds.
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
}

impl CallConfig {
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "revve_call=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SdkConfig {
    /// Builds the API client described by `[api]`.
    pub fn api_client(&self) -> Result<ApiClient, CallError> {
        let config = ClientConfig::with_base_url(&self.api.api_key, &self.api.base_url)?;
        Ok(ApiClient::new(config))
    }

    /// Builds the credential strategy described by `[credentials]`.
    pub fn credential_source(&self) -> Result<Arc<dyn CredentialSource>, CallError> {
        let source: Arc<dyn CredentialSource> = match &self.credentials {
            CredentialsConfig::Api { endpoint } => {
                Arc::new(ApiCredentialSource::new(self.api_client()?, *endpoint))
            }
            CredentialsConfig::LiveKit(livekit) => {
                Arc::new(LiveKitTokenSource::new(livekit.clone()))
            }
            CredentialsConfig::Static(details) => {
                Arc::new(StaticCredentialSource::new(details.clone()))
            }
        };
        Ok(source)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `REVVE_API_KEY` overrides `api.api_key`
/// - `REVVE_BASE_URL` overrides `api.base_url`
/// - `REVVE_LOG_LEVEL` overrides `logging.level`
/// - `REVVE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<SdkConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                SdkConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => SdkConfig::default(),
    };

    if let Ok(api_key) = std::env::var("REVVE_API_KEY") {
        config.api.api_key = api_key;
    }
    if let Ok(base_url) = std::env::var("REVVE_BASE_URL") {
        config.api.base_url = base_url;
    }
    if let Ok(level) = std::env::var("REVVE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("REVVE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
