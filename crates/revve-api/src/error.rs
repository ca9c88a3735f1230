//! Error types for the credential exchange.

use std::sync::Arc;

/// Errors returned by [`ApiClient`](crate::ApiClient).
///
/// Underlying causes are reference-counted so the error can be fanned out to
/// several observers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The base URL or request path could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered 2xx with an empty body.
    #[error("Received invalid response from server")]
    InvalidResponse,

    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// The server answered with a non-2xx status.
    #[error("API error: Status code: {status}, message: {body}")]
    Status { status: u16, body: String },

    /// The 2xx body did not match the expected schema.
    #[error("Decode error: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    /// Request metadata could not be encoded; no request was sent.
    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(Arc::new(err))
    }
}

impl ApiError {
    /// HTTP status code for [`ApiError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
