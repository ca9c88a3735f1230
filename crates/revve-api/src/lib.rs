//! REST client for the Revve voice API.
//!
//! Exchanges an API key and an assistant id for the credentials a transport
//! session needs to join a call. Each call issues exactly one request; there
//! is no retry or backoff here, retry policy belongs to the caller.

mod client;
mod error;

pub use client::{ApiClient, CallEndpoint, ClientConfig, Metadata, DEFAULT_BASE_URL};
pub use error::ApiError;
