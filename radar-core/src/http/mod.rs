//! Outbound HTTP
//!
//! Both remote collaborators, the public list hosts and the name directory,
//! are plain `GET`s. They go through [`HttpFetch`] so the registry and the
//! resolver never depend on a concrete client.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod client;

pub use client::ReqwestFetcher;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Transport-level failures; a non-200 status is not a `FetchError`
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Minimal async `GET` capability
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url`, giving up after `timeout`
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FetchError>;
}

/// `User-Agent` sent with every request
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
