//! `reqwest`-backed [`HttpFetch`]

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;

use super::{user_agent, FetchError, HttpFetch, HttpResponse};

/// Connect timeout applied to every connection the client opens
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared HTTP client; cheap to clone
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    user_agent: String,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("client setup: {}", e),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent(),
        })
    }

    /// Wrap an existing client, e.g. one with proxy settings
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            user_agent: user_agent(),
        }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, body })
    }
}
