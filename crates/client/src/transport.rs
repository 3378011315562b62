//! Transport layer.
//!
//! A transport takes a URL and an already-encoded body and reports whether
//! the endpoint accepted it. There are no retries at this level.

use std::time::Duration;

use async_trait::async_trait;
use panelwire_config::ClientConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Delivers one encoded body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` to `url`. Must not touch the network when `cancel` is
    /// already signalled; a cancelled send reports `false`.
    async fn send(&self, url: &str, body: &str, cancel: &CancellationToken) -> bool;
}

/// Form-encoded POST over reqwest.
///
/// The endpoint answers `1` for an accepted payload and `0` otherwise.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.timeout_secs))
    }

    async fn post(&self, url: &str, body: &str) -> std::result::Result<bool, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body.to_owned())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(%status, url, "Endpoint rejected request");
            return Ok(false);
        }
        Ok(text.trim() == "1")
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str, body: &str, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            debug!(url, "Send cancelled before request");
            return false;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(url, "Send cancelled in flight");
                false
            }
            result = self.post(url, body) => match result {
                Ok(accepted) => {
                    debug!(url, accepted, "Request completed");
                    accepted
                }
                Err(e) => {
                    warn!(url, error = %e, "HTTP request failed");
                    false
                }
            }
        }
    }
}
