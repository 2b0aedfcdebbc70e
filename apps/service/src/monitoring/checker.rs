use anyhow::{Result, anyhow};
use std::time::Duration;
use url::Url;

/// Performs the network side of a probe
///
/// Implementations report the status code of whatever response came back and
/// return an error only when no response was received at all. Classifying the
/// status as healthy or not is left to the caller.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Issue one request against `url` and return the response status code
    async fn check(&self, url: &Url) -> Result<u16>;
}

/// HTTP/HTTPS checker issuing a single GET under a fixed timeout
pub struct HttpChecker {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("healthwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, url: &Url) -> Result<u16> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!("HTTP request timed out after {:?}", self.timeout)
            } else {
                anyhow!("HTTP request failed: {}", e)
            }
        })?;

        Ok(response.status().as_u16())
    }
}
