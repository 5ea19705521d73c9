use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::fetcher::Fetcher;

pub const PROJECT_URL: &str = "https://github.com/RSS-Bridge/rss-bridge";

/// Default client identifier: name, version and project URL.
pub fn default_user_agent() -> String {
    format!(
        "{}/{} (+{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        PROJECT_URL
    )
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Self {
        let user_agent = user_agent
            .map(str::to_string)
            .unwrap_or_else(default_user_agent);

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), None)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BridgeError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::fetch(url.as_str(), e))?;

        tracing::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body.to_vec())
    }
}
