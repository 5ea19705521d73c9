use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::fetcher::Fetcher;

/// Canned responses keyed by URL, with a per-URL call log.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, std::result::Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.responses.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(status)) => Err(BridgeError::fetch(url.as_str(), format!("HTTP {}", status))),
            None => Err(BridgeError::fetch(url.as_str(), "HTTP 404 Not Found")),
        }
    }
}
