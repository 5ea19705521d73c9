pub mod http_fetcher;
pub mod limiter;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use limiter::HostLimiter;

/// Outbound GET. Implementations must bound every request with a timeout and
/// report non-success statuses as [`BridgeError::Fetch`](crate::app::BridgeError::Fetch).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}
