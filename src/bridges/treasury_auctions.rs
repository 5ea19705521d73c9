use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;
use crate::bridge::{Bridge, BridgeDescriptor, Collected, ContextSpec, Identity, ResolvedContext};
use crate::expander::FeedExpander;
use crate::pipeline::Pipeline;

const FEED: &str = "https://www.treasurydirect.gov/TA_WS/securities/auctioned/rss";

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "Latest",
    parameters: &[],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "TreasuryAuctionResults",
    name: "Treasury Auction Results",
    uri: FEED,
    description: "Provides auction results from the US Treasury",
    maintainer: "Kevin Saylor",
    cache_timeout: Duration::from_secs(3600),
    contexts: CONTEXTS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TreasuryAuctionsBridge;

#[async_trait]
impl Bridge for TreasuryAuctionsBridge {
    type Context = ();

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, _resolved: &ResolvedContext) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, _context: &(), pipeline: &Pipeline) -> Result<Collected> {
        let expanded = FeedExpander::new(Url::parse(FEED)?).expand(pipeline).await?;

        let identity = Identity {
            name: expanded
                .meta
                .title
                .unwrap_or_else(|| DESCRIPTOR.name.to_string()),
            ..DESCRIPTOR.default_identity()
        };
        Ok(Collected::new(identity, expanded.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::app::BridgeError;
    use crate::bridges::testing::run;
    use crate::fetcher::mock::MockFetcher;

    const RSS: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel>
        <title>Auctioned Securities</title>
        <item><title>13-Week Bill 912797KJ5</title>
          <link>https://www.treasurydirect.gov/instit/annceresult/press/preanre/2024/R_20240101_1.pdf</link>
          <pubDate>Mon, 01 Jan 2024 16:00:00 GMT</pubDate><description>High rate 5.2%</description></item>
        <item><title>No link</title><description>dropped</description></item>
        </channel></rss>"#;

    #[tokio::test]
    async fn test_feed_passes_through_without_enrichment() {
        let fetcher = Arc::new(MockFetcher::new().with_page(FEED, RSS));

        let collected = run(&TreasuryAuctionsBridge, &[], fetcher.clone()).await.unwrap();

        assert_eq!(collected.items.len(), 1);
        assert_eq!(collected.items[0].content.as_deref(), Some("High rate 5.2%"));
        assert!(collected.items[0].timestamp.is_some());
        assert_eq!(collected.identity.name, "Auctioned Securities");
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_feed_fails() {
        let fetcher = Arc::new(MockFetcher::new().with_status(FEED, 502));
        let result = run(&TreasuryAuctionsBridge, &[], fetcher).await;
        assert!(matches!(result, Err(BridgeError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_parameters_are_rejected() {
        let fetcher = Arc::new(MockFetcher::new());
        let result = run(&TreasuryAuctionsBridge, &[("id", "1")], fetcher).await;
        assert!(matches!(result, Err(BridgeError::Config { .. })));
    }
}
