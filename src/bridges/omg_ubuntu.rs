use async_trait::async_trait;
use url::Url;

use crate::app::Result;
use crate::bridge::{Bridge, BridgeDescriptor, Collected, ContextSpec, ResolvedContext};
use crate::expander::{ContentExtractor, FeedExpander};
use crate::pipeline::{Pipeline, DEFAULT_TTL};

const FEED: &str = "http://feeds.feedburner.com/d0od";

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "Latest",
    parameters: &[],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "OMGUbuntu",
    name: "OMG! Ubuntu! News",
    uri: "https://omgubuntu.com/",
    description: "News about Ubuntu, Linux and open-source software.",
    maintainer: "t0stiman",
    cache_timeout: DEFAULT_TTL,
    contexts: CONTEXTS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OmgUbuntuBridge;

fn expander() -> Result<FeedExpander> {
    let extractor = ContentExtractor::new("div.post-content")
        .removing("ul.omg-socials")
        .removing("div.post-links");
    Ok(FeedExpander::new(Url::parse(FEED)?).with_extractor(extractor))
}

#[async_trait]
impl Bridge for OmgUbuntuBridge {
    type Context = ();

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, _resolved: &ResolvedContext) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, _context: &(), pipeline: &Pipeline) -> Result<Collected> {
        let expanded = expander()?.expand(pipeline).await?;
        Ok(Collected::new(DESCRIPTOR.default_identity(), expanded.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bridges::testing::{assert_absolute, run};
    use crate::fetcher::mock::MockFetcher;

    const RSS: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>OMG! Ubuntu!</title>
        <item><title>Ubuntu 24.04 released</title><link>https://www.omgubuntu.co.uk/2024/04/noble</link>
          <guid>noble</guid><description>teaser</description><category>News</category></item>
        </channel></rss>"#;

    const ARTICLE: &str = r#"<html><body><div class="post-content">
        <p>Noble Numbat is here. <img src="/wp-content/noble.png"></p>
        <ul class="omg-socials"><li>Share</li></ul>
        <div class="post-links"><a href="/tag/ubuntu">ubuntu</a></div>
        </div></body></html>"#;

    #[tokio::test]
    async fn test_article_body_replaces_teaser() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(FEED, RSS)
                .with_page("https://www.omgubuntu.co.uk/2024/04/noble", ARTICLE),
        );

        let collected = run(&OmgUbuntuBridge, &[], fetcher).await.unwrap();

        assert_eq!(collected.items.len(), 1);
        let item = &collected.items[0];
        assert_eq!(item.title, "Ubuntu 24.04 released");
        assert!(item.categories.contains("News"));
        let content = item.content.as_deref().unwrap();
        assert!(content.contains("Noble Numbat"));
        assert!(content.contains("https://www.omgubuntu.co.uk/wp-content/noble.png"));
        assert!(!content.contains("Share"));
        assert!(!content.contains("/tag/ubuntu"));
        assert_absolute(&collected);
    }
}
