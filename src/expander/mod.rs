//! Feed expansion: an upstream RSS/Atom feed used as raw input.
//!
//! ```text
//! feed URL → fetch (fatal) → parse_feed → [fetch_cached(link) → extract] → Item
//! ```
//!
//! Each entry's link can be re-fetched through the cache and its content
//! region extracted, replacing the teaser the feed carries. A failed
//! enrichment falls back to the upstream content and never fails the run.

mod extractor;

pub use extractor::ContentExtractor;

use chrono::Utc;
use url::Url;

use crate::app::Result;
use crate::domain::Item;
use crate::normalizer::{self, FeedEntry, FeedMeta};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct FeedExpander {
    feed_url: Url,
    extractor: Option<ContentExtractor>,
}

/// The upstream feed's metadata and its entries as items, in feed order.
#[derive(Debug, Clone)]
pub struct Expanded {
    pub meta: FeedMeta,
    pub items: Vec<Item>,
}

impl FeedExpander {
    pub fn new(feed_url: Url) -> Self {
        Self {
            feed_url,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub async fn expand(&self, pipeline: &Pipeline) -> Result<Expanded> {
        let body = pipeline.fetch(&self.feed_url).await?;
        let (meta, entries) = normalizer::parse_feed(&self.feed_url, &body)?;

        let linked: Vec<(Url, FeedEntry)> = entries
            .into_iter()
            .filter_map(|entry| match entry.link.clone() {
                Some(link) => Some((link, entry)),
                None => {
                    tracing::warn!("Skipping entry {:?} without a link", entry.id);
                    pipeline.stats().record_skipped();
                    None
                }
            })
            .collect();

        tracing::debug!(
            "Expanding {} entries from {}",
            linked.len(),
            self.feed_url
        );

        let items = match &self.extractor {
            Some(extractor) => {
                pipeline
                    .map_ordered(linked, |(link, entry)| async move {
                        let content = enrich(pipeline, extractor, &link, &entry).await;
                        to_item(link, entry, content)
                    })
                    .await
            }
            None => linked
                .into_iter()
                .map(|(link, entry)| {
                    let content = entry.content.clone().or_else(|| entry.summary.clone());
                    to_item(link, entry, content)
                })
                .collect(),
        };

        Ok(Expanded { meta, items })
    }
}

async fn enrich(
    pipeline: &Pipeline,
    extractor: &ContentExtractor,
    link: &Url,
    entry: &FeedEntry,
) -> Option<String> {
    let fallback = || entry.content.clone().or_else(|| entry.summary.clone());

    let page = match pipeline.fetch_cached_text(link).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Enrichment fetch failed for {}: {}", link, e);
            pipeline.stats().record_enrichment_failure();
            return fallback();
        }
    };

    match extractor.extract(&page, link) {
        Ok(Some(content)) => Some(content),
        Ok(None) => {
            tracing::warn!("No content region found in {}", link);
            pipeline.stats().record_enrichment_failure();
            fallback()
        }
        Err(e) => {
            tracing::warn!("Extraction failed for {}: {}", link, e);
            pipeline.stats().record_enrichment_failure();
            fallback()
        }
    }
}

fn to_item(link: Url, entry: FeedEntry, content: Option<String>) -> Item {
    let title = entry.title.unwrap_or_else(|| link.to_string());
    let mut item = Item::new(title, link);
    if !entry.id.is_empty() {
        item = item.with_version(&[&entry.id]);
    }

    let mut item = item
        .with_timestamp(Some(entry.published.unwrap_or_else(Utc::now)))
        .with_author(entry.author)
        .with_content(content);
    for category in entry.categories {
        item = item.with_category(category);
    }
    for enclosure in entry.enclosures {
        item = item.with_enclosure(enclosure);
    }
    item
}
