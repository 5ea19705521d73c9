//! Turning raw bodies into normalized values.
//!
//! - [`parse_feed`]: RSS 0.9x/1.0/2.0, Atom and JSON Feed into [`FeedEntry`] values
//! - [`dates`]: free-text dates against known formats
//! - [`links`]: relative → absolute URL resolution
//! - [`html`]: selector and text helpers over `scraper`

pub mod dates;
pub mod html;
pub mod links;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;
use url::Url;

use crate::app::{BridgeError, Result};

/// Feed-level metadata.
#[derive(Debug, Clone, Default)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// One upstream feed entry before enrichment.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub id: String,
    pub title: Option<String>,
    pub link: Option<Url>,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub enclosures: Vec<Url>,
}

/// Parse a syndication feed. Links are resolved against `feed_url`.
pub fn parse_feed(feed_url: &Url, body: &[u8]) -> Result<(FeedMeta, Vec<FeedEntry>)> {
    let feed = parser::parse(body).map_err(|e| BridgeError::parse(feed_url.as_str(), e))?;

    let meta = FeedMeta {
        title: feed.title.map(|t| decode_html_entities(&t.content).to_string()),
        description: feed
            .description
            .map(|d| decode_html_entities(&d.content).to_string()),
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .and_then(|l| links::absolutize(feed_url, &l.href).ok());

            let enclosures = entry
                .media
                .iter()
                .flat_map(|media| media.content.iter())
                .filter_map(|content| content.url.as_ref())
                .filter_map(|url| links::absolutize(feed_url, url.as_str()).ok())
                .collect();

            FeedEntry {
                id: entry.id,
                title: entry
                    .title
                    .map(|t| decode_html_entities(&t.content).trim().to_string()),
                link,
                published: entry.published.or(entry.updated),
                summary: entry.summary.map(|s| decode_html_entities(&s.content).to_string()),
                content: entry.content.and_then(|c| c.body),
                author: entry.authors.first().map(|a| a.name.clone()),
                categories: entry
                    .categories
                    .into_iter()
                    .map(|c| c.label.unwrap_or(c.term))
                    .collect(),
                enclosures,
            }
        })
        .collect();

    Ok((meta, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <description>A test feed</description>
    <item>
      <title>Test Item 1 &amp; more</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>This is item 1</description>
      <category>Linux</category>
      <enclosure url="https://example.com/a.mp3" length="1" type="audio/mpeg"/>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>/item2</link>
      <guid>item-2</guid>
      <description>This is item 2</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <subtitle>An Atom test feed</subtitle>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
    <author><name>Jane</name></author>
  </entry>
</feed>"#;

    fn feed_url() -> Url {
        Url::parse("https://example.com/feed.xml").unwrap()
    }

    #[test]
    fn test_parse_rss() {
        let (meta, entries) = parse_feed(&feed_url(), RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(meta.title, Some("Test Feed".into()));
        assert_eq!(meta.description, Some("A test feed".into()));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, Some("Test Item 1 & more".into()));
        assert_eq!(
            entries[0].link.as_ref().map(Url::as_str),
            Some("https://example.com/item1")
        );
        assert!(entries[0].published.is_some());
        assert_eq!(entries[0].summary, Some("This is item 1".into()));
        assert_eq!(entries[0].categories, vec!["Linux".to_string()]);
        assert_eq!(entries[0].enclosures.len(), 1);
    }

    #[test]
    fn test_relative_entry_link_resolved() {
        let (_, entries) = parse_feed(&feed_url(), RSS_SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            entries[1].link.as_ref().map(Url::as_str),
            Some("https://example.com/item2")
        );
    }

    #[test]
    fn test_parse_atom() {
        let (meta, entries) = parse_feed(&feed_url(), ATOM_SAMPLE.as_bytes()).unwrap();

        assert_eq!(meta.title, Some("Atom Test Feed".into()));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, Some("Atom Entry 1".into()));
        assert_eq!(entries[0].author, Some("Jane".into()));
        assert!(entries[0].published.is_some());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = parse_feed(&feed_url(), b"<html>not a feed</html>").unwrap_err();
        assert!(matches!(err, BridgeError::Parse { .. }));
    }
}
