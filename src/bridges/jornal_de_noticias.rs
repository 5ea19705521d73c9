//! Jornal de Notícias article cards. The cards carry no dates, so items
//! are emitted without a timestamp.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::bridge::{
    Bridge, BridgeDescriptor, Collected, ContextSpec, Identity, ParameterSpec, ResolvedContext,
};
use crate::domain::Item;
use crate::normalizer::{html, links};
use crate::pipeline::{Pipeline, DEFAULT_TTL};

const URI: &str = "https://jn.pt";
const ICON: &str = "https://static.globalnoticias.pt/jn/common/images/favicons/favicon-128.png";

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "URL",
    parameters: &[ParameterSpec::text("url", "URL (relative)").example("opiniao/catia-domingues.html")],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "JornalDeNoticias",
    name: "Jornal de Notícias (PT)",
    uri: URI,
    description: "Jornal de Notícias (JN.PT)",
    maintainer: "somini",
    cache_timeout: DEFAULT_TTL,
    contexts: CONTEXTS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct JornalDeNoticiasBridge;

#[async_trait]
impl Bridge for JornalDeNoticiasBridge {
    /// The page to list, on `jn.pt`.
    type Context = Url;

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, resolved: &ResolvedContext) -> Result<Url> {
        let site = Url::parse(URI)?;
        match resolved.get("url") {
            None => Ok(site),
            Some(path) if path.contains("://") || path.starts_with("//") => Err(
                BridgeError::config(DESCRIPTOR.id, format!("'{}' must be relative to {}", path, URI)),
            ),
            Some(path) => Ok(site.join(&format!("/{}", path.trim_start_matches('/')))?),
        }
    }

    fn identity(&self, page: &Url) -> Identity {
        Identity {
            name: DESCRIPTOR.name.to_string(),
            uri: page.to_string(),
            icon: Some(ICON.to_string()),
        }
    }

    async fn collect(&self, page: &Url, pipeline: &Pipeline) -> Result<Collected> {
        let body = pipeline.fetch_cached_text(page).await?;
        let (items, skipped) = parse_articles(&body)?;

        if skipped > 0 {
            tracing::warn!("Skipped {} articles without a headline on {}", skipped, page);
            for _ in 0..skipped {
                pipeline.stats().record_skipped();
            }
        }

        Ok(Collected::new(self.identity(page), items))
    }
}

fn parse_articles(body: &str) -> Result<(Vec<Item>, usize)> {
    let base = Url::parse(URI)?;
    let doc = Html::parse_document(body);
    let article = html::selector("article")?;
    let headline = html::selector("h2 a")?;
    let author = html::selector("h3 a")?;
    let snippet = html::selector("h4 a")?;

    let mut items = Vec::new();
    let mut skipped = 0;

    for element in doc.select(&article) {
        let entry = element.select(&headline).next().and_then(|a| {
            let uri = links::absolutize(&base, a.value().attr("href")?).ok()?;
            Some((html::text(a), uri))
        });
        let Some((title, uri)) = entry else {
            skipped += 1;
            continue;
        };

        items.push(
            Item::new(title, uri)
                .with_author(html::first_text(element, &author))
                .with_content(
                    html::first_text(element, &snippet)
                        .map(|text| html_escape::encode_text(&text).into_owned()),
                ),
        );
    }

    Ok((items, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bridges::testing::{assert_absolute, run};
    use crate::fetcher::mock::MockFetcher;

    const COLUMN: &str = "https://jn.pt/opiniao/catia-domingues.html";

    const PAGE: &str = r#"<html><body>
        <article><h2><a href="/opiniao/um.html">Um</a></h2><h3><a>Cátia</a></h3>
            <h4><a>Resumo &amp; mais</a></h4></article>
        <article><h2>Sem ligação</h2></article>
        <article><h2><a href="/opiniao/tres.html">Três</a></h2></article>
    </body></html>"#;

    #[tokio::test]
    async fn test_lists_articles_in_order() {
        let fetcher = Arc::new(MockFetcher::new().with_page(COLUMN, PAGE));

        let collected = run(
            &JornalDeNoticiasBridge,
            &[("url", "opiniao/catia-domingues.html")],
            fetcher,
        )
        .await
        .unwrap();

        let titles: Vec<&str> = collected.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Um", "Três"]);
        assert_eq!(collected.items[0].uri.as_str(), "https://jn.pt/opiniao/um.html");
        assert_eq!(collected.items[0].author.as_deref(), Some("Cátia"));
        assert_eq!(collected.items[0].content.as_deref(), Some("Resumo &amp; mais"));
        assert!(collected.items.iter().all(|i| i.timestamp.is_none()));
        assert_eq!(collected.identity.icon.as_deref(), Some(ICON));
        assert_eq!(collected.identity.uri, COLUMN);
        assert_absolute(&collected);
    }

    #[tokio::test]
    async fn test_front_page_without_url() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://jn.pt/", PAGE));
        let collected = run(&JornalDeNoticiasBridge, &[], fetcher).await.unwrap();
        assert_eq!(collected.items.len(), 2);
    }

    #[tokio::test]
    async fn test_absolute_url_rejected() {
        let fetcher = Arc::new(MockFetcher::new());
        let result = run(&JornalDeNoticiasBridge, &[("url", "https://evil.example/")], fetcher).await;
        assert!(matches!(result, Err(BridgeError::Config { .. })));
    }
}
