//! GQ Magazine sections and author pages.
//!
//! GQ generates its CSS class names, so articles are discovered structurally:
//! every link inside `main` that carries an `h2` is an article teaser.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::bridge::{
    Bridge, BridgeDescriptor, Collected, ContextSpec, Identity, ParameterSpec, ResolvedContext,
};
use crate::domain::Item;
use crate::normalizer::{dates, html, links};
use crate::pipeline::Pipeline;

const DOMAINS: &[(&str, &str)] = &[("www.gqmagazine.fr", "www.gqmagazine.fr")];

const MISSING_BODY: &str = "<strong>Article body couldn't be loaded</strong>. It must be a bug!";

static LAZY_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdata-original(\s*=)"#).expect("lazy image pattern is valid")
});

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "Section",
    parameters: &[
        ParameterSpec::text("domain", "Domain to use")
            .values(DOMAINS)
            .default_value("www.gqmagazine.fr"),
        ParameterSpec::text("page", "Initial page to load")
            .required()
            .example("journaliste/maia-mazaurette"),
    ],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "GQMagazine",
    name: "GQMagazine",
    uri: "https://www.gqmagazine.fr",
    description: "GQMagazine section extractor bridge. Returns the articles listed on one page.",
    maintainer: "Riduidel",
    cache_timeout: Duration::from_secs(7200),
    contexts: CONTEXTS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GqPage {
    site: Url,
    page: Url,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GqMagazineBridge;

#[async_trait]
impl Bridge for GqMagazineBridge {
    type Context = GqPage;

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, resolved: &ResolvedContext) -> Result<GqPage> {
        let bridge = DESCRIPTOR.id;
        let domain = resolved.require(bridge, "domain")?;
        let page = resolved.require(bridge, "page")?.trim_start_matches('/');
        if page.contains("://") || page.starts_with("//") {
            return Err(BridgeError::config(bridge, "page must be relative to the domain"));
        }

        let site = Url::parse(&format!("https://{}/", domain))?;
        let page = site.join(page)?;
        Ok(GqPage { site, page })
    }

    fn identity(&self, context: &GqPage) -> Identity {
        Identity {
            name: DESCRIPTOR.name.to_string(),
            uri: context.page.to_string(),
            icon: context.site.join("/favicon.ico").ok().map(String::from),
        }
    }

    async fn collect(&self, context: &GqPage, pipeline: &Pipeline) -> Result<Collected> {
        let body = pipeline.fetch_text(&context.page).await?;
        let teasers = parse_section(&body, &context.site)?;

        let items = pipeline
            .map_ordered(teasers, |item| load_article(pipeline, item))
            .await;

        Ok(Collected::new(self.identity(context), items))
    }
}

async fn load_article(pipeline: &Pipeline, item: Item) -> Item {
    let body = match pipeline.fetch_cached_text(&item.uri).await {
        Ok(page) => article_body(&page, &item.uri),
        Err(e) => Err(e),
    };

    let content = match body {
        Ok(Some(content)) => content,
        Ok(None) => {
            tracing::warn!("No article body section in {}", item.uri);
            pipeline.stats().record_enrichment_failure();
            MISSING_BODY.to_string()
        }
        Err(e) => {
            tracing::warn!("Could not load article {}: {}", item.uri, e);
            pipeline.stats().record_enrichment_failure();
            MISSING_BODY.to_string()
        }
    };
    item.with_content(Some(content))
}

fn parse_section(body: &str, site: &Url) -> Result<Vec<Item>> {
    let doc = Html::parse_document(body);
    let main = html::selector("main")?;
    let anchor = html::selector("a[href]")?;
    let heading = html::selector("h2")?;
    let author = html::selector("span[itemprop=name]")?;
    let time = html::selector("time")?;

    let Some(main) = doc.select(&main).next() else {
        return Err(BridgeError::parse(site.as_str(), "page has no main element"));
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for link in main.select(&anchor) {
        let Some(title) = html::first_text(link, &heading) else {
            continue;
        };
        let Some(uri) = link
            .value()
            .attr("href")
            .and_then(|href| links::absolutize(site, href).ok())
        else {
            continue;
        };
        if !seen.insert(uri.clone()) {
            continue;
        }

        let datetime = html::first_attr(link, &time, "datetime").unwrap_or_default();
        let timestamp = dates::parse_or_now(&datetime, &["%Y-%m-%d"]);

        items.push(
            Item::new(title, uri)
                .with_author(html::first_text(link, &author))
                .with_timestamp(Some(timestamp)),
        );
    }

    Ok(items)
}

/// Inner markup of the first `ArticleBodySection*` div, lazy images
/// promoted to `src` and links made absolute.
fn article_body(page: &str, base: &Url) -> Result<Option<String>> {
    let doc = Html::parse_document(page);
    let section = html::selector(r#"div[class*="ArticleBodySection"]"#)?;

    Ok(doc.select(&section).next().map(|div| {
        let inner = div.inner_html();
        let promoted = LAZY_SRC.replace_all(&inner, "src$1");
        links::absolutize_html(&promoted, base)
    }))
}
