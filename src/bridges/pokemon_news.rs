use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::app::Result;
use crate::bridge::{Bridge, BridgeDescriptor, Collected, ContextSpec, ResolvedContext};
use crate::domain::Item;
use crate::normalizer::{dates, html, links};
use crate::pipeline::{Pipeline, DEFAULT_TTL};

const NEWS: &str = "https://www.pokemon.com/us/pokemon-news";

/// e.g. "September 15, 2022"
const DATE_FORMATS: &[&str] = &["%B %d, %Y"];

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "Latest",
    parameters: &[],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "PokemonNews",
    name: "Pokemon.com news",
    uri: NEWS,
    description: "Fetches the latest news from pokemon.com",
    maintainer: "dvikan",
    cache_timeout: DEFAULT_TTL,
    contexts: CONTEXTS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PokemonNewsBridge;

#[async_trait]
impl Bridge for PokemonNewsBridge {
    type Context = ();

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, _resolved: &ResolvedContext) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, _context: &(), pipeline: &Pipeline) -> Result<Collected> {
        let url = Url::parse(NEWS)?;
        let body = pipeline.fetch_text(&url).await?;
        let (items, skipped) = parse_news(&body, &url)?;

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed news entries", skipped);
            for _ in 0..skipped {
                pipeline.stats().record_skipped();
            }
        }

        Ok(Collected::new(DESCRIPTOR.default_identity(), items))
    }
}

fn parse_news(body: &str, base: &Url) -> Result<(Vec<Item>, usize)> {
    let doc = Html::parse_document(body);
    let entry = html::selector(".news-list ul li")?;
    let heading = html::selector("h3")?;
    let description = html::selector("p.hidden-mobile")?;
    let date = html::selector("p.date")?;
    let tags = html::selector("p.tags")?;
    let link = html::selector("a")?;
    let picture = html::selector("img")?;

    let mut items = Vec::new();
    let mut skipped = 0;

    for li in doc.select(&entry) {
        let uri = html::first_attr(li, &link, "href")
            .and_then(|href| links::absolutize(base, &href).ok());
        let (Some(title), Some(uri)) = (html::first_text(li, &heading), uri) else {
            skipped += 1;
            continue;
        };

        let timestamp = dates::parse_or_now(
            &html::first_text(li, &date).unwrap_or_default(),
            DATE_FORMATS,
        );

        let image = html::first_attr(li, &picture, "src")
            .and_then(|src| links::absolutize(base, &src).ok())
            .map(|src| format!(r#"<img src="{}"><br><br>"#, src))
            .unwrap_or_default();
        let text = html::first_text(li, &description).unwrap_or_default();
        let content = format!("{}{}", image, html_escape::encode_text(&text));

        items.push(
            Item::new(title, uri)
                .with_timestamp(Some(timestamp))
                .with_category(html::first_text(li, &tags).unwrap_or_default())
                .with_content(Some(content)),
        );
    }

    Ok((items, skipped))
}
