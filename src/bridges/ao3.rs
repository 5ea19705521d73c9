//! Archive of Our Own: work listings, bookmarks and a single work's chapters.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::bridge::{
    Bridge, BridgeDescriptor, Collected, ContextSpec, Identity, ParameterSpec, ResolvedContext,
};
use crate::domain::Item;
use crate::normalizer::{dates, html, links};
use crate::pipeline::Pipeline;

const URI: &str = "https://archiveofourown.org/";
const DATE_FORMATS: &[&str] = &["%d %b %Y", "%Y-%m-%d"];
const DOWNLOAD_FORMATS: &[&str] = &["azw3", "epub", "mobi", "pdf", "html"];

const RANGES: &[(&str, &str)] = &[
    ("None", "none"),
    ("First", "first"),
    ("Latest", "last"),
    ("Entire work", "all"),
];

static CONTEXTS: &[ContextSpec] = &[
    ContextSpec {
        name: "List",
        parameters: &[
            ParameterSpec::text("url", "url")
                .required()
                .example("https://archiveofourown.org/works?work_search[complete]=T&tag_id=F*s*F"),
            ParameterSpec::text("range", "Chapter Content")
                .values(RANGES)
                .default_value("none"),
        ],
    },
    ContextSpec {
        name: "Bookmarks",
        parameters: &[ParameterSpec::text("user", "user").required().example("Nyaaru")],
    },
    ContextSpec {
        name: "Work",
        parameters: &[ParameterSpec::text("id", "id").required().example("18181853")],
    },
];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "AO3",
    name: "AO3",
    uri: URI,
    description: "Returns works or chapters from Archive of Our Own",
    maintainer: "Obsidienne",
    cache_timeout: Duration::from_secs(1800),
    contexts: CONTEXTS,
};

/// Which chapters of each listed work to inline into its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterRange {
    None,
    First,
    Last,
    All,
}

impl ChapterRange {
    fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("first") => Self::First,
            Some("last") => Self::Last,
            Some("all") => Self::All,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ao3Context {
    List { url: Url, range: ChapterRange },
    Bookmarks { user: String },
    Work { id: u64 },
}

impl Ao3Context {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "List",
            Self::Bookmarks { .. } => "Bookmarks",
            Self::Work { .. } => "Work",
        }
    }

    fn url(&self) -> Result<Url> {
        let base = Url::parse(URI)?;
        Ok(match self {
            Self::List { url, .. } => url.clone(),
            Self::Bookmarks { user } => base.join(&format!(
                "users/{}/bookmarks?bookmark_search[sort_column]=bookmarkable_date",
                user
            ))?,
            Self::Work { id } => base.join(&format!("works/{}", id))?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ao3Bridge;

#[async_trait]
impl Bridge for Ao3Bridge {
    type Context = Ao3Context;

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, resolved: &ResolvedContext) -> Result<Ao3Context> {
        let bridge = DESCRIPTOR.id;
        match resolved.name {
            "List" => {
                let raw = resolved.require(bridge, "url")?;
                let url = Url::parse(raw)
                    .ok()
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .ok_or_else(|| {
                        BridgeError::config(bridge, format!("'{}' is not an absolute http(s) URL", raw))
                    })?;
                Ok(Ao3Context::List {
                    url,
                    range: ChapterRange::from_value(resolved.get("range")),
                })
            }
            "Bookmarks" => {
                let user = resolved.require(bridge, "user")?;
                if !user
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(BridgeError::config(bridge, format!("invalid user name '{}'", user)));
                }
                Ok(Ao3Context::Bookmarks {
                    user: user.to_string(),
                })
            }
            "Work" => {
                let raw = resolved.require(bridge, "id")?;
                let id = raw.parse().map_err(|_| {
                    BridgeError::config(bridge, format!("work id must be numeric, got '{}'", raw))
                })?;
                Ok(Ao3Context::Work { id })
            }
            other => Err(BridgeError::config(bridge, format!("unknown context {}", other))),
        }
    }

    fn identity(&self, context: &Ao3Context) -> Identity {
        match context.url() {
            Ok(url) => identity(context, &url, None),
            Err(_) => DESCRIPTOR.default_identity(),
        }
    }

    async fn collect(&self, context: &Ao3Context, pipeline: &Pipeline) -> Result<Collected> {
        let url = context.url()?;
        let (title, items) = match context {
            Ao3Context::List { range, .. } => collect_list(pipeline, &url, *range).await?,
            Ao3Context::Bookmarks { .. } => collect_list(pipeline, &url, ChapterRange::None).await?,
            Ao3Context::Work { .. } => collect_work(pipeline, &url).await?,
        };
        Ok(Collected::new(identity(context, &url, title.as_deref()), items))
    }
}

fn identity(context: &Ao3Context, url: &Url, title: Option<&str>) -> Identity {
    let mut name = format!("{} {}", DESCRIPTOR.name, context.name());
    if let Some(title) = title {
        name.push_str(" - ");
        name.push_str(title);
    }
    Identity {
        name,
        uri: url.to_string(),
        icon: DESCRIPTOR.default_icon(),
    }
}

async fn collect_list(
    pipeline: &Pipeline,
    url: &Url,
    range: ChapterRange,
) -> Result<(Option<String>, Vec<Item>)> {
    let body = pipeline.fetch_text(url).await?;
    let listing = parse_listing(&body, url)?;

    if listing.skipped > 0 {
        tracing::warn!("Skipped {} listing entries without a title in {}", listing.skipped, url);
        for _ in 0..listing.skipped {
            pipeline.stats().record_skipped();
        }
    }

    let items = if range == ChapterRange::None {
        listing.items
    } else {
        pipeline
            .map_ordered(listing.items, |item| attach_chapters(pipeline, item, range))
            .await
    };

    Ok((listing.title, items))
}

/// Append the selected chapters to a listed work. Any failure leaves the
/// item with its listing content.
async fn attach_chapters(pipeline: &Pipeline, mut item: Item, range: ChapterRange) -> Item {
    match fetch_workskin(pipeline, &item.uri, range).await {
        Ok(Some(workskin)) => {
            let listing = item.content.take().unwrap_or_default();
            item.content = Some(listing + &workskin);
        }
        Ok(None) => {
            tracing::warn!("No chapter content found for {}", item.uri);
            pipeline.stats().record_enrichment_failure();
        }
        Err(e) => {
            tracing::warn!("Could not load chapters for {}: {}", item.uri, e);
            pipeline.stats().record_enrichment_failure();
        }
    }
    item
}

async fn fetch_workskin(
    pipeline: &Pipeline,
    work: &Url,
    range: ChapterRange,
) -> Result<Option<String>> {
    let target = match range {
        ChapterRange::None => return Ok(None),
        ChapterRange::First => work.clone(),
        ChapterRange::All => full_work_url(work),
        ChapterRange::Last => {
            let navigate = navigate_url(work);
            let page = pipeline.fetch_cached_text(&navigate).await?;
            let (_, chapters) = parse_navigation(&page, &navigate)?;
            match chapters.last() {
                Some(chapter) => chapter.uri.clone(),
                None => return Err(BridgeError::parse(navigate.as_str(), "empty chapter index")),
            }
        }
    };

    let page = pipeline.fetch_cached_text(&target).await?;
    workskin(&page)
}

async fn collect_work(pipeline: &Pipeline, url: &Url) -> Result<(Option<String>, Vec<Item>)> {
    let navigate = navigate_url(url);
    let navigation = pipeline.fetch_text(&navigate).await?;
    let full_work = pipeline.fetch_text(&full_work_url(url)).await?;

    let (title, chapters) = parse_navigation(&navigation, &navigate)?;
    let numbers: Vec<usize> = chapters.iter().map(|c| c.number).collect();
    let bodies = chapter_bodies(&full_work, &numbers)?;

    let items = chapters
        .into_iter()
        .zip(bodies)
        .map(|(chapter, body)| {
            Item::new(chapter.title, chapter.uri)
                .with_version(&[&chapter.date])
                .with_timestamp(Some(dates::parse_or_now(&chapter.date, DATE_FORMATS)))
                .with_content(body)
        })
        .rev()
        .collect();

    Ok((title, items))
}

fn navigate_url(work: &Url) -> Url {
    let mut url = work.clone();
    url.set_path(&format!("{}/navigate", work.path().trim_end_matches('/')));
    url.set_query(None);
    url
}

fn full_work_url(work: &Url) -> Url {
    let mut url = work.clone();
    url.set_query(Some("view_full_work=true"));
    url
}

/// Predictable download links for `/works/<id>` URIs.
fn download_links(work: &Url) -> Vec<Url> {
    let Some(mut segments) = work.path_segments() else {
        return Vec::new();
    };
    let (Some("works"), Some(id)) = (segments.next(), segments.next()) else {
        return Vec::new();
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Vec::new();
    }

    DOWNLOAD_FORMATS
        .iter()
        .filter_map(|ext| Url::parse(&format!("{}downloads/{}/work.{}", URI, id, ext)).ok())
        .collect()
}

struct Listing {
    title: Option<String>,
    items: Vec<Item>,
    skipped: usize,
}

/// A page with neither a heading nor a work index is not a listing (login
/// walls, rate limiting) and fails the run.
fn parse_listing(body: &str, url: &Url) -> Result<Listing> {
    let base = Url::parse(URI)?;
    let doc = Html::parse_document(body);
    let heading = html::selector("#main > h2")?;
    let tag = html::selector("a.tag")?;
    let index = html::selector(".index.group")?;
    let entry = html::selector(".index.group > li")?;
    let title_link = html::selector("div h4 a")?;
    let datetime = html::selector("div p.datetime")?;
    let chapters = html::selector("dl dd.chapters")?;

    let title = doc
        .select(&heading)
        .next()
        .map(|h| html::first_text(h, &tag).unwrap_or_else(|| html::text(h)));
    if title.is_none() && doc.select(&index).next().is_none() {
        return Err(BridgeError::parse(url.as_str(), "no work index"));
    }

    let mut items = Vec::new();
    let mut skipped = 0;

    for li in doc.select(&entry) {
        let uri = li
            .select(&title_link)
            .next()
            .and_then(|a| Some((a, a.value().attr("href")?)))
            .and_then(|(a, href)| Some((a, links::absolutize(&base, href).ok()?)));
        let Some((link, uri)) = uri else {
            skipped += 1;
            continue;
        };

        let date = html::first_text(li, &datetime).unwrap_or_default();
        let chapter_count = html::first_text(li, &chapters).unwrap_or_else(|| "0".to_string());
        let enclosures = download_links(&uri);

        let mut item = Item::new(html::text(link), uri)
            .with_version(&[&date, &chapter_count])
            .with_timestamp(Some(dates::parse_or_now(&date, DATE_FORMATS)))
            .with_content(Some(links::absolutize_html(&li.html(), &base)));
        for enclosure in enclosures {
            item = item.with_enclosure(enclosure);
        }
        items.push(item);
    }

    Ok(Listing {
        title,
        items,
        skipped,
    })
}

struct ChapterLink {
    number: usize,
    title: String,
    uri: Url,
    date: String,
}

/// Work title and chapter index from a `/navigate` page.
fn parse_navigation(body: &str, url: &Url) -> Result<(Option<String>, Vec<ChapterLink>)> {
    let base = Url::parse(URI)?;
    let doc = Html::parse_document(body);
    let heading = html::selector("h2 a")?;
    let index = html::selector("ol.index.group")?;
    let entry = html::selector("ol.index.group > li")?;
    let link = html::selector("a")?;
    let datetime = html::selector("span.datetime")?;

    if doc.select(&index).next().is_none() {
        return Err(BridgeError::parse(url.as_str(), "no chapter index"));
    }
    let title = doc.select(&heading).next().map(html::text);

    let chapters = doc
        .select(&entry)
        .enumerate()
        .filter_map(|(i, li)| {
            let a = li.select(&link).next()?;
            let uri = links::absolutize(&base, a.value().attr("href")?).ok()?;
            let date = html::first_text(li, &datetime)
                .unwrap_or_default()
                .replace(['(', ')'], "");
            Some(ChapterLink {
                number: i + 1,
                title: html::text(a),
                uri,
                date,
            })
        })
        .collect();

    Ok((title, chapters))
}

/// `#chapter-N` sections of the full-work page, with absolute links.
fn chapter_bodies(body: &str, numbers: &[usize]) -> Result<Vec<Option<String>>> {
    let base = Url::parse(URI)?;
    let doc = Html::parse_document(body);
    numbers
        .iter()
        .map(|n| {
            let sel = html::selector(&format!("#chapter-{}", n))?;
            Ok(doc
                .select(&sel)
                .next()
                .map(|chapter| links::absolutize_html(&chapter.html(), &base)))
        })
        .collect()
}

fn workskin(body: &str) -> Result<Option<String>> {
    let base = Url::parse(URI)?;
    let doc = Html::parse_document(body);
    let sel = html::selector("#workskin")?;
    Ok(doc
        .select(&sel)
        .next()
        .map(|skin| links::absolutize_html(&skin.html(), &base)))
}
