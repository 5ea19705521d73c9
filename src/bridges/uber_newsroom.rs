//! Uber Newsroom, through the newsroom's WordPress JSON API.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::bridge::{
    Bridge, BridgeDescriptor, Collected, ContextSpec, Identity, ParameterSpec, ResolvedContext,
};
use crate::domain::Item;
use crate::normalizer::{dates, links};
use crate::pipeline::Pipeline;

const URI: &str = "https://www.uber.com";
const DATA_API: &str = "https://newsroomapi.uber.com/wp-json/newsroom/v1/data?locale=";
const POST_API: &str = "https://newsroomapi.uber.com/wp-json/wp/v2/posts/";

/// WordPress `date` is local time without an offset.
const DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S"];

const REGIONS: &[(&str, &str)] = &[
    ("Egypt", "en-EG"),
    ("Ghana", "en-GH"),
    ("Kenya", "en-KE"),
    ("Morocco", "en-MA"),
    ("Nigeria", "en-NG"),
    ("South Africa", "en-ZA"),
    ("Tanzania", "en-TZ"),
    ("Uganda", "en-UG"),
    ("Bangladesh", "en-BD"),
    ("Cambodia", "en-KH"),
    ("China", "en-CN"),
    ("Hong Kong", "en-HK"),
    ("India", "en-IN"),
    ("Indonesia", "en-ID"),
    ("Japan", "ja-JP"),
    ("Korea", "en-KR"),
    ("Macau", "en-MO"),
    ("Malaysia", "en-MY"),
    ("Myanmar", "en-MM"),
    ("Philippines", "en-PH"),
    ("Singapore", "en-SG"),
    ("Sri Lanka", "en-LK"),
    ("Taiwan", "en-TW"),
    ("Thailand", "en-TH"),
    ("Vietnam", "en-VN"),
    ("Costa Rica", "es-CR"),
    ("Dominican Republic", "es-DO"),
    ("El Salvador", "es-SV"),
    ("Guatemala", "es-GT"),
    ("Honduras", "en-HN"),
    ("Mexico", "es-MX"),
    ("Nicaragua", "es-NI"),
    ("Panama", "es-PA"),
    ("Puerto Rico", "en-PR"),
    ("Austria", "de-AT"),
    ("Azerbaijan", "az"),
    ("Belarus", "ru-BY"),
    ("Belgium", "en-BE"),
    ("Bulgaria", "en-BG"),
    ("Croatia", "hr"),
    ("Czech Republic", "cs-CZ"),
    ("Denmark", "en-DK"),
    ("Estonia", "en-EE"),
    ("Finland", "en-FI"),
    ("France", "en-FR"),
    ("Germany", "en-DE"),
    ("Greece", "en-GR"),
    ("Hungary", "en-HU"),
    ("Ireland", "en-IE"),
    ("Italy", "en-IT"),
    ("Kazakhstan", "ru-KZ"),
    ("Lithuania", "en-LT"),
    ("Netherlands", "en-NL"),
    ("Norway", "en-NO"),
    ("Poland", "pl"),
    ("Portugal", "en-PT"),
    ("Romania", "en-RO"),
    ("Russia", "ru"),
    ("Slovakia", "sk"),
    ("Spain", "es-ES"),
    ("Sweden", "en-SE"),
    ("Switzerland", "en-CH"),
    ("Turkey", "en-TR"),
    ("Ukraine", "uk-UA"),
    ("United Kingdom", "en-GB"),
    ("Bahrain", "en-BH"),
    ("Israel", "en-IL"),
    ("Jordan", "en-JO"),
    ("Kuwait", "en-KW"),
    ("Lebanon", "en-LB"),
    ("Pakistan", "en-PK"),
    ("Qatar", "en-QA"),
    ("Saudi Arabia", "en-SA"),
    ("United Arab Emirates", "en-AE"),
    ("Canada", "en-CA"),
    ("United States", "en-US"),
    ("Australia", "en-AU"),
    ("New Zealand", "en-NZ"),
    ("Argentina", "es-AR"),
    ("Bolivia", "es-BO"),
    ("Brazil", "pt-BR"),
    ("Chile", "es-CL"),
    ("Colombia", "es-CO"),
    ("Ecuador", "es-EC"),
    ("Paraguay", "en-PY"),
    ("Peru", "es-PE"),
    ("Trinidad & Tobago", "en-TT"),
    ("Uruguay", "es-UY"),
    ("Venezuela", "en-VE"),
];

static CONTEXTS: &[ContextSpec] = &[ContextSpec {
    name: "Region",
    parameters: &[ParameterSpec::text("region", "Region")
        .values(REGIONS)
        .default_value("en-US")],
}];

pub static DESCRIPTOR: BridgeDescriptor = BridgeDescriptor {
    id: "UberNewsroom",
    name: "Uber Newsroom",
    uri: URI,
    description: "Returns news posts",
    maintainer: "VerifiedJoseph",
    cache_timeout: Duration::from_secs(3600),
    contexts: CONTEXTS,
};

static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div\b[^>]*>"#).expect("div pattern is valid"));

static WP_VIDEO_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bclass\s*=\s*"[^"]*\bwp-video\b"#).expect("wp-video pattern is valid")
});

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+style\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("style pattern is valid")
});

static VIDEO_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<video\b([^>]*)>"#).expect("video pattern is valid"));

static SIZE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s(?:width|height)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("size attribute pattern is valid")
});

#[derive(Debug, Deserialize)]
struct NewsroomData {
    region: Region,
    #[serde(default)]
    articles: Vec<ArticleRef>,
}

#[derive(Debug, Deserialize)]
struct Region {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArticleRef {
    id: u64,
    #[serde(default)]
    image_full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: Rendered,
    date: String,
    link: String,
    content: Rendered,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    rendered: String,
}

/// Locale code such as `en-US`, validated against the region list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(String);

impl Locale {
    fn newsroom(&self) -> Result<Url> {
        Ok(Url::parse(URI)?.join(&format!("/{}/newsroom", self.0))?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UberNewsroomBridge;

#[async_trait]
impl Bridge for UberNewsroomBridge {
    type Context = Locale;

    fn descriptor(&self) -> &'static BridgeDescriptor {
        &DESCRIPTOR
    }

    fn parse_context(&self, resolved: &ResolvedContext) -> Result<Locale> {
        Ok(Locale(resolved.require(DESCRIPTOR.id, "region")?.to_string()))
    }

    fn identity(&self, locale: &Locale) -> Identity {
        Identity {
            uri: locale
                .newsroom()
                .map(String::from)
                .unwrap_or_else(|_| URI.to_string()),
            ..DESCRIPTOR.default_identity()
        }
    }

    async fn collect(&self, locale: &Locale, pipeline: &Pipeline) -> Result<Collected> {
        let data_url = Url::parse(&format!("{}{}", DATA_API, locale.0))?;
        let data: NewsroomData = pipeline.fetch_json(&data_url, false).await?;

        tracing::debug!(
            "{} newsroom lists {} articles",
            data.region.name,
            data.articles.len()
        );

        let items = pipeline
            .map_ordered(data.articles, |article| load_post(pipeline, article))
            .await
            .into_iter()
            .flatten()
            .collect();

        let identity = Identity {
            name: format!("{} - {}", data.region.name, DESCRIPTOR.name),
            ..self.identity(locale)
        };
        Ok(Collected::new(identity, items))
    }
}

/// One post API call. A failed or malformed post is dropped.
async fn load_post(pipeline: &Pipeline, article: ArticleRef) -> Option<Item> {
    let post = match post_url(article.id) {
        Ok(url) => pipeline.fetch_json::<Post>(&url, true).await,
        Err(e) => Err(e),
    };

    let item = post.and_then(|post| to_item(post, article.image_full.as_deref()));
    match item {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!("Skipping newsroom post {}: {}", article.id, e);
            pipeline.stats().record_enrichment_failure();
            None
        }
    }
}

fn post_url(id: u64) -> Result<Url> {
    Ok(Url::parse(&format!("{}{}", POST_API, id))?)
}

fn to_item(post: Post, image: Option<&str>) -> Result<Item> {
    let uri = Url::parse(&post.link).map_err(|e| BridgeError::parse(post.link.as_str(), e))?;
    let title = html_escape::decode_html_entities(&post.title.rendered).into_owned();
    let content = links::absolutize_html(&format_content(&post.content.rendered), &uri);

    let mut item = Item::new(title, uri)
        .with_timestamp(Some(dates::parse_or_now(&post.date, DATE_FORMATS)))
        .with_content(Some(content));
    if let Some(image) = image.and_then(|src| Url::parse(src).ok()) {
        item = item.with_enclosure(image);
    }
    Ok(item)
}

/// Let embedded videos use the reader's width.
fn format_content(html: &str) -> String {
    let unstyled = DIV_TAG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        if WP_VIDEO_CLASS.is_match(tag) {
            STYLE_ATTR.replace_all(tag, "").into_owned()
        } else {
            tag.to_string()
        }
    });
    VIDEO_TAG
        .replace_all(&unstyled, |caps: &Captures| {
            let attrs = SIZE_ATTR.replace_all(&caps[1], "");
            format!(r#"<video width="100%"{}>"#, attrs)
        })
        .into_owned()
}
