use scraper::{Html, Selector};
use url::Url;

use crate::app::Result;
use crate::normalizer::{html, links};

/// Pulls the article region out of a full page.
///
/// Content selectors are tried in order; the first match wins. Elements
/// matching a remove selector are cut from the extracted region.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    content_selectors: Vec<String>,
    remove_selectors: Vec<String>,
}

impl ContentExtractor {
    pub fn new(content_selector: impl Into<String>) -> Self {
        Self {
            content_selectors: vec![content_selector.into()],
            remove_selectors: vec!["script".to_string(), "style".to_string()],
        }
    }

    pub fn or_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selectors.push(selector.into());
        self
    }

    pub fn removing(mut self, selector: impl Into<String>) -> Self {
        self.remove_selectors.push(selector.into());
        self
    }

    /// Extract the content region of `page` with links made absolute
    /// against `base`. `Ok(None)` when no content selector matches.
    pub fn extract(&self, page: &str, base: &Url) -> Result<Option<String>> {
        let content = self.compile(&self.content_selectors)?;
        let remove = self.compile(&self.remove_selectors)?;
        let doc = Html::parse_document(page);

        let Some(region) = content.iter().find_map(|sel| doc.select(sel).next()) else {
            return Ok(None);
        };

        let mut extracted = region.inner_html();
        for sel in &remove {
            for unwanted in region.select(sel) {
                extracted = extracted.replace(&unwanted.html(), "");
            }
        }

        Ok(Some(links::absolutize_html(extracted.trim(), base)))
    }

    fn compile(&self, selectors: &[String]) -> Result<Vec<Selector>> {
        selectors.iter().map(|css| html::selector(css)).collect()
    }
}
