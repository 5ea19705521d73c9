//! Small helpers over `scraper`.
//!
//! `scraper::Html` is not `Send`, so parsing is kept in synchronous functions
//! that return owned data; documents never live across an `.await`.

use scraper::{ElementRef, Selector};

use crate::app::{BridgeError, Result};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| BridgeError::parse(css, e))
}

/// Whitespace-collapsed, entity-decoded text of an element.
pub fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `sel` under `element`.
pub fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(text)
}

/// Attribute of the first match of `sel` under `element`.
pub fn first_attr(element: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    element
        .select(sel)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>  Hello\n   <b>big</b>&amp; world </p>");
        let p = selector("p").unwrap();
        assert_eq!(first_text(doc.root_element(), &p), Some("Hello big& world".into()));
    }

    #[test]
    fn test_first_attr() {
        let doc = Html::parse_fragment(r#"<a href="/x">1</a><a href="/y">2</a>"#);
        let a = selector("a").unwrap();
        assert_eq!(first_attr(doc.root_element(), &a, "href"), Some("/x".into()));
        assert_eq!(first_attr(doc.root_element(), &a, "title"), None);
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        assert!(matches!(selector("div[[["), Err(BridgeError::Parse { .. })));
    }
}
