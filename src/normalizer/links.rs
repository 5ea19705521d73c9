use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::app::Result;

static LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("link attribute pattern is valid")
});

/// Resolve `href` against `base`. Absolute and protocol-relative inputs are
/// handled by the same join.
pub fn absolutize(base: &Url, href: &str) -> Result<Url> {
    Ok(base.join(href.trim())?)
}

/// Rewrite relative `href`/`src` attribute values in an HTML fragment to
/// absolute URLs. Fragment-only links and unparseable values are left alone.
pub fn absolutize_html(html: &str, base: &Url) -> String {
    LINK_ATTR
        .replace_all(html, |caps: &Captures| {
            let value = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let resolved = if value.is_empty()
                || value.starts_with('#')
                || Url::parse(value).is_ok()
            {
                None
            } else {
                absolutize(base, value).ok()
            };

            match resolved {
                Some(url) => format!("{}{}\"{}\"", &caps[1], &caps[2], url),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://archiveofourown.org/works/1").unwrap()
    }

    #[test]
    fn test_absolutize_forms() {
        assert_eq!(
            absolutize(&base(), "/works/2").unwrap().as_str(),
            "https://archiveofourown.org/works/2"
        );
        assert_eq!(
            absolutize(&base(), "//cdn.example.com/a.png").unwrap().as_str(),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            absolutize(&base(), "https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
        assert_eq!(
            absolutize(&base(), "chapters/3").unwrap().as_str(),
            "https://archiveofourown.org/works/chapters/3"
        );
    }

    #[test]
    fn test_absolutize_html_rewrites_relative_only() {
        let html = r##"<a href="/tags/x">x</a> <img src='//cdn.example/i.png'> <a href="https://e.com/">e</a> <a href="#top">t</a>"##;
        let out = absolutize_html(html, &base());
        assert!(out.contains(r#"href="https://archiveofourown.org/tags/x""#));
        assert!(out.contains(r#"src="https://cdn.example/i.png""#));
        assert!(out.contains(r#"href="https://e.com/""#));
        assert!(out.contains(r##"href="#top""##));
    }
}
